use anyhow::{Context, Result};
use fig_core::Repository;

use crate::context::parse_coordinate;

/// Print the configuration names of a package, in definition order
pub fn list_configs(repository: &Repository, descriptor: &str) -> Result<()> {
    let coordinate = parse_coordinate(descriptor)?;
    let package = repository
        .load_package(&coordinate)
        .with_context(|| format!("Failed to load {coordinate}"))?;

    for config in package.configs() {
        println!("{}", config.name());
    }
    Ok(())
}
