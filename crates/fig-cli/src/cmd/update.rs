use anyhow::Result;
use fig_core::Repository;

use crate::context::parse_coordinate;

/// Refresh a package from the remote repository
pub fn update(repository: &Repository, descriptor: &str) -> Result<()> {
    let coordinate = parse_coordinate(descriptor)?;
    repository.update_package(&coordinate)?;
    println!("{}", repository.local_dir_for_package(&coordinate).display());
    Ok(())
}
