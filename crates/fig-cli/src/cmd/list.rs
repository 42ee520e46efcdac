use anyhow::{Context, Result};
use fig_core::Repository;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PackageEntry<'a> {
    name: &'a str,
    version: &'a str,
}

/// List all packages in the local repository
pub fn list(repository: &Repository, json: bool) -> Result<()> {
    let packages = repository.list_packages()?;

    if json {
        let entries: Vec<PackageEntry<'_>> = packages
            .iter()
            .filter_map(|package| package.split_once('/'))
            .map(|(name, version)| PackageEntry { name, version })
            .collect();
        let rendered =
            serde_json::to_string_pretty(&entries).context("Failed to render package list")?;
        println!("{rendered}");
        return Ok(());
    }

    for package in packages {
        println!("{package}");
    }
    Ok(())
}

/// List all packages in the remote repository
pub fn list_remote(repository: &Repository) -> Result<()> {
    for package in repository.list_remote_packages()? {
        println!("{package}");
    }
    Ok(())
}
