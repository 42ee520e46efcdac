//! Global options and the repository they configure.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use fig_core::{
    AppConfig, Repository, RepositoryOptions, SystemOs, UploadIdentity, default_figrc_path,
    try_fig_home,
};
use fig_schema::{Coordinate, DefinitionParser, Descriptor};

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Local repository cache
    #[arg(long, env = "FIG_HOME", global = true, value_name = "PATH")]
    pub home: Option<PathBuf>,

    /// Remote repository URL
    #[arg(long, env = "FIG_REMOTE_URL", global = true, value_name = "URL")]
    pub remote_url: Option<String>,

    /// Check the remote repository for updates before using a package
    #[arg(short = 'u', long, global = true)]
    pub update: bool,

    /// Check the remote repository only for packages missing from $FIG_HOME
    #[arg(short = 'm', long, global = true)]
    pub update_if_missing: bool,

    /// Log in to the remote repository as $FIG_REMOTE_USER
    #[arg(short = 'l', long, global = true)]
    pub login: bool,

    /// Add PATH to the configuration used for fig
    #[arg(long, global = true, value_name = "PATH")]
    pub figrc: Vec<PathBuf>,

    /// Ignore ~/.figrc
    #[arg(long, global = true)]
    pub no_figrc: bool,

    /// Logging level
    #[arg(long, global = true, value_name = "LEVEL", value_parser = crate::LOG_LEVELS)]
    pub log_level: Option<String>,
}

/// Upload identity from `FIG_REMOTE_USER` / `FIG_REMOTE_PASSWORD`.
fn identity_from_env() -> Result<UploadIdentity> {
    let user = std::env::var("FIG_REMOTE_USER")
        .ok()
        .filter(|user| !user.is_empty())
        .context("--login requires FIG_REMOTE_USER to be set")?;
    Ok(UploadIdentity {
        user,
        password: std::env::var("FIG_REMOTE_PASSWORD").ok(),
    })
}

/// Build the repository described by the global options.
pub fn repository(args: &GlobalArgs) -> Result<Repository> {
    let home = args
        .home
        .clone()
        .or_else(try_fig_home)
        .context("Could not determine home directory. Set FIG_HOME to override.")?;

    let mut options = RepositoryOptions::new(home);
    options.update = args.update;
    options.update_if_missing = args.update_if_missing;
    if let Some(url) = args.remote_url.as_deref().filter(|url| !url.is_empty()) {
        options = options.with_remote_url(url);
    }
    if args.login {
        options.remote_user = Some(identity_from_env()?);
    }

    let default_figrc = if args.no_figrc {
        None
    } else {
        default_figrc_path()
    };
    let config = AppConfig::load(default_figrc.as_deref(), &args.figrc)?;

    let os = SystemOs::new().context("Failed to initialise HTTP client")?;
    Ok(Repository::new(
        Box::new(os),
        Box::new(DefinitionParser::new()),
        Box::new(config),
        options,
    )?)
}

/// Parse a command-line `NAME/VERSION`.
pub fn parse_coordinate(text: &str) -> Result<Coordinate> {
    let descriptor = Descriptor::parse(text);
    if descriptor.config.is_some() {
        bail!("Configuration not allowed here: {text}");
    }
    descriptor
        .coordinate()
        .with_context(|| format!("Expected NAME/VERSION but got \"{text}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_need_name_and_version() {
        assert_eq!(
            parse_coordinate("pkg/1.0").unwrap(),
            Coordinate::new("pkg", "1.0")
        );
        assert!(parse_coordinate("pkg").is_err());
        assert!(parse_coordinate("pkg/1.0:debug").is_err());
    }
}
