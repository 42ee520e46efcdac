//! fig - a package and environment manager
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Packages are directories identified by `name/version`, described by a
//! `.fig` definition file and cached under `$FIG_HOME`. The remote
//! repository at `$FIG_REMOTE_URL` is the source they are fetched from and
//! published to.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.fighome/
//! ├── NAME/
//! │   └── VERSION/
//! │       ├── .fig     # Package definition
//! │       └── ...      # Installed assets
//! └── .staging-XXXX/   # Per-operation scratch space
//! ```

pub mod cmd;
pub mod context;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fig_core::RepositoryError;

pub use context::GlobalArgs;

/// Accepted `--log-level` values, including the aliases fig has always taken.
pub const LOG_LEVELS: [&str; 9] = [
    "off", "fatal", "error", "warn", "warning", "info", "debug", "trace", "all",
];

#[derive(Debug, Parser)]
#[command(name = "fig")]
#[command(author, version, about = "fig - a package and environment manager")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List packages in $FIG_HOME
    List {
        /// Print JSON instead of one NAME/VERSION per line
        #[arg(long)]
        json: bool,
    },
    /// List packages in the remote repository
    ListRemote,
    /// Remove packages from $FIG_HOME
    Clean {
        /// NAME/VERSION, or NAME to remove every version
        #[arg(required = true)]
        descriptors: Vec<String>,
    },
    /// List the configurations of a package
    ListConfigs {
        /// NAME/VERSION
        descriptor: String,
    },
    /// Fetch a package from the remote repository and install it
    Update {
        /// NAME/VERSION
        descriptor: String,
    },
    /// Publish a package to the remote repository and $FIG_HOME
    Publish {
        /// NAME/VERSION to publish as
        descriptor: String,
        /// Definition file to publish (default: package.fig if present)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Add a resource file or glob to the package
        #[arg(long = "resource", value_name = "PATH")]
        resources: Vec<String>,
        /// Add an archive to the package
        #[arg(long = "archive", value_name = "PATH")]
        archives: Vec<String>,
        /// Install only in $FIG_HOME, skipping the remote repository
        #[arg(long)]
        local_only: bool,
    },
}

/// Map a `--log-level` value to a tracing filter directive.
pub fn log_directive(level: &str) -> &'static str {
    match level {
        "off" => "off",
        "fatal" | "error" => "error",
        "warn" | "warning" => "warn",
        "debug" => "debug",
        "trace" | "all" => "trace",
        _ => "info",
    }
}

/// Run a parsed command line.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let repository = context::repository(&cli.global)?;

    match cli.command {
        Commands::List { json } => cmd::list::list(&repository, json),
        Commands::ListRemote => cmd::list::list_remote(&repository),
        Commands::Clean { descriptors } => cmd::clean::clean(&repository, &descriptors),
        Commands::ListConfigs { descriptor } => {
            cmd::list_configs::list_configs(&repository, &descriptor)
        }
        Commands::Update { descriptor } => cmd::update::update(&repository, &descriptor),
        Commands::Publish {
            descriptor,
            file,
            resources,
            archives,
            local_only,
        } => cmd::publish::publish(
            &repository,
            &cmd::publish::PublishRequest {
                descriptor: &descriptor,
                file: file.as_deref(),
                resources: &resources,
                archives: &archives,
                local_only,
            },
        ),
    }
}

/// Exit status for an error: the repository's failure class if there is one
/// in the chain, otherwise 1.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<RepositoryError>())
        .map_or(1, |e| u8::try_from(e.exit_code()).unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fig_schema::Coordinate;

    #[test]
    fn log_level_aliases() {
        assert_eq!(log_directive("warning"), "warn");
        assert_eq!(log_directive("fatal"), "error");
        assert_eq!(log_directive("all"), "trace");
        assert_eq!(log_directive("info"), "info");
    }

    #[test]
    fn exit_code_comes_from_repository_error() {
        let error = anyhow::Error::new(RepositoryError::DefinitionMissing(PathBuf::from("x")))
            .context("Failed to load a/1");
        assert_eq!(exit_code(&error), 10);

        let error = anyhow::Error::new(RepositoryError::RemoteNotFound(Coordinate::new("a", "1")));
        assert_eq!(exit_code(&error), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("plain")), 1);
    }

    #[test]
    fn cli_parses_publish() {
        let cli = Cli::try_parse_from([
            "fig",
            "publish",
            "pkg/1.0",
            "--resource",
            "lib/*.jar",
            "--resource",
            "README",
            "--local-only",
        ])
        .unwrap();
        match cli.command {
            Commands::Publish {
                descriptor,
                resources,
                local_only,
                ..
            } => {
                assert_eq!(descriptor, "pkg/1.0");
                assert_eq!(resources, ["lib/*.jar", "README"]);
                assert!(local_only);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
