//! fig - a package and environment manager CLI

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fig_cli::{Cli, exit_code, log_directive, run};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; --log-level wins over RUST_LOG.
    let filter = match cli.global.log_level.as_deref() {
        Some(level) => EnvFilter::new(log_directive(level)),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("fig: {error:#}");
            ExitCode::from(exit_code(&error))
        }
    }
}
