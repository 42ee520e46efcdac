//! Core library for fig.
//!
//! Holds the package repository (local cache, remote fetch, install and
//! publish), the operating-system adapter it drives, archive handling, the
//! URL access policy and the `fig.properties` override table.

pub mod config;
pub mod error;
pub mod io;
pub mod overrides;
pub mod paths;
pub mod repository;

pub use config::{AccessPolicy, AllowAll, AppConfig};
pub use error::{ErrorKind, RepositoryError};
pub use io::{OperatingSystem, OsError, SystemOs, UploadIdentity};
pub use overrides::Overrides;
pub use paths::*;
pub use repository::{Repository, RepositoryOptions};

/// User Agent string for remote requests
pub const USER_AGENT: &str = concat!("fig/", env!("CARGO_PKG_VERSION"));
