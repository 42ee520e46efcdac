//! Repository errors and the exit statuses they map to.

use std::path::PathBuf;

use fig_schema::{Coordinate, ParseError};
use thiserror::Error;

use crate::io::OsError;

/// Failure classes that callers tell apart, each with its own exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote definition of a package being updated does not exist.
    RemoteNotFound,
    /// A package directory holds neither `.fig` nor `package.fig`.
    DefinitionMissing,
    /// A specific definition file does not exist.
    PackageMissing,
    /// Fetching or unpacking a package's assets failed.
    InstallFailed,
    /// The access policy forbids fetching a URL.
    UrlAccessDenied,
    /// A definition file could not be parsed.
    Parse,
    /// Missing settings, or input the repository cannot act on.
    Configuration,
    /// Any other filesystem or network failure.
    Io,
}

impl ErrorKind {
    /// Process exit status for this kind of failure.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::DefinitionMissing | Self::InstallFailed => 10,
            Self::RemoteNotFound
            | Self::PackageMissing
            | Self::UrlAccessDenied
            | Self::Parse
            | Self::Configuration
            | Self::Io => 1,
        }
    }
}

/// Errors returned by [`Repository`](crate::Repository) operations.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// See [`ErrorKind::RemoteNotFound`].
    #[error("Package not found in remote repository: {0}")]
    RemoteNotFound(Coordinate),

    /// See [`ErrorKind::DefinitionMissing`].
    #[error("Fig file not found for package: {}", .0.display())]
    DefinitionMissing(PathBuf),

    /// See [`ErrorKind::PackageMissing`].
    #[error("Package not found: {0}")]
    PackageMissing(Coordinate),

    /// See [`ErrorKind::InstallFailed`]; the local directory has been removed.
    #[error("Install failed for {coordinate}: {source}")]
    InstallFailed {
        /// The package being installed.
        coordinate: Coordinate,
        /// What went wrong.
        #[source]
        source: Box<RepositoryError>,
    },

    /// See [`ErrorKind::UrlAccessDenied`].
    #[error("Access to {0} is not allowed by the URL whitelist")]
    UrlAccessDenied(String),

    /// A remote operation was requested without a remote URL.
    #[error("No remote repository URL configured (set FIG_REMOTE_URL)")]
    RemoteUrlUnset,

    /// A package name or version that is not a plain directory name.
    #[error("Invalid package name or version: {0:?}")]
    InvalidComponent(String),

    /// A resource pattern given to publish is not a valid glob.
    #[error("Invalid resource pattern {pattern}: {message}")]
    InvalidPattern {
        /// The pattern as given.
        pattern: String,
        /// What the glob parser reported.
        message: String,
    },

    /// A definition failed to parse.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The operating-system adapter failed.
    #[error(transparent)]
    Os(#[from] OsError),

    /// A local filesystem operation outside the adapter failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: &'static str,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl RepositoryError {
    /// Wrap an I/O error with a short description of the operation.
    pub fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io { context, source }
    }

    /// The failure class, which determines the exit status.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RemoteNotFound(_) => ErrorKind::RemoteNotFound,
            Self::DefinitionMissing(_) => ErrorKind::DefinitionMissing,
            Self::PackageMissing(_) => ErrorKind::PackageMissing,
            Self::InstallFailed { .. } => ErrorKind::InstallFailed,
            Self::UrlAccessDenied(_) => ErrorKind::UrlAccessDenied,
            Self::RemoteUrlUnset | Self::InvalidComponent(_) | Self::InvalidPattern { .. } => {
                ErrorKind::Configuration
            }
            Self::Parse(_) => ErrorKind::Parse,
            Self::Os(_) | Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Shorthand for `self.kind().exit_code()`.
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}
