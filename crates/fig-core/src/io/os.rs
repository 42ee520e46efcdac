//! The operating-system adapter interface.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

use crate::paths::filename_from_url;

/// Errors raised by an [`OperatingSystem`].
#[derive(Error, Debug)]
pub enum OsError {
    /// The remote object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The URL scheme (or the operation on it) is not supported.
    #[error("Unsupported URL for {operation}: {url}")]
    UnsupportedScheme {
        /// What was attempted.
        operation: &'static str,
        /// The URL.
        url: String,
    },

    /// The HTTP client could not be built or the request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("HTTP {status} for {url}")]
    Status {
        /// The URL requested.
        url: String,
        /// The status code.
        status: u16,
    },

    /// A filesystem operation failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An archive could not be written or read.
    #[error("Archive error in {}: {message}", path.display())]
    Archive {
        /// The archive file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The file extension does not name a known archive format.
    #[error("Unsupported archive format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

impl OsError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Credentials used to upload to an authenticated remote repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadIdentity {
    /// User name.
    pub user: String,
    /// Password, if the store wants one.
    pub password: Option<String>,
}

/// Filesystem, network and archive services consumed by the repository.
pub trait OperatingSystem: std::fmt::Debug {
    /// Names of the entries in `dir`, sorted.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be read.
    fn list(&self, dir: &Path) -> Result<Vec<String>, OsError>;

    /// Whether `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Modification time of `path`, if it exists.
    fn mtime(&self, path: &Path) -> Option<SystemTime>;

    /// Create `dir` and any missing parents.
    ///
    /// # Errors
    ///
    /// Fails on any filesystem error.
    fn create_directory(&self, dir: &Path) -> Result<(), OsError>;

    /// Remove everything in `dir`, creating it if absent.
    ///
    /// # Errors
    ///
    /// Fails on any filesystem error.
    fn clear_directory(&self, dir: &Path) -> Result<(), OsError>;

    /// Recursively delete `dir`. Deleting something absent is not an error.
    ///
    /// # Errors
    ///
    /// Fails on any filesystem error.
    fn delete_directory(&self, dir: &Path) -> Result<(), OsError>;

    /// Read a text file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read.
    fn read(&self, path: &Path) -> Result<String, OsError>;

    /// Write a text file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails on any filesystem error.
    fn write(&self, path: &Path, content: &str) -> Result<(), OsError>;

    /// Copy a file byte for byte, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails on any filesystem error.
    fn copy(&self, source: &Path, target: &Path) -> Result<(), OsError>;

    /// Move every entry of `from` into `to`.
    ///
    /// # Errors
    ///
    /// Fails on any filesystem error.
    fn move_entries(&self, from: &Path, to: &Path) -> Result<(), OsError>;

    /// Fetch the text at `url`.
    ///
    /// # Errors
    ///
    /// [`OsError::NotFound`] if the object does not exist.
    fn read_url(&self, url: &str) -> Result<String, OsError>;

    /// Download `url` to `path`. Returns whether the file was (re)written;
    /// an up-to-date copy may be left alone.
    ///
    /// # Errors
    ///
    /// [`OsError::NotFound`] if the object does not exist.
    fn download(&self, url: &str, path: &Path) -> Result<bool, OsError>;

    /// Names of every `name/version` pair below the repository at `base_url`.
    ///
    /// # Errors
    ///
    /// Fails if the remote cannot be listed.
    fn download_list(&self, base_url: &str) -> Result<Vec<String>, OsError>;

    /// Upload a local file to `url`.
    ///
    /// # Errors
    ///
    /// Fails if the transfer fails.
    fn upload(
        &self,
        local: &Path,
        url: &str,
        identity: Option<&UploadIdentity>,
    ) -> Result<(), OsError>;

    /// Bundle `files` into a new archive at `archive`. Entries are named
    /// relative to `base` when they live below it.
    ///
    /// # Errors
    ///
    /// Fails if a file cannot be read or the archive cannot be written.
    fn create_archive(
        &self,
        archive: &Path,
        base: &Path,
        files: &[PathBuf],
    ) -> Result<(), OsError>;

    /// Unpack `dir/archive_name` into `dir`.
    ///
    /// # Errors
    ///
    /// Fails on an unknown format, a corrupt archive or an entry that would
    /// land outside `dir`.
    fn unpack_archive(&self, dir: &Path, archive_name: &str) -> Result<(), OsError>;

    /// Download an archive into `dir` and unpack it there.
    ///
    /// # Errors
    ///
    /// See [`download`](Self::download) and
    /// [`unpack_archive`](Self::unpack_archive).
    fn download_archive(&self, url: &str, dir: &Path) -> Result<(), OsError> {
        let name = filename_from_url(url);
        self.download(url, &dir.join(name))?;
        self.unpack_archive(dir, name)
    }

    /// Download a single file into `dir`.
    ///
    /// # Errors
    ///
    /// See [`download`](Self::download).
    fn download_resource(&self, url: &str, dir: &Path) -> Result<(), OsError> {
        self.download(url, &dir.join(filename_from_url(url)))?;
        Ok(())
    }
}
