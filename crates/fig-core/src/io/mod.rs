//! Filesystem, network and archive access.
//!
//! The repository only talks to the outside world through the
//! [`OperatingSystem`] trait; [`SystemOs`] is the real implementation.

pub mod archive;
pub mod os;
pub mod system;

pub use os::{OperatingSystem, OsError, UploadIdentity};
pub use system::SystemOs;
