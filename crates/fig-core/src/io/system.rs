//! [`OperatingSystem`] backed by the local filesystem and a blocking HTTP
//! client.
//!
//! `file://` URLs (and bare paths) are served from the filesystem, which is
//! what local and test remotes use. `http://` and `https://` go through
//! `reqwest`. `ftp://` and `ssh://` are recognised but not supported.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::archive;
use super::os::{OperatingSystem, OsError, UploadIdentity};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a URL points.
#[derive(Debug, PartialEq, Eq)]
enum Location<'a> {
    File(PathBuf),
    Http(&'a str),
    Unsupported,
}

fn locate(url: &str) -> Location<'_> {
    if let Some(path) = url.strip_prefix("file://") {
        Location::File(PathBuf::from(path))
    } else if url.starts_with("http://") || url.starts_with("https://") {
        Location::Http(url)
    } else if url.contains("://") {
        Location::Unsupported
    } else {
        Location::File(PathBuf::from(url))
    }
}

fn unsupported(operation: &'static str, url: &str) -> OsError {
    OsError::UnsupportedScheme {
        operation,
        url: url.to_string(),
    }
}

fn create_parent(path: &Path) -> Result<(), OsError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(OsError::io(parent))
        }
        _ => Ok(()),
    }
}

/// The real filesystem and network.
#[derive(Debug, Clone)]
pub struct SystemOs {
    client: Client,
}

impl SystemOs {
    /// Build the adapter and its HTTP client.
    ///
    /// # Errors
    ///
    /// Fails if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, OsError> {
        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, OsError> {
        debug!("GET {url}");
        let response = self.client.get(url).send()?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(OsError::NotFound(url.to_string())),
            status if !status.is_success() => Err(OsError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
            _ => Ok(response),
        }
    }

    fn copy_if_newer(&self, source: &Path, url: &str, path: &Path) -> Result<bool, OsError> {
        let Some(source_mtime) = self.mtime(source) else {
            return Err(OsError::NotFound(url.to_string()));
        };
        if self
            .mtime(path)
            .is_some_and(|local_mtime| local_mtime >= source_mtime)
        {
            debug!("{} is up to date", path.display());
            return Ok(false);
        }
        self.copy(source, path)?;
        Ok(true)
    }
}

impl OperatingSystem for SystemOs {
    fn list(&self, dir: &Path) -> Result<Vec<String>, OsError> {
        let mut names = fs::read_dir(dir)
            .map_err(OsError::io(dir))?
            .map(|entry| {
                entry
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .map_err(OsError::io(dir))
            })
            .collect::<Result<Vec<_>, _>>()?;
        names.sort();
        Ok(names)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn mtime(&self, path: &Path) -> Option<SystemTime> {
        fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    fn create_directory(&self, dir: &Path) -> Result<(), OsError> {
        fs::create_dir_all(dir).map_err(OsError::io(dir))
    }

    fn clear_directory(&self, dir: &Path) -> Result<(), OsError> {
        self.delete_directory(dir)?;
        self.create_directory(dir)
    }

    fn delete_directory(&self, dir: &Path) -> Result<(), OsError> {
        match fs::remove_dir_all(dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OsError::io(dir)(e)),
        }
    }

    fn read(&self, path: &Path) -> Result<String, OsError> {
        fs::read_to_string(path).map_err(OsError::io(path))
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), OsError> {
        create_parent(path)?;
        fs::write(path, content).map_err(OsError::io(path))
    }

    fn copy(&self, source: &Path, target: &Path) -> Result<(), OsError> {
        create_parent(target)?;
        fs::copy(source, target).map_err(OsError::io(source))?;
        Ok(())
    }

    fn move_entries(&self, from: &Path, to: &Path) -> Result<(), OsError> {
        fs::create_dir_all(to).map_err(OsError::io(to))?;
        let entries: Vec<PathBuf> = self
            .list(from)?
            .into_iter()
            .map(|name| from.join(name))
            .collect();
        if entries.is_empty() {
            return Ok(());
        }

        let options = fs_extra::dir::CopyOptions::new().overwrite(true);
        fs_extra::move_items(&entries, to, &options).map_err(|e| OsError::Io {
            path: from.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })?;
        Ok(())
    }

    fn read_url(&self, url: &str) -> Result<String, OsError> {
        match locate(url) {
            Location::File(path) => fs::read_to_string(&path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OsError::NotFound(url.to_string())
                } else {
                    OsError::io(&path)(e)
                }
            }),
            Location::Http(url) => Ok(self.get(url)?.text()?),
            Location::Unsupported => Err(unsupported("reading", url)),
        }
    }

    fn download(&self, url: &str, path: &Path) -> Result<bool, OsError> {
        match locate(url) {
            Location::File(source) => self.copy_if_newer(&source, url, path),
            Location::Http(url) => {
                let mut response = self.get(url)?;
                create_parent(path)?;
                // Stream next to the target so a broken transfer leaves it untouched.
                let dir = path
                    .parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                let mut partial = NamedTempFile::new_in(dir).map_err(OsError::io(dir))?;
                response.copy_to(&mut partial)?;
                partial.persist(path).map_err(|e| OsError::io(path)(e.error))?;
                Ok(true)
            }
            Location::Unsupported => Err(unsupported("download", url)),
        }
    }

    fn download_list(&self, base_url: &str) -> Result<Vec<String>, OsError> {
        let Location::File(root) = locate(base_url) else {
            return Err(unsupported("listing", base_url));
        };
        if !root.is_dir() {
            return Err(OsError::NotFound(base_url.to_string()));
        }

        let mut packages = Vec::new();
        for entry in WalkDir::new(&root).min_depth(2).max_depth(2) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable remote entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };
            let names: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            if names.iter().any(|name| name.starts_with('.')) {
                continue;
            }
            packages.push(names.join("/"));
        }
        packages.sort();
        Ok(packages)
    }

    fn upload(
        &self,
        local: &Path,
        url: &str,
        identity: Option<&UploadIdentity>,
    ) -> Result<(), OsError> {
        match locate(url) {
            Location::File(target) => self.copy(local, &target),
            Location::Http(url) => {
                debug!("PUT {url}");
                let body = fs::read(local).map_err(OsError::io(local))?;
                let mut request = self.client.put(url).body(body);
                if let Some(identity) = identity {
                    request = request.basic_auth(&identity.user, identity.password.as_deref());
                }
                let status = request.send()?.status();
                if status.is_success() {
                    Ok(())
                } else {
                    Err(OsError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    })
                }
            }
            Location::Unsupported => Err(unsupported("upload", url)),
        }
    }

    fn create_archive(
        &self,
        archive: &Path,
        base: &Path,
        files: &[PathBuf],
    ) -> Result<(), OsError> {
        archive::create_tar_gz(archive, base, files)
    }

    fn unpack_archive(&self, dir: &Path, archive_name: &str) -> Result<(), OsError> {
        let files = archive::extract_auto(&dir.join(archive_name), dir)?;
        debug!("Unpacked {} files from {archive_name}", files.len());
        Ok(())
    }
}
