//! Application configuration (figrc) and the URL access policy.
//!
//! A figrc is a TOML file:
//!
//! ```toml
//! url_whitelist = ["http://mirror.example.com/", "file:///srv/fig/"]
//! ```
//!
//! An empty or absent whitelist authorizes every URL.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Decides whether the repository may fetch a URL on the user's behalf.
pub trait AccessPolicy: std::fmt::Debug {
    /// Whether remote access to `url` is authorized.
    fn url_access_allowed(&self, url: &str) -> bool;
}

/// Policy that authorizes every URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn url_access_allowed(&self, _url: &str) -> bool {
        true
    }
}

/// Errors reading a figrc.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// The figrc path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid figrc TOML.
    #[error("Invalid figrc {}: {source}", path.display())]
    Toml {
        /// The figrc path.
        path: PathBuf,
        /// What the TOML parser reported.
        #[source]
        source: toml::de::Error,
    },
}

/// Settings merged from every figrc in use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// URL prefixes the repository may download from. Empty allows all.
    pub url_whitelist: Vec<String>,
}

impl AppConfig {
    /// Parse figrc text.
    ///
    /// # Errors
    ///
    /// Returns the TOML error, attributed to `path`.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read and parse one figrc.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Load the default figrc (skipped if absent) followed by any explicit
    /// ones (which must exist), merging their whitelists in order.
    ///
    /// # Errors
    ///
    /// Returns the first read or parse failure.
    pub fn load(default: Option<&Path>, explicit: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = default.filter(|path| path.exists()) {
            tracing::debug!("Reading figrc {}", path.display());
            config.merge(Self::from_file(path)?);
        }
        for path in explicit {
            tracing::debug!("Reading figrc {}", path.display());
            config.merge(Self::from_file(path)?);
        }

        Ok(config)
    }

    /// Append another configuration's settings to this one.
    pub fn merge(&mut self, other: Self) {
        for prefix in other.url_whitelist {
            if !self.url_whitelist.contains(&prefix) {
                self.url_whitelist.push(prefix);
            }
        }
    }
}

impl AccessPolicy for AppConfig {
    fn url_access_allowed(&self, url: &str) -> bool {
        self.url_whitelist.is_empty()
            || self
                .url_whitelist
                .iter()
                .any(|prefix| url.starts_with(prefix.as_str()))
    }
}
