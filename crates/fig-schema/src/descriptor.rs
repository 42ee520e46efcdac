//! Package descriptors (`name/version:config`) and coordinates.

use serde::{Deserialize, Serialize};

/// A fully specified `(name, version)` pair.
///
/// Coordinates are the unit of addressing for the repository: there is no
/// implicit "latest" version.
///
/// # Example
///
/// ```
/// use fig_schema::Coordinate;
///
/// let coordinate = Coordinate::new("jdk", "1.8.0");
/// assert_eq!(coordinate.to_string(), "jdk/1.8.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    /// Package name.
    pub name: String,
    /// Exact package version.
    pub version: String,
}

impl Coordinate {
    /// Create a coordinate from a name and version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// A possibly partial reference to a package and one of its configurations.
///
/// Any component may be missing: `:debug` names only a configuration of the
/// current package, `jdk` names a package without a version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Descriptor {
    /// Package name, the text before any `/` or `:`.
    pub name: Option<String>,
    /// Version, the text following the first `/`.
    pub version: Option<String>,
    /// Configuration name, the text following the first `:`.
    pub config: Option<String>,
}

impl Descriptor {
    /// Parse `name/version:config`, where every component is optional.
    ///
    /// A component ends at the next `/` or `:`; empty components are treated
    /// as absent.
    ///
    /// ```
    /// use fig_schema::Descriptor;
    ///
    /// let descriptor = Descriptor::parse("jdk/1.8.0:debug");
    /// assert_eq!(descriptor.name.as_deref(), Some("jdk"));
    /// assert_eq!(descriptor.version.as_deref(), Some("1.8.0"));
    /// assert_eq!(descriptor.config.as_deref(), Some("debug"));
    /// ```
    pub fn parse(text: &str) -> Self {
        let name = component(text);
        let version = text.find('/').and_then(|i| component(&text[i + 1..]));
        let config = text.find(':').and_then(|i| component(&text[i + 1..]));

        Self {
            name,
            version,
            config,
        }
    }

    /// The `(name, version)` pair, when both are present.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (&self.name, &self.version) {
            (Some(name), Some(version)) => Some(Coordinate::new(name, version)),
            _ => None,
        }
    }
}

fn component(text: &str) -> Option<String> {
    let end = text.find(['/', ':']).unwrap_or(text.len());
    let value = &text[..end];
    (!value.is_empty()).then(|| value.to_string())
}

impl std::fmt::Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name}")?;
        }
        if let Some(version) = &self.version {
            write!(f, "/{version}")?;
        }
        if let Some(config) = &self.config {
            write!(f, ":{config}")?;
        }
        Ok(())
    }
}

impl From<&Coordinate> for Descriptor {
    fn from(coordinate: &Coordinate) -> Self {
        Self {
            name: Some(coordinate.name.clone()),
            version: Some(coordinate.version.clone()),
            config: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_descriptor() {
        let descriptor = Descriptor::parse("package/1.2.3:default");
        assert_eq!(descriptor.name.as_deref(), Some("package"));
        assert_eq!(descriptor.version.as_deref(), Some("1.2.3"));
        assert_eq!(descriptor.config.as_deref(), Some("default"));
        assert_eq!(descriptor.to_string(), "package/1.2.3:default");
    }

    #[test]
    fn parses_config_only() {
        let descriptor = Descriptor::parse(":debug");
        assert_eq!(descriptor.name, None);
        assert_eq!(descriptor.version, None);
        assert_eq!(descriptor.config.as_deref(), Some("debug"));
        assert_eq!(descriptor.to_string(), ":debug");
    }

    #[test]
    fn config_before_version_is_still_found() {
        let descriptor = Descriptor::parse("package:cfg/1.0");
        assert_eq!(descriptor.name.as_deref(), Some("package"));
        assert_eq!(descriptor.version.as_deref(), Some("1.0"));
        assert_eq!(descriptor.config.as_deref(), Some("cfg"));
    }

    #[test]
    fn coordinate_requires_name_and_version() {
        assert_eq!(
            Descriptor::parse("a/1").coordinate(),
            Some(Coordinate::new("a", "1"))
        );
        assert_eq!(Descriptor::parse("a").coordinate(), None);
        assert_eq!(Descriptor::parse("/1").coordinate(), None);
    }
}
