//! The `fig.properties` override table.
//!
//! Each non-blank line reads `name/version=directory` and forces that
//! coordinate to resolve to `directory` instead of its place in the local
//! cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use fig_schema::Coordinate;

/// Coordinates forced to caller-chosen directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    entries: HashMap<String, PathBuf>,
}

impl Overrides {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse properties text. Lines are split on the first `=`; lines without
    /// one are ignored.
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| line.split_once('='))
            .map(|(descriptor, dir)| (descriptor.trim().to_string(), PathBuf::from(dir.trim())))
            .collect();
        Self { entries }
    }

    /// Read a properties file; an absent file yields an empty table.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e),
        }
    }

    /// Add or replace an override.
    pub fn insert(&mut self, coordinate: &Coordinate, dir: impl Into<PathBuf>) {
        self.entries.insert(coordinate.to_string(), dir.into());
    }

    /// The override directory for a coordinate, if any.
    pub fn get(&self, coordinate: &Coordinate) -> Option<&Path> {
        self.entries.get(&coordinate.to_string()).map(PathBuf::as_path)
    }

    /// Number of overrides.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_lines_on_first_equals() {
        let overrides = Overrides::parse("a/1=/work/a\n\n  b/2 = /work/b=odd \nnonsense\n");
        assert_eq!(overrides.len(), 2);
        assert_eq!(
            overrides.get(&Coordinate::new("a", "1")),
            Some(Path::new("/work/a"))
        );
        assert_eq!(
            overrides.get(&Coordinate::new("b", "2")),
            Some(Path::new("/work/b=odd"))
        );
        assert_eq!(overrides.get(&Coordinate::new("a", "2")), None);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let overrides = Overrides::load(&dir.path().join("fig.properties")).unwrap();
        assert!(overrides.is_empty());
    }
}
