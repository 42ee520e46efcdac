//! Source positions of statements, as rendered in diagnostics.

/// Where a statement came from.
///
/// Line and column are either both known or both unknown; the source
/// description (a file path, `"command line"`, ...) is independent of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    line_column: Option<(usize, usize)>,
    source_description: Option<String>,
}

impl Position {
    /// A position with a known line and column.
    pub fn new(line: usize, column: usize, source_description: Option<&str>) -> Self {
        Self {
            line_column: Some((line, column)),
            source_description: source_description.map(str::to_string),
        }
    }

    /// A position that only knows its origin.
    pub fn from_source(source_description: impl Into<String>) -> Self {
        Self {
            line_column: None,
            source_description: Some(source_description.into()),
        }
    }

    /// A position about which nothing is known.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// One-based line number, if known.
    pub fn line(&self) -> Option<usize> {
        self.line_column.map(|(line, _)| line)
    }

    /// One-based column number, if known.
    pub fn column(&self) -> Option<usize> {
        self.line_column.map(|(_, column)| column)
    }

    /// Human-readable origin, if known.
    pub fn source_description(&self) -> Option<&str> {
        self.source_description.as_deref()
    }

    /// Render as a suffix for diagnostics, see [`position_description`].
    pub fn describe(&self) -> String {
        position_description(self.line(), self.column(), self.source_description())
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Render a position so that it can be appended directly to a message.
///
/// Produces `" (line L, column C, SOURCE)"`, `" (line L, column C)"`,
/// `" (SOURCE)"` when only the origin is known, or an empty string. A line
/// without a column (or vice versa) counts as unknown.
///
/// ```
/// use fig_schema::position::position_description;
///
/// assert_eq!(
///     position_description(Some(3), Some(7), Some("package.fig")),
///     " (line 3, column 7, package.fig)"
/// );
/// assert_eq!(position_description(None, None, Some("command line")), " (command line)");
/// assert_eq!(position_description(None, None, None), "");
/// ```
pub fn position_description(
    line: Option<usize>,
    column: Option<usize>,
    source_description: Option<&str>,
) -> String {
    let (Some(line), Some(column)) = (line, column) else {
        return source_description.map_or_else(String::new, |source| format!(" ({source})"));
    };

    match source_description {
        Some(source) => format!(" (line {line}, column {column}, {source})"),
        None => format!(" (line {line}, column {column})"),
    }
}
