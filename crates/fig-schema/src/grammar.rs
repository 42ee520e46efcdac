//! Grammar versions of the definition language.

/// Newest grammar version this crate can read and write.
pub const LATEST_GRAMMAR_VERSION: u32 = 1;

/// The minimum grammar version needed to represent a statement.
///
/// `version == 0` means "no special requirement" and carries no reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarRequirement {
    /// Minimum grammar version.
    pub version: u32,
    /// Why the version is needed, present whenever `version > 0`.
    pub reason: Option<String>,
}

impl GrammarRequirement {
    /// No requirement beyond the base grammar.
    pub const NONE: Self = Self {
        version: 0,
        reason: None,
    };

    /// Require `version` for the given reason.
    pub fn new(version: u32, reason: impl Into<String>) -> Self {
        Self {
            version,
            reason: Some(reason.into()),
        }
    }

    /// The stricter of two requirements; the earlier one wins ties.
    pub fn max(self, other: Self) -> Self {
        if other.version > self.version {
            other
        } else {
            self
        }
    }
}

impl Default for GrammarRequirement {
    fn default() -> Self {
        Self::NONE
    }
}

/// Values that need grammar v1 quoting: anything with whitespace or quotes.
pub(crate) fn requires_quoting(raw: &str) -> Option<&'static str> {
    if raw.chars().any(char::is_whitespace) {
        Some("contains whitespace")
    } else if raw.contains(['\'', '"']) {
        Some("is quoted")
    } else {
        None
    }
}
