use super::{StatementNode, quote_if_needed};
use crate::grammar::{GrammarRequirement, requires_quoting};
use crate::position::Position;

/// Location shared by both asset kinds: the text as written plus the
/// location it denotes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AssetLocation {
    raw: String,
    location: String,
    position: Position,
}

impl AssetLocation {
    fn new(location: impl Into<String>) -> Self {
        let location = location.into();
        Self {
            raw: quote_if_needed(&location),
            location,
            position: Position::unknown(),
        }
    }

    fn parsed(raw: impl Into<String>, location: impl Into<String>, position: Position) -> Self {
        Self {
            raw: raw.into(),
            location: location.into(),
            position,
        }
    }

    /// The last path segment, which is what publishing stores the asset as.
    fn published_name(&self) -> &str {
        self.location.rsplit('/').next().unwrap_or(&self.location)
    }

    fn emitting_requirement(&self) -> GrammarRequirement {
        requires_quoting(&self.raw).map_or(GrammarRequirement::NONE, |why| {
            GrammarRequirement::new(1, format!("location {why}"))
        })
    }

    fn publishing_requirement(&self) -> GrammarRequirement {
        requires_quoting(&quote_if_needed(self.published_name())).map_or(
            GrammarRequirement::NONE,
            |why| GrammarRequirement::new(1, format!("published location {why}")),
        )
    }
}

macro_rules! asset_statement {
    ($(#[$doc:meta])* $name:ident, $keyword:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(AssetLocation);

        impl $name {
            /// Create a statement for a location, quoting it as needed.
            pub fn new(location: impl Into<String>) -> Self {
                Self(AssetLocation::new(location))
            }

            /// Create a statement from parsed text and its lexed location.
            pub fn parsed(
                raw: impl Into<String>,
                location: impl Into<String>,
                position: Position,
            ) -> Self {
                Self(AssetLocation::parsed(raw, location, position))
            }

            /// The location this asset is fetched from: a URL or a local path.
            pub fn location(&self) -> &str {
                &self.0.location
            }

            /// The location as written in the definition file.
            pub fn raw(&self) -> &str {
                &self.0.raw
            }

            /// File name the asset is published under.
            pub fn published_name(&self) -> &str {
                self.0.published_name()
            }
        }

        impl StatementNode for $name {
            fn statement_type(&self) -> &'static str {
                $keyword
            }

            fn position(&self) -> &Position {
                &self.0.position
            }

            fn unparse_as(&self, _grammar_version: u32, indent: &str) -> String {
                format!("{indent}{} {}", $keyword, self.0.raw)
            }

            fn minimum_grammar_for_emitting_input(&self) -> GrammarRequirement {
                self.0.emitting_requirement()
            }

            fn minimum_grammar_for_publishing(&self) -> GrammarRequirement {
                self.0.publishing_requirement()
            }

            fn urls(&self) -> Vec<&str> {
                vec![self.0.location.as_str()]
            }

            fn is_asset(&self) -> bool {
                true
            }
        }
    };
}

asset_statement!(
    /// An archive that is unpacked into the package directory on install.
    Archive,
    "archive"
);

asset_statement!(
    /// A file copied into the package directory as-is.
    Resource,
    "resource"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_location() {
        let archive = Archive::new("http://example.com/lib/foo.tar.gz");
        assert_eq!(archive.unparse(""), "archive http://example.com/lib/foo.tar.gz");
        assert_eq!(archive.urls(), ["http://example.com/lib/foo.tar.gz"]);
        assert_eq!(archive.published_name(), "foo.tar.gz");
        assert!(archive.is_asset());
        assert_eq!(archive.minimum_grammar_for_emitting_input().version, 0);
    }

    #[test]
    fn spaced_location_needs_v1_only_for_input() {
        let resource = Resource::new("some dir/file.jar");
        assert_eq!(resource.raw(), "'some dir/file.jar'");
        assert_eq!(resource.unparse("  "), "  resource 'some dir/file.jar'");

        let input = resource.minimum_grammar_for_emitting_input();
        assert_eq!(input.version, 1);
        assert_eq!(input.reason.as_deref(), Some("location contains whitespace"));
        assert_eq!(resource.minimum_grammar_for_publishing().version, 0);
    }

    #[test]
    fn spaced_published_name_needs_v1() {
        let resource = Resource::new("dir/my file.jar");
        assert_eq!(resource.minimum_grammar_for_publishing().version, 1);
    }

    #[test]
    fn statement_types() {
        assert_eq!(Archive::new("a").statement_type(), "archive");
        assert_eq!(Resource::new("a").statement_type(), "resource");
    }
}
