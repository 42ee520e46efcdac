//! Statements of a package definition file.
//!
//! The set of statement kinds is closed: [`Statement`] is an enum over the
//! concrete kinds, and every kind implements [`StatementNode`], the shared
//! capability interface (position, tree walk, round-trip serialization,
//! grammar-version queries, asset/variable predicates).

mod asset;
mod command;
mod configuration;
mod include;
mod retrieve;
mod variable;

pub use asset::{Archive, Resource};
pub use command::Command;
pub use configuration::Configuration;
pub use include::{Include, Override};
pub use retrieve::Retrieve;
pub use variable::{Path, Set};

use crate::grammar::GrammarRequirement;
use crate::position::Position;

/// Behaviour shared by every statement kind.
pub trait StatementNode {
    /// Keyword identifying this kind of statement in definition files.
    fn statement_type(&self) -> &'static str;

    /// Where the statement was read from.
    fn position(&self) -> &Position;

    /// Visit each direct child once, in order, and then walk into it.
    ///
    /// Statements without children visit nothing.
    fn walk_statements(&self, _visitor: &mut dyn FnMut(&Statement)) {}

    /// Render as definition text in a specific grammar version, each line
    /// prefixed by `indent`.
    fn unparse_as(&self, grammar_version: u32, indent: &str) -> String;

    /// Render as definition text in the oldest grammar able to express it.
    fn unparse(&self, indent: &str) -> String {
        let version = self.minimum_grammar_for_emitting_input().version;
        self.unparse_as(version, indent)
    }

    /// Grammar version needed to write this statement back out as input.
    fn minimum_grammar_for_emitting_input(&self) -> GrammarRequirement;

    /// Grammar version needed to publish this statement.
    fn minimum_grammar_for_publishing(&self) -> GrammarRequirement;

    /// Asset URLs referenced by this statement, in order.
    fn urls(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Whether this statement declares a package asset.
    fn is_asset(&self) -> bool {
        false
    }

    /// Whether this statement modifies an environment variable.
    fn is_environment_variable(&self) -> bool {
        false
    }

    /// Position rendered for appending to diagnostics.
    fn position_string(&self) -> String {
        self.position().describe()
    }
}

/// One parsed element of a package definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `config NAME ... end`
    Configuration(Configuration),
    /// `command ...`
    Command(Command),
    /// `archive LOCATION`
    Archive(Archive),
    /// `resource LOCATION`
    Resource(Resource),
    /// `set NAME=VALUE`
    Set(Set),
    /// `append NAME=VALUE`
    Path(Path),
    /// `include DESCRIPTOR`
    Include(Include),
    /// `override DESCRIPTOR`
    Override(Override),
    /// `retrieve VARIABLE->PATH`
    Retrieve(Retrieve),
}

impl Statement {
    fn node(&self) -> &dyn StatementNode {
        match self {
            Self::Configuration(statement) => statement,
            Self::Command(statement) => statement,
            Self::Archive(statement) => statement,
            Self::Resource(statement) => statement,
            Self::Set(statement) => statement,
            Self::Path(statement) => statement,
            Self::Include(statement) => statement,
            Self::Override(statement) => statement,
            Self::Retrieve(statement) => statement,
        }
    }

    /// The configuration, if this is one.
    pub fn as_configuration(&self) -> Option<&Configuration> {
        match self {
            Self::Configuration(configuration) => Some(configuration),
            _ => None,
        }
    }

    /// The command, if this is one.
    pub fn as_command(&self) -> Option<&Command> {
        match self {
            Self::Command(command) => Some(command),
            _ => None,
        }
    }
}

impl StatementNode for Statement {
    fn statement_type(&self) -> &'static str {
        self.node().statement_type()
    }

    fn position(&self) -> &Position {
        self.node().position()
    }

    fn walk_statements(&self, visitor: &mut dyn FnMut(&Statement)) {
        self.node().walk_statements(visitor);
    }

    fn unparse_as(&self, grammar_version: u32, indent: &str) -> String {
        self.node().unparse_as(grammar_version, indent)
    }

    fn unparse(&self, indent: &str) -> String {
        self.node().unparse(indent)
    }

    fn minimum_grammar_for_emitting_input(&self) -> GrammarRequirement {
        self.node().minimum_grammar_for_emitting_input()
    }

    fn minimum_grammar_for_publishing(&self) -> GrammarRequirement {
        self.node().minimum_grammar_for_publishing()
    }

    fn urls(&self) -> Vec<&str> {
        self.node().urls()
    }

    fn is_asset(&self) -> bool {
        self.node().is_asset()
    }

    fn is_environment_variable(&self) -> bool {
        self.node().is_environment_variable()
    }
}

/// Render a grouping statement: header line, indented body, footer line.
pub(crate) fn unparse_block(
    indent: &str,
    header: &str,
    statements: &[Statement],
    grammar_version: u32,
    footer: &str,
) -> String {
    let inner = format!("{indent}  ");
    let mut lines = Vec::with_capacity(statements.len() + 2);
    lines.push(format!("{indent}{header}"));
    lines.extend(
        statements
            .iter()
            .map(|statement| statement.unparse_as(grammar_version, &inner)),
    );
    lines.push(format!("{indent}{footer}"));
    lines.join("\n")
}

/// Quote a location or value so that the lexer gives it back unchanged.
///
/// Text without whitespace, quotes, backslashes, or comment markers is left
/// bare; anything else is single-quoted.
pub(crate) fn quote_if_needed(value: &str) -> String {
    let plain = !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\' | '#'));
    if plain {
        return value.to_string();
    }

    let escaped = value.replace('\\', r"\\").replace('\'', r"\'");
    format!("'{escaped}'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::{default_matchers, strip_quotes_and_process_escapes};

    #[test]
    fn quoting_round_trips_through_the_lexer() {
        for value in ["plain", "two words", r"C:\tools", "it's", "#hash", ""] {
            let quoted = quote_if_needed(value);
            let literal = strip_quotes_and_process_escapes(&quoted, &default_matchers()).unwrap();
            assert_eq!(literal.value, value, "quoted as {quoted}");
        }
    }

    #[test]
    fn plain_values_stay_bare() {
        assert_eq!(quote_if_needed("lib/foo.jar"), "lib/foo.jar");
        assert_eq!(quote_if_needed("a b"), "'a b'");
    }

    #[test]
    fn capability_defaults() {
        let include = Statement::Include(Include::new(crate::Descriptor::parse("a/1")));
        assert!(!include.is_asset());
        assert!(!include.is_environment_variable());
        assert!(include.urls().is_empty());

        let mut visited = 0;
        include.walk_statements(&mut |_| visited += 1);
        assert_eq!(visited, 0);
    }
}
