use super::StatementNode;
use crate::grammar::{GrammarRequirement, requires_quoting};
use crate::position::Position;

/// Copies files named by a path variable into a local directory.
///
/// The path may contain `[package]`, which is replaced by the name of the
/// package that set the variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieve {
    variable: String,
    raw_path: String,
    position: Position,
}

impl Retrieve {
    /// Retrieve files named by `variable` into `raw_path`.
    pub fn new(variable: impl Into<String>, raw_path: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            raw_path: raw_path.into(),
            position: Position::unknown(),
        }
    }

    /// Attach the position the statement was read from.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Name of the path variable.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Destination as written.
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// Destination with `[package]` replaced.
    pub fn path_for_package(&self, package_name: &str) -> String {
        self.raw_path.replace("[package]", package_name)
    }
}

impl StatementNode for Retrieve {
    fn statement_type(&self) -> &'static str {
        "retrieve"
    }

    fn position(&self) -> &Position {
        &self.position
    }

    fn unparse_as(&self, _grammar_version: u32, indent: &str) -> String {
        format!("{indent}retrieve {}->{}", self.variable, self.raw_path)
    }

    fn minimum_grammar_for_emitting_input(&self) -> GrammarRequirement {
        requires_quoting(&self.raw_path).map_or(GrammarRequirement::NONE, |why| {
            GrammarRequirement::new(1, format!("retrieve path {why}"))
        })
    }

    fn minimum_grammar_for_publishing(&self) -> GrammarRequirement {
        self.minimum_grammar_for_emitting_input()
    }
}
