use super::StatementNode;
use crate::descriptor::Descriptor;
use crate::grammar::GrammarRequirement;
use crate::position::Position;

/// Pulls another package's configuration into the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    descriptor: Descriptor,
    position: Position,
}

impl Include {
    /// Include the package (and configuration) named by `descriptor`.
    pub fn new(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            position: Position::unknown(),
        }
    }

    /// Attach the position the statement was read from.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// The included package.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

impl StatementNode for Include {
    fn statement_type(&self) -> &'static str {
        "include"
    }

    fn position(&self) -> &Position {
        &self.position
    }

    fn unparse_as(&self, _grammar_version: u32, indent: &str) -> String {
        format!("{indent}include {}", self.descriptor)
    }

    fn minimum_grammar_for_emitting_input(&self) -> GrammarRequirement {
        GrammarRequirement::NONE
    }

    fn minimum_grammar_for_publishing(&self) -> GrammarRequirement {
        GrammarRequirement::NONE
    }
}

/// Forces the version used for a package wherever it is included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    descriptor: Descriptor,
    position: Position,
}

impl Override {
    /// Override to the package version named by `descriptor`.
    pub fn new(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            position: Position::unknown(),
        }
    }

    /// Attach the position the statement was read from.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// The overriding package version.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

impl StatementNode for Override {
    fn statement_type(&self) -> &'static str {
        "override"
    }

    fn position(&self) -> &Position {
        &self.position
    }

    fn unparse_as(&self, _grammar_version: u32, indent: &str) -> String {
        format!("{indent}override {}", self.descriptor)
    }

    fn minimum_grammar_for_emitting_input(&self) -> GrammarRequirement {
        GrammarRequirement::NONE
    }

    fn minimum_grammar_for_publishing(&self) -> GrammarRequirement {
        GrammarRequirement::NONE
    }
}
