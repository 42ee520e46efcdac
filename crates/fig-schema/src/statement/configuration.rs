use std::sync::Arc;

use super::{Command, Statement, StatementNode, unparse_block};
use crate::grammar::GrammarRequirement;
use crate::position::Position;

/// A named group of statements. Configurations do not nest; the parser
/// rejects a `config` inside another one.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    name: String,
    statements: Arc<Vec<Statement>>,
    position: Position,
}

impl Configuration {
    /// Create a configuration with an unknown position.
    pub fn new(name: impl Into<String>, statements: Vec<Statement>) -> Self {
        Self {
            name: name.into(),
            statements: Arc::new(statements),
            position: Position::unknown(),
        }
    }

    /// Attach the position the configuration was read from.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// A configuration with another name sharing this one's statements.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            statements: Arc::clone(&self.statements),
            position: self.position.clone(),
        }
    }

    /// Configuration name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Child statements in file order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Whether `other` shares this configuration's statement list.
    pub fn shares_statements_with(&self, other: &Configuration) -> bool {
        Arc::ptr_eq(&self.statements, &other.statements)
    }

    /// The first command statement, if any.
    pub fn command(&self) -> Option<&Command> {
        self.statements.iter().find_map(Statement::as_command)
    }
}

impl StatementNode for Configuration {
    fn statement_type(&self) -> &'static str {
        "config"
    }

    fn position(&self) -> &Position {
        &self.position
    }

    fn walk_statements(&self, visitor: &mut dyn FnMut(&Statement)) {
        for statement in self.statements.iter() {
            visitor(statement);
            statement.walk_statements(visitor);
        }
    }

    fn unparse_as(&self, grammar_version: u32, indent: &str) -> String {
        unparse_block(
            indent,
            &format!("config {}", self.name),
            &self.statements,
            grammar_version,
            "end",
        )
    }

    fn minimum_grammar_for_emitting_input(&self) -> GrammarRequirement {
        self.statements
            .iter()
            .map(StatementNode::minimum_grammar_for_emitting_input)
            .fold(GrammarRequirement::NONE, GrammarRequirement::max)
    }

    fn minimum_grammar_for_publishing(&self) -> GrammarRequirement {
        self.statements
            .iter()
            .map(StatementNode::minimum_grammar_for_publishing)
            .fold(GrammarRequirement::NONE, GrammarRequirement::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Descriptor;
    use crate::statement::{Include, Set};

    fn sample() -> Configuration {
        Configuration::new(
            "default",
            vec![
                Statement::Include(Include::new(Descriptor::parse("dep/1.0"))),
                Statement::Command(Command::new(vec![r#""echo hello""#.to_string()])),
                Statement::Set(Set::new("FOO", "bar")),
                Statement::Command(Command::new(vec![r#""second""#.to_string()])),
            ],
        )
    }

    #[test]
    fn command_returns_first_command() {
        let configuration = sample();
        let command = configuration.command().unwrap();
        assert_eq!(command.components(), [r#""echo hello""#]);
    }

    #[test]
    fn command_absent() {
        let configuration = Configuration::new("empty", Vec::new());
        assert!(configuration.command().is_none());
    }

    #[test]
    fn with_name_shares_statements() {
        let original = sample();
        let renamed = original.with_name("other");
        assert_eq!(renamed.name(), "other");
        assert_eq!(original.name(), "default");
        assert!(renamed.shares_statements_with(&original));
        assert_eq!(renamed.statements().len(), 4);
    }

    #[test]
    fn walk_visits_children_in_order() {
        let mut types = Vec::new();
        sample().walk_statements(&mut |statement| types.push(statement.statement_type()));
        assert_eq!(types, ["include", "command", "set", "command"]);
    }

    #[test]
    fn unparse_renders_block() {
        let text = sample().unparse("");
        assert_eq!(
            text,
            "config default\n  include dep/1.0\n  command \"echo hello\"\n  set FOO=bar\n  command \"second\"\nend"
        );
    }

    #[test]
    fn unparse_honours_indent() {
        let configuration =
            Configuration::new("x", vec![Statement::Set(Set::new("A", "b"))]);
        assert_eq!(configuration.unparse("  "), "  config x\n    set A=b\n  end");
    }

    #[test]
    fn grammar_is_maximum_of_children() {
        let plain = sample();
        assert_eq!(plain.minimum_grammar_for_emitting_input().version, 0);

        let configuration = Configuration::new(
            "v1",
            vec![Statement::Command(Command::new(vec![
                "echo".to_string(),
                "hello".to_string(),
            ]))],
        );
        let requirement = configuration.minimum_grammar_for_emitting_input();
        assert_eq!(requirement.version, 1);
        assert!(requirement.reason.is_some());
        assert_eq!(
            configuration.unparse(""),
            "config v1\n  command echo hello end\nend"
        );
    }
}
