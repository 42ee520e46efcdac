use super::StatementNode;
use crate::grammar::GrammarRequirement;
use crate::literal::{LexError, Literal, SubstitutionMatcher, strip_quotes_and_process_escapes};
use crate::position::Position;

/// The command run by a configuration.
///
/// Components are kept exactly as written (quotes and escapes included);
/// they are only lexed when the command is about to be executed.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    components: Vec<String>,
    position: Position,
}

impl Command {
    /// Create a command from raw components.
    pub fn new(components: Vec<String>) -> Self {
        Self {
            components,
            position: Position::unknown(),
        }
    }

    /// Attach the position the command was read from.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Raw components in order.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Lex every component with the given substitution matchers.
    ///
    /// # Errors
    ///
    /// Returns the first component that fails to lex, with its error.
    pub fn literal_components(
        &self,
        matchers: &[SubstitutionMatcher],
    ) -> Result<Vec<Literal>, (String, LexError)> {
        self.components
            .iter()
            .map(|component| {
                strip_quotes_and_process_escapes(component, matchers)
                    .map_err(|error| (component.clone(), error))
            })
            .collect()
    }
}

impl StatementNode for Command {
    fn statement_type(&self) -> &'static str {
        "command"
    }

    fn position(&self) -> &Position {
        &self.position
    }

    fn unparse_as(&self, grammar_version: u32, indent: &str) -> String {
        let joined = self.components.join(" ");
        if grammar_version == 0 && self.components.len() == 1 {
            format!("{indent}command {joined}")
        } else {
            format!("{indent}command {joined} end")
        }
    }

    fn minimum_grammar_for_emitting_input(&self) -> GrammarRequirement {
        if self.components.len() > 1 {
            GrammarRequirement::new(1, "command contains multiple components")
        } else {
            GrammarRequirement::NONE
        }
    }

    fn minimum_grammar_for_publishing(&self) -> GrammarRequirement {
        self.minimum_grammar_for_emitting_input()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::default_matchers;

    #[test]
    fn single_component_uses_legacy_form() {
        let command = Command::new(vec![r#""ant build""#.to_string()]);
        assert_eq!(command.unparse(""), r#"command "ant build""#);
        assert_eq!(command.unparse_as(1, "  "), r#"  command "ant build" end"#);
    }

    #[test]
    fn literal_components_lex_each_part() {
        let command = Command::new(vec!["echo".to_string(), r"'a b'".to_string()]);
        let literals = command.literal_components(&default_matchers()).unwrap();
        assert_eq!(literals[0].value, "echo");
        assert!(literals[1].single_quoted);
        assert_eq!(literals[1].value, "a b");
    }

    #[test]
    fn literal_components_report_offender() {
        let command = Command::new(vec!["ok".to_string(), "bad'".to_string()]);
        let (component, _) = command.literal_components(&[]).unwrap_err();
        assert_eq!(component, "bad'");
    }
}
