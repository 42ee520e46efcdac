use super::StatementNode;
use crate::grammar::{GrammarRequirement, requires_quoting};
use crate::literal::{LexError, Literal, SubstitutionMatcher, strip_quotes_and_process_escapes};
use crate::position::Position;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Assignment {
    name: String,
    raw_value: String,
    position: Position,
}

impl Assignment {
    fn requirement(&self) -> GrammarRequirement {
        requires_quoting(&self.raw_value).map_or(GrammarRequirement::NONE, |why| {
            GrammarRequirement::new(1, format!("value {why}"))
        })
    }
}

macro_rules! variable_statement {
    ($(#[$doc:meta])* $name:ident, $keyword:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(Assignment);

        impl $name {
            /// Create a statement from a variable name and its value as it
            /// would be written in a definition file.
            pub fn new(name: impl Into<String>, raw_value: impl Into<String>) -> Self {
                Self(Assignment {
                    name: name.into(),
                    raw_value: raw_value.into(),
                    position: Position::unknown(),
                })
            }

            /// Attach the position the statement was read from.
            pub fn with_position(mut self, position: Position) -> Self {
                self.0.position = position;
                self
            }

            /// Environment variable name.
            pub fn name(&self) -> &str {
                &self.0.name
            }

            /// Value exactly as written, quotes and escapes included.
            pub fn raw_value(&self) -> &str {
                &self.0.raw_value
            }

            /// Lex the value with the environment's substitution matchers.
            ///
            /// # Errors
            ///
            /// Returns the lexer's error for a malformed value.
            pub fn value(&self, matchers: &[SubstitutionMatcher]) -> Result<Literal, LexError> {
                strip_quotes_and_process_escapes(&self.0.raw_value, matchers)
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
                format!("{indent}{} {}={}", $keyword, self.0.name, self.0.raw_value)
            }

            fn minimum_grammar_for_emitting_input(&self) -> GrammarRequirement {
                self.0.requirement()
            }

            fn minimum_grammar_for_publishing(&self) -> GrammarRequirement {
                self.0.requirement()
            }

            fn is_environment_variable(&self) -> bool {
                true
            }
        }
    };
}

variable_statement!(
    /// Sets an environment variable, replacing any previous value.
    Set,
    "set"
);

variable_statement!(
    /// Prepends a value to a path-like environment variable.
    Path,
    "append"
);
