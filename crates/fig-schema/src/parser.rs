//! Definition file parsing.
//!
//! The definition language is a flat stream of whitespace-separated tokens.
//! Quotes group whitespace into a token, a backslash protects the following
//! character, and `#` at the start of a token comments out the rest of the
//! line. Statements are introduced by keywords:
//!
//! ```text
//! grammar v1
//! resource lib/*.jar
//! archive http://example.com/tools.tar.gz
//! retrieve CLASSPATH->lib/[package]
//! config default
//!   include other/1.2:debug
//!   override dep/3.0
//!   set JAVA_HOME=@/jdk
//!   append PATH=@/bin
//!   command ant build end
//! end
//! ```

use std::path::Path;

use thiserror::Error;

use crate::descriptor::{Coordinate, Descriptor};
use crate::literal::{default_matchers, strip_quotes_and_process_escapes};
use crate::package::Package;
use crate::position::Position;
use crate::statement::{
    self, Archive, Command, Configuration, Include, Override, Resource, Retrieve, Set, Statement,
};

/// Errors raised while parsing a definition file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A token that does not fit the grammar at this point.
    #[error("expected {expected} but found «{found}»{position}.")]
    UnexpectedToken {
        /// The offending token.
        found: String,
        /// What the grammar wanted instead.
        expected: &'static str,
        /// Where the token was.
        position: Position,
    },

    /// The file ended in the middle of a statement.
    #[error("unexpected end of definition{position}; expected {expected}.")]
    UnexpectedEnd {
        /// What the grammar wanted.
        expected: &'static str,
        /// The origin of the definition.
        position: Position,
    },

    /// A literal could not be lexed; the message already names the token and
    /// its position.
    #[error("{0}")]
    Literal(String),

    /// A statement that is only legal in another context.
    #[error("«{keyword}»{position} is not allowed {context}.")]
    Misplaced {
        /// Keyword of the statement.
        keyword: String,
        /// Where the statement was.
        position: Position,
        /// Description of the context it appeared in.
        context: &'static str,
    },

    /// A configuration inside another configuration.
    #[error("configuration «{name}»{position} cannot be nested inside another configuration.")]
    NestedConfiguration {
        /// Name of the inner configuration.
        name: String,
        /// Where the inner configuration starts.
        position: Position,
    },

    /// An environment variable name that is not a word.
    #[error("invalid environment variable name «{name}»{position}.")]
    InvalidVariableName {
        /// The rejected name.
        name: String,
        /// Where the name was.
        position: Position,
    },

    /// A `grammar` statement naming an unknown version, or not coming first.
    #[error("grammar «{version}»{position} {problem}.")]
    Grammar {
        /// The version text as written.
        version: String,
        /// Where the statement was.
        position: Position,
        /// What is wrong with it.
        problem: &'static str,
    },
}

/// Turns definition text into a [`Package`].
pub trait PackageParser: std::fmt::Debug {
    /// Parse `content` as the definition of `coordinate`.
    ///
    /// `directory` is where the definition was read from, if anywhere, and
    /// `source_description` names the origin in diagnostics.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] describing the first problem found.
    fn parse_package(
        &self,
        coordinate: &Coordinate,
        directory: Option<&Path>,
        source_description: &str,
        content: &str,
    ) -> Result<Package, ParseError>;
}

/// Parser for `.fig` files in grammar v0 and v1.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionParser;

impl DefinitionParser {
    /// Create a parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse definition text into top-level statements.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] describing the first problem found.
    pub fn parse_statements(
        &self,
        source_description: &str,
        content: &str,
    ) -> Result<Vec<Statement>, ParseError> {
        let tokens = tokenize(content);
        let mut state = ParseState {
            tokens: &tokens,
            index: 0,
            source: source_description,
            grammar_version: 0,
        };
        state.parse()
    }
}

impl PackageParser for DefinitionParser {
    fn parse_package(
        &self,
        coordinate: &Coordinate,
        directory: Option<&Path>,
        source_description: &str,
        content: &str,
    ) -> Result<Package, ParseError> {
        let statements = self.parse_statements(source_description, content)?;
        Ok(Package::new(
            coordinate,
            directory.map(Path::to_path_buf),
            statements,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    line: usize,
    column: usize,
}

fn tokenize(content: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = content.chars().peekable();
    let (mut line, mut column) = (1, 1);

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            bump(c, &mut line, &mut column);
            continue;
        }

        if c == '#' {
            while let Some(&c) = chars.peek() {
                if c == '\n' {
                    break;
                }
                chars.next();
                bump(c, &mut line, &mut column);
            }
            continue;
        }

        let mut token = Token {
            text: String::new(),
            line,
            column,
        };
        let mut quote: Option<char> = None;

        while let Some(&c) = chars.peek() {
            if quote.is_none() && c.is_whitespace() {
                break;
            }
            chars.next();
            bump(c, &mut line, &mut column);
            token.text.push(c);

            match (c, quote) {
                ('\\', _) => {
                    if let Some(escaped) = chars.next() {
                        bump(escaped, &mut line, &mut column);
                        token.text.push(escaped);
                    }
                }
                ('\'' | '"', None) => quote = Some(c),
                (c, Some(open)) if c == open => quote = None,
                _ => {}
            }
        }

        tokens.push(token);
    }

    tokens
}

fn bump(c: char, line: &mut usize, column: &mut usize) {
    if c == '\n' {
        *line += 1;
        *column = 1;
    } else {
        *column += 1;
    }
}

struct ParseState<'a> {
    tokens: &'a [Token],
    index: usize,
    source: &'a str,
    grammar_version: u32,
}

impl ParseState<'_> {
    fn position(&self, token: &Token) -> Position {
        Position::new(token.line, token.column, Some(self.source))
    }

    fn end_position(&self) -> Position {
        Position::from_source(self.source)
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.index)?;
        self.index += 1;
        Some(token)
    }

    fn expect(&mut self, expected: &'static str) -> Result<Token, ParseError> {
        match self.tokens.get(self.index) {
            Some(token) => {
                self.index += 1;
                Ok(token.clone())
            }
            None => Err(ParseError::UnexpectedEnd {
                expected,
                position: self.end_position(),
            }),
        }
    }

    /// Lex a literal purely to validate it, returning its value.
    fn literal(&self, token: &Token, raw: &str) -> Result<String, ParseError> {
        strip_quotes_and_process_escapes(raw, &default_matchers())
            .map(|literal| literal.value)
            .map_err(|error| ParseError::Literal(error.describe(raw, &self.position(token))))
    }

    fn parse(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.parse_grammar_header()?;

        let mut statements = Vec::new();
        while let Some(token) = self.next().cloned() {
            let position = self.position(&token);
            let statement = match token.text.as_str() {
                "resource" => {
                    let (raw, location) = self.asset_location()?;
                    Statement::Resource(Resource::parsed(raw, location, position))
                }
                "archive" => {
                    let (raw, location) = self.asset_location()?;
                    Statement::Archive(Archive::parsed(raw, location, position))
                }
                "retrieve" => Statement::Retrieve(self.retrieve()?.with_position(position)),
                "config" => Statement::Configuration(self.configuration(position)?),
                "grammar" => return Err(self.misplaced_grammar(&token)),
                "set" | "append" | "path" | "add" | "include" | "override" | "command" => {
                    return Err(ParseError::Misplaced {
                        keyword: token.text,
                        position,
                        context: "outside a configuration",
                    });
                }
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        found: token.text,
                        expected: "a statement",
                        position,
                    });
                }
            };
            statements.push(statement);
        }

        Ok(statements)
    }

    fn parse_grammar_header(&mut self) -> Result<(), ParseError> {
        if self.tokens.first().is_none_or(|token| token.text != "grammar") {
            return Ok(());
        }
        self.index += 1;

        let version = self.expect("a grammar version")?;
        self.grammar_version = match version.text.as_str() {
            "v0" => 0,
            "v1" => 1,
            _ => {
                return Err(ParseError::Grammar {
                    version: version.text.clone(),
                    position: self.position(&version),
                    problem: "is not a supported version (v0 or v1)",
                });
            }
        };
        Ok(())
    }

    fn misplaced_grammar(&mut self, keyword: &Token) -> ParseError {
        let version = self
            .next()
            .map_or_else(String::new, |token| token.text.clone());
        ParseError::Grammar {
            version,
            position: self.position(keyword),
            problem: "must be the first statement",
        }
    }

    fn asset_location(&mut self) -> Result<(String, String), ParseError> {
        let token = self.expect("an asset location")?;
        let location = self.literal(&token, &token.text)?;
        Ok((token.text, location))
    }

    fn retrieve(&mut self) -> Result<Retrieve, ParseError> {
        let token = self.expect("VARIABLE->PATH")?;
        let Some((variable, path)) = token.text.split_once("->") else {
            return Err(ParseError::UnexpectedToken {
                found: token.text.clone(),
                expected: "VARIABLE->PATH",
                position: self.position(&token),
            });
        };
        self.variable_name(&token, variable)?;
        if path.is_empty() {
            return Err(ParseError::UnexpectedToken {
                found: token.text.clone(),
                expected: "a retrieve path",
                position: self.position(&token),
            });
        }
        self.literal(&token, path)?;
        Ok(Retrieve::new(variable, path))
    }

    fn variable_name(&self, token: &Token, name: &str) -> Result<(), ParseError> {
        let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(ParseError::InvalidVariableName {
                name: name.to_string(),
                position: self.position(token),
            })
        }
    }

    fn assignment(&mut self) -> Result<(String, String), ParseError> {
        let token = self.expect("NAME=VALUE")?;
        let Some((name, value)) = token.text.split_once('=') else {
            return Err(ParseError::UnexpectedToken {
                found: token.text.clone(),
                expected: "NAME=VALUE",
                position: self.position(&token),
            });
        };
        self.variable_name(&token, name)?;
        self.literal(&token, value)?;
        Ok((name.to_string(), value.to_string()))
    }

    fn descriptor(&mut self, require_version: bool) -> Result<Descriptor, ParseError> {
        let token = self.expect("a package descriptor")?;
        let descriptor = Descriptor::parse(&token.text);
        let complete = if require_version {
            descriptor.coordinate().is_some()
        } else {
            descriptor.name.is_some() || descriptor.config.is_some()
        };
        if !complete {
            return Err(ParseError::UnexpectedToken {
                found: token.text.clone(),
                expected: if require_version {
                    "a package/version descriptor"
                } else {
                    "a package descriptor"
                },
                position: self.position(&token),
            });
        }
        Ok(descriptor)
    }

    fn command(&mut self) -> Result<Command, ParseError> {
        let mut components = Vec::new();

        if self.grammar_version == 0 {
            let token = self.expect("a command")?;
            self.literal(&token, &token.text)?;
            components.push(token.text);
        } else {
            loop {
                let token = self.expect("a command component or end")?;
                if token.text == "end" {
                    break;
                }
                self.literal(&token, &token.text)?;
                components.push(token.text);
            }
            if components.is_empty() {
                return Err(ParseError::UnexpectedToken {
                    found: "end".to_string(),
                    expected: "a command component",
                    position: self.end_position(),
                });
            }
        }

        Ok(Command::new(components))
    }

    fn configuration(&mut self, position: Position) -> Result<Configuration, ParseError> {
        let name = self.expect("a configuration name")?;
        let mut statements = Vec::new();

        loop {
            let token = self.expect("end")?;
            let position = self.position(&token);
            let statement = match token.text.as_str() {
                "end" => break,
                "include" => Statement::Include(
                    Include::new(self.descriptor(false)?).with_position(position),
                ),
                "override" => Statement::Override(
                    Override::new(self.descriptor(true)?).with_position(position),
                ),
                "set" => {
                    let (name, value) = self.assignment()?;
                    Statement::Set(Set::new(name, value).with_position(position))
                }
                "append" | "path" | "add" => {
                    let (name, value) = self.assignment()?;
                    Statement::Path(statement::Path::new(name, value).with_position(position))
                }
                "command" => Statement::Command(self.command()?.with_position(position)),
                "config" => {
                    let inner = self.next().map_or_else(String::new, |t| t.text.clone());
                    return Err(ParseError::NestedConfiguration {
                        name: inner,
                        position,
                    });
                }
                "resource" | "archive" | "retrieve" | "grammar" => {
                    return Err(ParseError::Misplaced {
                        keyword: token.text,
                        position,
                        context: "inside a configuration",
                    });
                }
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        found: token.text,
                        expected: "a configuration statement or end",
                        position,
                    });
                }
            };
            statements.push(statement);
        }

        Ok(Configuration::new(name.text, statements).with_position(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::StatementNode;

    fn parse(content: &str) -> Result<Vec<Statement>, ParseError> {
        DefinitionParser::new().parse_statements("package.fig", content)
    }

    #[test]
    fn tokenizer_groups_quotes_and_tracks_positions() {
        let tokens = tokenize("set A='x y'  # comment\n  command \"a b\"");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["set", "A='x y'", "command", "\"a b\""]);
        assert_eq!((tokens[2].line, tokens[2].column), (2, 3));
    }

    #[test]
    fn tokenizer_keeps_escaped_whitespace() {
        let tokens = tokenize(r"a\ b c");
        assert_eq!(tokens[0].text, r"a\ b");
        assert_eq!(tokens[1].text, "c");
    }

    #[test]
    fn parses_full_v0_definition() {
        let statements = parse(
            "resource lib/a.jar\n\
             archive http://host/b.tar.gz\n\
             retrieve CLASSPATH->lib/[package]\n\
             config default\n\
               include other/1.2:debug\n\
               override dep/3.0\n\
               set JAVA_HOME=@/jdk\n\
               append PATH=@/bin\n\
               command \"ant build\"\n\
             end\n",
        )
        .unwrap();

        assert_eq!(statements.len(), 4);
        let Statement::Configuration(config) = &statements[3] else {
            panic!("expected a configuration");
        };
        assert_eq!(config.name(), "default");
        let types: Vec<_> = config.statements().iter().map(|s| s.statement_type()).collect();
        assert_eq!(types, ["include", "override", "set", "append", "command"]);
        assert_eq!(config.command().unwrap().components(), ["\"ant build\""]);
        assert_eq!(config.position().describe(), " (line 4, column 1, package.fig)");
    }

    #[test]
    fn path_aliases_become_append() {
        let statements = parse("config c\n path A=b\n add B=c\nend").unwrap();
        let config = statements[0].as_configuration().unwrap();
        assert!(
            config
                .statements()
                .iter()
                .all(|s| s.statement_type() == "append")
        );
    }

    #[test]
    fn v1_commands_run_to_end() {
        let statements = parse("grammar v1\nconfig c\n  command echo 'a b' end\nend").unwrap();
        let config = statements[0].as_configuration().unwrap();
        assert_eq!(config.command().unwrap().components(), ["echo", "'a b'"]);
    }

    #[test]
    fn nested_configuration_is_rejected() {
        let error = parse("config a\n  config b\n  end\nend").unwrap_err();
        assert_eq!(
            error.to_string(),
            "configuration «b» (line 2, column 3, package.fig) cannot be nested inside another configuration."
        );
    }

    #[test]
    fn missing_end() {
        assert!(matches!(
            parse("config a\n set A=b\n"),
            Err(ParseError::UnexpectedEnd { expected: "end", .. })
        ));
    }

    #[test]
    fn bad_literal_reports_token_and_position() {
        let error = parse("resource 'oops").unwrap_err();
        assert_eq!(
            error.to_string(),
            "«'oops» (line 1, column 10, package.fig) has unbalanced single quotes."
        );
    }

    #[test]
    fn invalid_variable_name() {
        assert!(matches!(
            parse("config a\n set A-B=c\nend"),
            Err(ParseError::InvalidVariableName { name, .. }) if name == "A-B"
        ));
    }

    #[test]
    fn misplaced_statements() {
        assert!(matches!(
            parse("set A=b"),
            Err(ParseError::Misplaced { context: "outside a configuration", .. })
        ));
        assert!(matches!(
            parse("config a\n resource x\nend"),
            Err(ParseError::Misplaced { context: "inside a configuration", .. })
        ));
    }

    #[test]
    fn grammar_must_come_first_and_be_known() {
        assert!(matches!(
            parse("resource a\ngrammar v1"),
            Err(ParseError::Grammar { problem: "must be the first statement", .. })
        ));
        assert!(matches!(parse("grammar v7"), Err(ParseError::Grammar { .. })));
    }

    #[test]
    fn override_needs_version() {
        assert!(parse("config a\n override dep\nend").is_err());
    }

    #[test]
    fn configuration_round_trips() {
        let original = Configuration::new(
            "default",
            vec![
                Statement::Include(Include::new(Descriptor::parse("dep/1.0:build"))),
                Statement::Set(Set::new("HOME_DIR", "'@/with space'")),
                Statement::Path(statement::Path::new("PATH", "@/bin")),
                Statement::Command(Command::new(vec!["make".into(), "\"all\"".into()])),
            ],
        );
        let text = crate::unparse_statements(&[Statement::Configuration(original.clone())]);
        let reparsed = parse(&text).unwrap();
        let config = reparsed[0].as_configuration().unwrap();

        assert_eq!(config.name(), original.name());

        let mut expected = Vec::new();
        original.walk_statements(&mut |s| expected.push(s.unparse("")));
        let mut actual = Vec::new();
        config.walk_statements(&mut |s| actual.push(s.unparse("")));
        assert_eq!(actual, expected);
    }

    #[test]
    fn package_round_trips() {
        let text = "grammar v1\nresource lib/a.jar\narchive b.tar.gz\nconfig default\n  command echo 'a b' end\nend";
        let statements = parse(text).unwrap();
        assert_eq!(crate::unparse_statements(&statements), text);
    }

    #[test]
    fn parse_package_records_coordinate_and_directory() {
        let package = DefinitionParser::new()
            .parse_package(
                &Coordinate::new("p", "2"),
                Some(Path::new("/cache/p/2")),
                "/cache/p/2/.fig",
                "resource r.txt",
            )
            .unwrap();
        assert_eq!(package.coordinate(), Coordinate::new("p", "2"));
        assert_eq!(package.directory(), Some(Path::new("/cache/p/2")));
        assert_eq!(package.resource_urls(), ["r.txt"]);
    }
}
