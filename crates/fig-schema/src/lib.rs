//! Definition language for fig packages.
//!
//! This crate holds everything about package definition files (`.fig`) that
//! does not touch the filesystem or the network: package descriptors, source
//! positions, the string-literal lexer, the statement tree, and the parser
//! that turns definition text into a [`Package`].

pub mod descriptor;
pub mod grammar;
pub mod literal;
pub mod package;
pub mod parser;
pub mod position;
pub mod statement;

// Re-exports
pub use descriptor::{Coordinate, Descriptor};
pub use grammar::GrammarRequirement;
pub use literal::{LexError, Literal, SubstitutionMatcher, strip_quotes_and_process_escapes};
pub use package::{Package, unparse_statements};
pub use parser::{DefinitionParser, PackageParser, ParseError};
pub use position::Position;
pub use statement::{Statement, StatementNode};

/// Canonical name of a package definition file inside a package directory.
pub const DEFINITION_FILE: &str = ".fig";

/// Legacy definition file name, consulted when [`DEFINITION_FILE`] is absent.
pub const LEGACY_DEFINITION_FILE: &str = "package.fig";
