//! Parsed package definitions.

use std::path::{Path, PathBuf};

use crate::descriptor::Coordinate;
use crate::grammar::GrammarRequirement;
use crate::statement::{Configuration, Statement, StatementNode};

/// A package: its coordinate, the directory it was read from, and its
/// top-level statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    name: String,
    version: String,
    directory: Option<PathBuf>,
    statements: Vec<Statement>,
}

impl Package {
    /// Create a package value.
    pub fn new(
        coordinate: &Coordinate,
        directory: Option<PathBuf>,
        statements: Vec<Statement>,
    ) -> Self {
        Self {
            name: coordinate.name.clone(),
            version: coordinate.version.clone(),
            directory,
            statements,
        }
    }

    /// Package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The `(name, version)` pair.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(&self.name, &self.version)
    }

    /// Directory the definition file was read from, if any.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Top-level statements in file order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Locations of every `archive` statement.
    pub fn archive_urls(&self) -> Vec<&str> {
        self.statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::Archive(archive) => Some(archive.location()),
                _ => None,
            })
            .collect()
    }

    /// Locations of every `resource` statement.
    pub fn resource_urls(&self) -> Vec<&str> {
        self.statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::Resource(resource) => Some(resource.location()),
                _ => None,
            })
            .collect()
    }

    /// Whether the package declares no archives or resources.
    pub fn has_no_assets(&self) -> bool {
        !self.statements.iter().any(StatementNode::is_asset)
    }

    /// All configurations, in file order.
    pub fn configs(&self) -> impl Iterator<Item = &Configuration> {
        self.statements.iter().filter_map(Statement::as_configuration)
    }

    /// The configuration with the given name.
    pub fn config(&self, name: &str) -> Option<&Configuration> {
        self.configs().find(|config| config.name() == name)
    }

    /// Visit every statement in the package, depth first.
    pub fn walk_statements(&self, visitor: &mut dyn FnMut(&Statement)) {
        for statement in &self.statements {
            visitor(statement);
            statement.walk_statements(visitor);
        }
    }

    /// Render the whole definition file.
    pub fn unparse(&self) -> String {
        unparse_statements(&self.statements)
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// The grammar version a definition consisting of `statements` must declare.
pub fn required_grammar(statements: &[Statement]) -> GrammarRequirement {
    statements
        .iter()
        .map(StatementNode::minimum_grammar_for_publishing)
        .fold(GrammarRequirement::NONE, GrammarRequirement::max)
}

/// Render top-level statements as definition text.
///
/// A `grammar vN` header is written when anything needs a grammar newer than
/// v0, and every statement is then rendered in that grammar. Statements are
/// separated by newlines and the result is trimmed.
pub fn unparse_statements(statements: &[Statement]) -> String {
    let version = required_grammar(statements).version;

    let mut lines = Vec::with_capacity(statements.len() + 1);
    if version > 0 {
        lines.push(format!("grammar v{version}"));
    }
    lines.extend(
        statements
            .iter()
            .map(|statement| statement.unparse_as(version, "")),
    );

    lines.join("\n").trim().to_string()
}
