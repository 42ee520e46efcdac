use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use fig_core::Repository;
use fig_schema::statement::{Archive, Resource};
use fig_schema::{DefinitionParser, LEGACY_DEFINITION_FILE, Statement};

use crate::context::parse_coordinate;

/// Everything `fig publish` was asked to do.
#[derive(Debug)]
pub struct PublishRequest<'a> {
    pub descriptor: &'a str,
    pub file: Option<&'a Path>,
    pub resources: &'a [String],
    pub archives: &'a [String],
    pub local_only: bool,
}

fn read_statements(file: &Path) -> Result<Vec<Statement>> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    Ok(DefinitionParser::new().parse_statements(&file.to_string_lossy(), &content)?)
}

/// Publish a package built from a definition file plus command-line assets
pub fn publish(repository: &Repository, request: &PublishRequest<'_>) -> Result<()> {
    let coordinate = parse_coordinate(request.descriptor)?;

    let definition = match request.file {
        Some(file) => Some(file.to_path_buf()),
        None => Some(PathBuf::from(LEGACY_DEFINITION_FILE)).filter(|file| file.exists()),
    };

    // Command-line assets come first, in the order given.
    let mut statements: Vec<Statement> = request
        .resources
        .iter()
        .map(|r| Statement::Resource(Resource::new(r.as_str())))
        .chain(
            request
                .archives
                .iter()
                .map(|a| Statement::Archive(Archive::new(a.as_str()))),
        )
        .collect();
    if let Some(file) = &definition {
        statements.extend(read_statements(file)?);
    }

    if statements.is_empty() {
        bail!("Nothing to publish for {coordinate}: no {LEGACY_DEFINITION_FILE}, --file, --resource or --archive given");
    }

    let package = repository
        .publish_package(&statements, &coordinate, request.local_only)
        .with_context(|| format!("Failed to publish {coordinate}"))?;

    if request.local_only {
        println!("Published {package} locally");
    } else {
        println!("Published {package}");
    }
    Ok(())
}
