use anyhow::{Result, bail};
use fig_core::Repository;
use fig_schema::Descriptor;

/// Remove packages (or single versions) from the local repository
pub fn clean(repository: &Repository, descriptors: &[String]) -> Result<()> {
    for text in descriptors {
        let descriptor = Descriptor::parse(text);
        let Some(name) = descriptor.name.as_deref() else {
            bail!("Expected NAME or NAME/VERSION but got \"{text}\"");
        };
        repository.clean(name, descriptor.version.as_deref())?;
        tracing::info!("Removed {text}");
    }
    Ok(())
}
