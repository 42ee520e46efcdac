//! The package repository: a local cache of package directories backed by a
//! remote store.
//!
//! Layout, both locally and remotely, is `ROOT/NAME/VERSION/` holding the
//! package's `.fig` definition and its installed assets. Every install and
//! publish stages its files in a fresh `ROOT/.staging-XXXX` directory that is
//! removed when the operation ends.
//!
//! Inconsistencies between expected and actual state are never papered over:
//! a package whose remote definition vanished, or whose install failed, is
//! deleted from the local cache before the error is returned.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use fig_schema::statement::{Archive, Resource};
use fig_schema::{
    Coordinate, DEFINITION_FILE, LEGACY_DEFINITION_FILE, Package, PackageParser, Statement,
    unparse_statements,
};
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::config::AccessPolicy;
use crate::error::RepositoryError;
use crate::io::{OperatingSystem, OsError, UploadIdentity};
use crate::overrides::Overrides;
use crate::paths::{PROPERTIES_FILE, filename_from_url};

/// Name of the archive that publish bundles local resources into.
pub const BUNDLED_RESOURCES: &str = "resources.tar.gz";

/// URL schemes that mark a location as remote.
const URL_SCHEMES: [&str; 5] = ["ftp://", "http://", "https://", "file://", "ssh://"];

/// Where the repository lives and when it refreshes from the remote.
#[derive(Debug, Clone)]
pub struct RepositoryOptions {
    /// Local cache root (`FIG_HOME`).
    pub local_dir: PathBuf,
    /// Remote repository base URL, without a trailing slash.
    pub remote_url: Option<String>,
    /// Identity for authenticated uploads.
    pub remote_user: Option<UploadIdentity>,
    /// Always refresh a package from the remote before use.
    pub update: bool,
    /// Refresh a package only when it is absent locally.
    pub update_if_missing: bool,
}

impl RepositoryOptions {
    /// Options for a cache at `local_dir` that fetches missing packages.
    pub fn new(local_dir: impl Into<PathBuf>) -> Self {
        Self {
            local_dir: local_dir.into(),
            remote_url: None,
            remote_user: None,
            update: false,
            update_if_missing: true,
        }
    }

    /// Set the remote repository URL.
    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }
}

/// Local package cache with remote fetch, install and publish.
///
/// Operations are synchronous and blocking; the caller decides whether an
/// error terminates the process (see [`RepositoryError::exit_code`]).
#[derive(Debug)]
pub struct Repository {
    os: Box<dyn OperatingSystem>,
    parser: Box<dyn PackageParser>,
    access: Box<dyn AccessPolicy>,
    options: RepositoryOptions,
    overrides: Overrides,
}

impl Repository {
    /// Create a repository, reading the override table from `fig.properties`
    /// in the working directory if it exists.
    ///
    /// # Errors
    ///
    /// Fails if `fig.properties` exists but cannot be read.
    pub fn new(
        os: Box<dyn OperatingSystem>,
        parser: Box<dyn PackageParser>,
        access: Box<dyn AccessPolicy>,
        options: RepositoryOptions,
    ) -> Result<Self, RepositoryError> {
        let overrides = Overrides::load(Path::new(PROPERTIES_FILE))
            .map_err(RepositoryError::io("reading fig.properties"))?;
        if !overrides.is_empty() {
            debug!("Loaded {} overrides from {PROPERTIES_FILE}", overrides.len());
        }
        Ok(Self::with_overrides(os, parser, access, options, overrides))
    }

    /// Create a repository with an explicit override table.
    pub fn with_overrides(
        os: Box<dyn OperatingSystem>,
        parser: Box<dyn PackageParser>,
        access: Box<dyn AccessPolicy>,
        options: RepositoryOptions,
        overrides: Overrides,
    ) -> Self {
        Self {
            os,
            parser,
            access,
            options,
            overrides,
        }
    }

    /// Local cache root.
    pub fn local_dir(&self) -> &Path {
        &self.options.local_dir
    }

    /// Whether either update policy is active.
    pub fn updating(&self) -> bool {
        self.options.update || self.options.update_if_missing
    }

    /// Every `name/version` in the local cache. An absent cache is empty.
    ///
    /// # Errors
    ///
    /// Fails if a cache directory cannot be listed.
    pub fn list_packages(&self) -> Result<Vec<String>, RepositoryError> {
        let root = self.local_dir();
        let mut results = Vec::new();
        if !self.os.is_dir(root) {
            return Ok(results);
        }

        for name in self.os.list(root)? {
            let package_dir = root.join(&name);
            if name.starts_with('.') || !self.os.is_dir(&package_dir) {
                continue;
            }
            for version in self.os.list(&package_dir)? {
                if version.starts_with('.') || !self.os.is_dir(&package_dir.join(&version)) {
                    continue;
                }
                results.push(format!("{name}/{version}"));
            }
        }

        Ok(results)
    }

    /// Every `name/version` in the remote repository.
    ///
    /// # Errors
    ///
    /// Fails if no remote is configured or it cannot be listed.
    pub fn list_remote_packages(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(self.os.download_list(self.remote_url()?)?)
    }

    /// Delete a package version from the local cache, or every version when
    /// `version` is `None`. Deleting something absent succeeds.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::InvalidComponent`] for a name or version such as
    /// `..` that is not a plain directory name; otherwise fails if the
    /// directory exists but cannot be removed.
    pub fn clean(&self, name: &str, version: Option<&str>) -> Result<(), RepositoryError> {
        check_component(name)?;
        if let Some(version) = version {
            check_component(version)?;
        }
        let mut dir = self.local_dir().join(name);
        if let Some(version) = version {
            dir.push(version);
        }
        debug!("Removing {}", dir.display());
        Ok(self.os.delete_directory(&dir)?)
    }

    /// Load a package, refreshing it from the remote first when the update
    /// policy asks for it.
    ///
    /// # Errors
    ///
    /// Update failures are returned before any local read is attempted.
    pub fn load_package(&self, coordinate: &Coordinate) -> Result<Package, RepositoryError> {
        check_coordinate(coordinate)?;
        debug!("Considering {coordinate}.");
        if self.options.update
            || (self.options.update_if_missing && self.package_missing(coordinate))
        {
            self.update_package(coordinate)?;
        }
        self.read_local_package(coordinate)
    }

    /// Fetch a package's definition from the remote and, if it changed,
    /// install its assets.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::RemoteNotFound`] if the remote has no definition,
    /// after the local directory has been deleted;
    /// [`RepositoryError::InstallFailed`] if installing the assets failed.
    pub fn update_package(&self, coordinate: &Coordinate) -> Result<(), RepositoryError> {
        check_coordinate(coordinate)?;
        let remote_fig = self.remote_fig_file_for_package(coordinate)?;
        let local_fig = self.local_fig_file_for_package(coordinate);

        match self.os.download(&remote_fig, &local_fig) {
            Ok(true) => self.install_package(coordinate),
            Ok(false) => {
                debug!("{coordinate} is up to date.");
                Ok(())
            }
            Err(OsError::NotFound(_)) => {
                error!("Package not found in remote repository: {coordinate}");
                self.delete_local_package(coordinate)?;
                Err(RepositoryError::RemoteNotFound(coordinate.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn install_package(&self, coordinate: &Coordinate) -> Result<(), RepositoryError> {
        self.try_install_package(coordinate).map_err(|source| {
            error!("Install failed, cleaning up.");
            if let Err(e) = self.delete_local_package(coordinate) {
                warn!("Could not remove {coordinate}: {e}");
            }
            RepositoryError::InstallFailed {
                coordinate: coordinate.clone(),
                source: Box::new(source),
            }
        })
    }

    fn try_install_package(&self, coordinate: &Coordinate) -> Result<(), RepositoryError> {
        let package = self.read_local_package(coordinate)?;
        let staging = self.staging_dir()?;

        for archive_url in package.archive_urls() {
            let url = self.resolve_asset_url(coordinate, archive_url)?;
            debug!("Downloading archive {url}");
            self.os.download_archive(&url, staging.path())?;
        }
        for resource_url in package.resource_urls() {
            let url = self.resolve_asset_url(coordinate, resource_url)?;
            debug!("Downloading resource {url}");
            self.os.download_resource(&url, staging.path())?;
        }

        let local_dir = self.local_dir_for_package(coordinate);
        self.os.clear_directory(&local_dir)?;
        // Some packages contain no files, only a definition.
        if !package.has_no_assets() {
            self.os.move_entries(staging.path(), &local_dir)?;
        }
        self.write_local_package(coordinate, &package)
    }

    /// Publish a package built from `statements`.
    ///
    /// Local (non-URL) resources are bundled into one `resources.tar.gz`
    /// archive. Every asset is then uploaded to the remote package directory
    /// (unless `local_only`) and copied into the local cache, archives being
    /// unpacked there too. The rewritten definition, which refers to assets
    /// by file name only, is written to both places and returned.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::UrlAccessDenied`] if a URL asset is not whitelisted
    /// and [`RepositoryError::RemoteUrlUnset`] without a remote; both leave
    /// the local cache untouched. Any later failure removes the partially
    /// published local directory.
    pub fn publish_package(
        &self,
        statements: &[Statement],
        coordinate: &Coordinate,
        local_only: bool,
    ) -> Result<Package, RepositoryError> {
        check_coordinate(coordinate)?;
        let remote_dir = if local_only {
            None
        } else {
            Some(self.remote_dir_for_package(coordinate)?)
        };
        // Nothing in the cache is touched until every URL asset is allowed.
        for statement in statements {
            let location = match statement {
                Statement::Archive(archive) => archive.location(),
                Statement::Resource(resource) => resource.location(),
                _ => continue,
            };
            self.is_url_with_access(location)?;
        }

        let staging = self.staging_dir()?;
        let bundled = self.bundle_resources(statements, staging.path())?;

        let local_dir = self.local_dir_for_package(coordinate);
        self.try_publish_package(
            coordinate,
            &bundled,
            staging.path(),
            &local_dir,
            remote_dir.as_deref(),
        )
        .map_err(|e| {
            error!("Publish failed, cleaning up.");
            if let Err(cleanup) = self.os.delete_directory(&local_dir) {
                warn!("Could not remove {}: {cleanup}", local_dir.display());
            }
            e
        })
    }

    fn try_publish_package(
        &self,
        coordinate: &Coordinate,
        statements: &[Statement],
        staging: &Path,
        local_dir: &Path,
        remote_dir: Option<&str>,
    ) -> Result<Package, RepositoryError> {
        self.os.clear_directory(local_dir)?;

        let mut published = Vec::new();
        for statement in statements {
            let statement = match statement {
                Statement::Archive(archive) => {
                    let name = self.publish_asset(
                        archive.location(),
                        true,
                        staging,
                        local_dir,
                        remote_dir,
                    )?;
                    Statement::Archive(Archive::new(name))
                }
                Statement::Resource(resource) => {
                    let name = self.publish_asset(
                        resource.location(),
                        false,
                        staging,
                        local_dir,
                        remote_dir,
                    )?;
                    Statement::Resource(Resource::new(name))
                }
                other => other.clone(),
            };
            published.push(statement);
        }

        let fig_file = staging.join(DEFINITION_FILE);
        self.os.write(&fig_file, &unparse_statements(&published))?;
        if let Some(remote_dir) = remote_dir {
            self.os.upload(
                &fig_file,
                &format!("{remote_dir}/{DEFINITION_FILE}"),
                self.options.remote_user.as_ref(),
            )?;
        }
        self.os
            .copy(&fig_file, &self.local_fig_file_for_package(coordinate))?;

        info!("Published {coordinate}");
        Ok(Package::new(coordinate, Some(local_dir.to_path_buf()), published))
    }

    /// Upload and cache one asset, returning the file name it is published
    /// under.
    fn publish_asset(
        &self,
        location: &str,
        is_archive: bool,
        staging: &Path,
        local_dir: &Path,
        remote_dir: Option<&str>,
    ) -> Result<String, RepositoryError> {
        let name = filename_from_url(location).to_string();

        let source = if self.is_url_with_access(location)? {
            let downloaded = staging.join(&name);
            self.os.download(location, &downloaded)?;
            downloaded
        } else {
            PathBuf::from(location)
        };

        if let Some(remote_dir) = remote_dir {
            self.os.upload(
                &source,
                &format!("{remote_dir}/{name}"),
                self.options.remote_user.as_ref(),
            )?;
        }
        self.os.copy(&source, &local_dir.join(&name))?;
        if is_archive {
            self.os.unpack_archive(local_dir, &name)?;
        }

        Ok(name)
    }

    /// Replace every local resource with a single bundled archive, placed
    /// first.
    fn bundle_resources(
        &self,
        statements: &[Statement],
        staging: &Path,
    ) -> Result<Vec<Statement>, RepositoryError> {
        let mut resources = Vec::new();
        let mut kept = Vec::with_capacity(statements.len() + 1);
        for statement in statements {
            match statement {
                Statement::Resource(resource) if !Self::is_url(resource.location()) => {
                    resources.push(resource.location());
                }
                other => kept.push(other.clone()),
            }
        }

        if !resources.is_empty() {
            let files = expand_globs_from(&resources)?;
            let archive = staging.join(BUNDLED_RESOURCES);
            let base = std::env::current_dir()
                .map_err(RepositoryError::io("resolving the working directory"))?;
            debug!("Bundling {} resource files", files.len());
            self.os.create_archive(&archive, &base, &files)?;
            kept.insert(
                0,
                Statement::Archive(Archive::new(archive.to_string_lossy())),
            );
        }

        Ok(kept)
    }

    /// Read a package from its local cache directory.
    ///
    /// # Errors
    ///
    /// See [`read_package_from_directory`](Self::read_package_from_directory).
    pub fn read_local_package(&self, coordinate: &Coordinate) -> Result<Package, RepositoryError> {
        check_coordinate(coordinate)?;
        let dir = self.local_dir_for_package(coordinate);
        self.read_package_from_directory(&dir, coordinate)
    }

    /// Read and parse a package's definition straight from the remote.
    ///
    /// # Errors
    ///
    /// Fails if the remote is unset or unreachable, or the text does not
    /// parse.
    pub fn read_remote_package(&self, coordinate: &Coordinate) -> Result<Package, RepositoryError> {
        let url = self.remote_fig_file_for_package(coordinate)?;
        let content = self.os.read_url(&url)?;
        Ok(self.parser.parse_package(coordinate, None, &url, &content)?)
    }

    /// Read the definition in `dir`: `.fig`, or `package.fig` if that is
    /// absent.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::DefinitionMissing`] if neither file exists.
    pub fn read_package_from_directory(
        &self,
        dir: &Path,
        coordinate: &Coordinate,
    ) -> Result<Package, RepositoryError> {
        let mut file = dir.join(DEFINITION_FILE);
        if !self.os.exists(&file) {
            file = dir.join(LEGACY_DEFINITION_FILE);
        }
        if !self.os.exists(&file) {
            error!("Fig file not found for package: {}", file.display());
            return Err(RepositoryError::DefinitionMissing(file));
        }
        self.read_package_from_file(&file, coordinate)
    }

    /// Read and parse a specific definition file.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::PackageMissing`] if the file does not exist.
    pub fn read_package_from_file(
        &self,
        file: &Path,
        coordinate: &Coordinate,
    ) -> Result<Package, RepositoryError> {
        if !self.os.exists(file) {
            error!("Package not found: {coordinate}");
            return Err(RepositoryError::PackageMissing(coordinate.clone()));
        }
        if let Some(modified) = self.os.mtime(file) {
            let modified: DateTime<Local> = modified.into();
            debug!(
                "Reading {} (modified {})",
                file.display(),
                modified.format("%Y-%m-%d %H:%M:%S")
            );
        }

        let content = self.os.read(file)?;
        let source = file.to_string_lossy();
        Ok(self
            .parser
            .parse_package(coordinate, file.parent(), &source, &content)?)
    }

    /// Directory a package lives in: its override if one exists, otherwise
    /// `ROOT/NAME/VERSION`.
    pub fn local_dir_for_package(&self, coordinate: &Coordinate) -> PathBuf {
        if let Some(dir) = self.overrides.get(coordinate) {
            info!("override: {coordinate}={}", dir.display());
            return dir.to_path_buf();
        }
        self.local_dir()
            .join(&coordinate.name)
            .join(&coordinate.version)
    }

    /// Whether a location names a remote object rather than a local path.
    pub fn is_url(location: &str) -> bool {
        URL_SCHEMES.iter().any(|scheme| location.contains(scheme))
    }

    /// Whether `location` is a URL the access policy lets us fetch.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::UrlAccessDenied`] for a URL the policy forbids.
    pub fn is_url_with_access(&self, location: &str) -> Result<bool, RepositoryError> {
        if !Self::is_url(location) {
            return Ok(false);
        }
        if !self.access.url_access_allowed(location) {
            return Err(RepositoryError::UrlAccessDenied(location.to_string()));
        }
        Ok(true)
    }

    fn remote_url(&self) -> Result<&str, RepositoryError> {
        self.options
            .remote_url
            .as_deref()
            .ok_or(RepositoryError::RemoteUrlUnset)
    }

    fn remote_dir_for_package(&self, coordinate: &Coordinate) -> Result<String, RepositoryError> {
        Ok(format!("{}/{coordinate}", self.remote_url()?))
    }

    fn remote_fig_file_for_package(
        &self,
        coordinate: &Coordinate,
    ) -> Result<String, RepositoryError> {
        Ok(format!(
            "{}/{DEFINITION_FILE}",
            self.remote_dir_for_package(coordinate)?
        ))
    }

    fn local_fig_file_for_package(&self, coordinate: &Coordinate) -> PathBuf {
        self.local_dir_for_package(coordinate).join(DEFINITION_FILE)
    }

    /// Relative asset locations live next to the package's remote definition.
    fn resolve_asset_url(
        &self,
        coordinate: &Coordinate,
        location: &str,
    ) -> Result<String, RepositoryError> {
        if Self::is_url(location) {
            Ok(location.to_string())
        } else {
            Ok(format!(
                "{}/{location}",
                self.remote_dir_for_package(coordinate)?
            ))
        }
    }

    fn package_missing(&self, coordinate: &Coordinate) -> bool {
        !self.os.exists(&self.local_fig_file_for_package(coordinate))
    }

    fn delete_local_package(&self, coordinate: &Coordinate) -> Result<(), RepositoryError> {
        Ok(self
            .os
            .delete_directory(&self.local_dir_for_package(coordinate))?)
    }

    fn write_local_package(
        &self,
        coordinate: &Coordinate,
        package: &Package,
    ) -> Result<(), RepositoryError> {
        Ok(self
            .os
            .write(&self.local_fig_file_for_package(coordinate), &package.unparse())?)
    }

    /// A fresh staging directory on the same filesystem as the cache.
    fn staging_dir(&self) -> Result<TempDir, RepositoryError> {
        self.os.create_directory(self.local_dir())?;
        tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(self.local_dir())
            .map_err(RepositoryError::io("creating staging directory"))
    }
}

/// Refuse a name or version that would address anything but its own
/// directory below the cache root.
fn check_component(component: &str) -> Result<(), RepositoryError> {
    if component.is_empty()
        || component == "."
        || component == ".."
        || component.contains(['/', '\\'])
    {
        return Err(RepositoryError::InvalidComponent(component.to_string()));
    }
    Ok(())
}

fn check_coordinate(coordinate: &Coordinate) -> Result<(), RepositoryError> {
    check_component(&coordinate.name)?;
    check_component(&coordinate.version)
}

/// Expand resource patterns such as `lib/*.jar` into the files they match.
fn expand_globs_from(patterns: &[&str]) -> Result<Vec<PathBuf>, RepositoryError> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matches = glob::glob(pattern).map_err(|e| RepositoryError::InvalidPattern {
            pattern: (*pattern).to_string(),
            message: e.to_string(),
        })?;
        let before = files.len();
        for entry in matches {
            match entry {
                Ok(path) => files.push(path),
                Err(e) => warn!("Skipping unreadable match for {pattern}: {e}"),
            }
        }
        if files.len() == before {
            warn!("Resource {pattern} matched no files");
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllowAll, AppConfig};
    use crate::error::ErrorKind;
    use crate::io::SystemOs;
    use crate::io::archive::create_tar_gz;
    use fig_schema::DefinitionParser;
    use std::fs;

    struct Fixture {
        _temp: TempDir,
        local: PathBuf,
        remote: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let local = temp.path().join("fighome");
            let remote = temp.path().join("remote");
            fs::create_dir_all(&remote).unwrap();
            Self {
                _temp: temp,
                local,
                remote,
            }
        }

        fn remote_url(&self) -> String {
            format!("file://{}", self.remote.display())
        }

        fn options(&self) -> RepositoryOptions {
            RepositoryOptions::new(&self.local).with_remote_url(self.remote_url())
        }

        fn repository(&self) -> Repository {
            self.repository_with(self.options(), Overrides::new())
        }

        fn repository_with(&self, options: RepositoryOptions, overrides: Overrides) -> Repository {
            Repository::with_overrides(
                Box::new(SystemOs::new().unwrap()),
                Box::new(DefinitionParser::new()),
                Box::new(AllowAll),
                options,
                overrides,
            )
        }

        fn remote_package(&self, name: &str, version: &str, definition: &str) -> PathBuf {
            let dir = self.remote.join(name).join(version);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(".fig"), definition).unwrap();
            dir
        }
    }

    fn coordinate(name: &str, version: &str) -> Coordinate {
        Coordinate::new(name, version)
    }

    fn parse(text: &str) -> Vec<Statement> {
        DefinitionParser::new().parse_statements("test", text).unwrap()
    }

    #[test]
    fn url_detection() {
        assert!(Repository::is_url("http://host/a"));
        assert!(Repository::is_url("https://host/a"));
        assert!(Repository::is_url("ftp://host/a"));
        assert!(Repository::is_url("file:///a"));
        assert!(Repository::is_url("ssh://host/a"));
        assert!(!Repository::is_url("lib/a.jar"));
        assert!(!Repository::is_url("/abs/a.jar"));
    }

    #[test]
    fn list_packages_on_absent_root_is_empty() {
        let fixture = Fixture::new();
        assert!(fixture.repository().list_packages().unwrap().is_empty());
    }

    #[test]
    fn list_packages_on_empty_root_is_empty() {
        let fixture = Fixture::new();
        fs::create_dir_all(&fixture.local).unwrap();
        assert!(fixture.repository().list_packages().unwrap().is_empty());
    }

    #[test]
    fn list_packages_skips_hidden_and_files() {
        let fixture = Fixture::new();
        for dir in ["b/1.0", "a/2.0", "a/1.0", ".staging-x/1"] {
            fs::create_dir_all(fixture.local.join(dir)).unwrap();
        }
        fs::write(fixture.local.join("a/notes.txt"), "").unwrap();
        fs::write(fixture.local.join("stray"), "").unwrap();

        assert_eq!(
            fixture.repository().list_packages().unwrap(),
            ["a/1.0", "a/2.0", "b/1.0"]
        );
    }

    #[test]
    fn list_remote_packages_delegates_to_transport() {
        let fixture = Fixture::new();
        fixture.remote_package("tool", "3.1", "");
        assert_eq!(
            fixture.repository().list_remote_packages().unwrap(),
            ["tool/3.1"]
        );
    }

    #[test]
    fn list_remote_without_url_is_a_configuration_error() {
        let fixture = Fixture::new();
        let repository =
            fixture.repository_with(RepositoryOptions::new(&fixture.local), Overrides::new());
        let error = repository.list_remote_packages().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn clean_is_idempotent() {
        let fixture = Fixture::new();
        let dir = fixture.local.join("pkg/1.0");
        fs::create_dir_all(&dir).unwrap();
        fs::create_dir_all(fixture.local.join("pkg/2.0")).unwrap();

        let repository = fixture.repository();
        repository.clean("pkg", Some("1.0")).unwrap();
        assert!(!dir.exists());
        assert!(fixture.local.join("pkg/2.0").exists());
        repository.clean("pkg", Some("1.0")).unwrap();

        repository.clean("pkg", None).unwrap();
        assert!(!fixture.local.join("pkg").exists());
        repository.clean("never-there", None).unwrap();
    }

    #[test]
    fn clean_stays_inside_the_cache() {
        let fixture = Fixture::new();
        fs::create_dir_all(fixture.local.join("pkg/1.0")).unwrap();
        let sibling = fixture.local.parent().unwrap().join("precious.txt");
        fs::write(&sibling, "keep").unwrap();

        let repository = fixture.repository();
        for (name, version) in [("..", None), (".", None), ("", None), ("a/b", None)] {
            let error = repository.clean(name, version).unwrap_err();
            assert!(matches!(error, RepositoryError::InvalidComponent(_)), "{name}");
        }
        assert!(repository.clean("pkg", Some("..")).is_err());
        assert!(repository.clean("pkg", Some("..\\x")).is_err());

        assert_eq!(fs::read_to_string(&sibling).unwrap(), "keep");
        assert!(fixture.local.join("pkg/1.0").exists());
    }

    #[test]
    fn coordinates_must_be_plain_directory_names() {
        let fixture = Fixture::new();
        let repository = fixture.repository();
        let error = repository
            .load_package(&coordinate("..", "1.0"))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert!(repository.update_package(&coordinate("pkg", "..")).is_err());
        assert!(
            repository
                .publish_package(&parse("config default\nend"), &coordinate("..", "."), true)
                .is_err()
        );
        assert!(!fixture.local.exists());
    }

    #[test]
    fn load_fetches_missing_package_and_installs_assets() {
        let fixture = Fixture::new();
        let remote_dir = fixture.remote_package(
            "tool",
            "1.0",
            "resource tool.sh\narchive lib.tar.gz\nconfig default\n  append PATH=@/bin\nend",
        );
        fs::write(remote_dir.join("tool.sh"), "echo hi").unwrap();
        let lib_src = TempDir::new().unwrap();
        fs::create_dir_all(lib_src.path().join("lib")).unwrap();
        fs::write(lib_src.path().join("lib/a.so"), "so").unwrap();
        create_tar_gz(
            &remote_dir.join("lib.tar.gz"),
            lib_src.path(),
            &[lib_src.path().join("lib")],
        )
        .unwrap();

        let repository = fixture.repository();
        let package = repository.load_package(&coordinate("tool", "1.0")).unwrap();

        let local_dir = fixture.local.join("tool/1.0");
        assert_eq!(package.directory(), Some(local_dir.as_path()));
        assert_eq!(package.config("default").unwrap().statements().len(), 1);
        assert_eq!(fs::read_to_string(local_dir.join("tool.sh")).unwrap(), "echo hi");
        assert_eq!(fs::read_to_string(local_dir.join("lib/a.so")).unwrap(), "so");
        assert!(local_dir.join(".fig").exists());
        assert_eq!(repository.list_packages().unwrap(), ["tool/1.0"]);
        // Staging is gone once the install finishes.
        assert_eq!(fs::read_dir(&fixture.local).unwrap().count(), 1);
    }

    #[test]
    fn definition_only_package_installs() {
        let fixture = Fixture::new();
        fixture.remote_package("meta", "1", "config default\n  set A=b\nend");
        let package = fixture
            .repository()
            .load_package(&coordinate("meta", "1"))
            .unwrap();
        assert!(package.has_no_assets());
        assert_eq!(
            fs::read_to_string(fixture.local.join("meta/1/.fig")).unwrap(),
            "config default\n  set A=b\nend"
        );
    }

    #[test]
    fn load_without_update_reads_local_only() {
        let fixture = Fixture::new();
        fixture.remote_package("tool", "1.0", "");
        let mut options = fixture.options();
        options.update_if_missing = false;
        let repository = fixture.repository_with(options, Overrides::new());

        assert!(!repository.updating());
        let error = repository.load_package(&coordinate("tool", "1.0")).unwrap_err();
        assert!(matches!(error, RepositoryError::DefinitionMissing(_)));
        assert_eq!(error.exit_code(), 10);
    }

    #[test]
    fn legacy_definition_name_is_accepted() {
        let fixture = Fixture::new();
        let dir = fixture.local.join("old/0.1");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.fig"), "config default\nend").unwrap();

        let package = fixture
            .repository()
            .read_local_package(&coordinate("old", "0.1"))
            .unwrap();
        assert!(package.config("default").is_some());
    }

    #[test]
    fn missing_definition_file() {
        let fixture = Fixture::new();
        let error = fixture
            .repository()
            .read_package_from_file(&fixture.local.join("nope/.fig"), &coordinate("nope", "1"))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::PackageMissing);
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn update_of_missing_remote_deletes_local_copy() {
        let fixture = Fixture::new();
        let local_dir = fixture.local.join("gone/2.0");
        fs::create_dir_all(&local_dir).unwrap();
        fs::write(local_dir.join(".fig"), "config default\nend").unwrap();
        fs::write(local_dir.join("stale.jar"), "old").unwrap();

        let error = fixture
            .repository()
            .update_package(&coordinate("gone", "2.0"))
            .unwrap_err();

        assert!(matches!(error, RepositoryError::RemoteNotFound(_)));
        assert_eq!(error.exit_code(), 1);
        assert!(!local_dir.exists());
    }

    #[test]
    fn failed_install_leaves_no_partial_package() {
        let fixture = Fixture::new();
        fixture.remote_package("broken", "1", "archive missing.tar.gz");

        let error = fixture
            .repository()
            .load_package(&coordinate("broken", "1"))
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InstallFailed);
        assert_eq!(error.exit_code(), 10);
        assert!(!fixture.local.join("broken/1").exists());
    }

    #[test]
    fn unparsable_remote_definition_fails_install() {
        let fixture = Fixture::new();
        fixture.remote_package("bad", "1", "config a\n  config b\n  end\nend");
        let error = fixture
            .repository()
            .load_package(&coordinate("bad", "1"))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InstallFailed);
        assert!(!fixture.local.join("bad/1").exists());
    }

    #[test]
    fn override_wins_even_when_default_exists() {
        let fixture = Fixture::new();
        let default_dir = fixture.local.join("dep/1.0");
        fs::create_dir_all(&default_dir).unwrap();
        let mut overrides = Overrides::new();
        overrides.insert(&coordinate("dep", "1.0"), "/work/dep");

        let repository = fixture.repository_with(fixture.options(), overrides);
        assert_eq!(
            repository.local_dir_for_package(&coordinate("dep", "1.0")),
            PathBuf::from("/work/dep")
        );
        assert_eq!(
            repository.local_dir_for_package(&coordinate("dep", "2.0")),
            fixture.local.join("dep/2.0")
        );
    }

    #[test]
    fn read_remote_package_parses_without_directory() {
        let fixture = Fixture::new();
        fixture.remote_package("r", "1", "resource x.txt");
        let package = fixture
            .repository()
            .read_remote_package(&coordinate("r", "1"))
            .unwrap();
        assert_eq!(package.directory(), None);
        assert_eq!(package.resource_urls(), ["x.txt"]);
    }

    #[test]
    fn publish_bundles_resources_and_round_trips_through_remote() {
        let fixture = Fixture::new();
        let work = TempDir::new().unwrap();
        fs::write(work.path().join("a.jar"), "A").unwrap();
        fs::write(work.path().join("b.jar"), "B").unwrap();
        let dist_src = TempDir::new().unwrap();
        fs::write(dist_src.path().join("tool"), "bin").unwrap();
        let dist = work.path().join("dist.tar.gz");
        create_tar_gz(&dist, dist_src.path(), &[dist_src.path().join("tool")]).unwrap();

        let statements = parse(&format!(
            "resource {}/*.jar\narchive {}\nconfig default\n  append CLASSPATH=@/a.jar\nend",
            work.path().display(),
            dist.display()
        ));
        let published = fixture
            .repository()
            .publish_package(&statements, &coordinate("app", "1.0"), false)
            .unwrap();

        let expected = "archive resources.tar.gz\narchive dist.tar.gz\nconfig default\n  append CLASSPATH=@/a.jar\nend";
        assert_eq!(published.unparse(), expected);

        let remote_dir = fixture.remote.join("app/1.0");
        assert_eq!(fs::read_to_string(remote_dir.join(".fig")).unwrap(), expected);
        assert!(remote_dir.join(BUNDLED_RESOURCES).exists());
        assert!(remote_dir.join("dist.tar.gz").exists());

        let local_dir = fixture.local.join("app/1.0");
        assert_eq!(fs::read_to_string(local_dir.join("a.jar")).unwrap(), "A");
        assert_eq!(fs::read_to_string(local_dir.join("tool")).unwrap(), "bin");

        // A second cache installs the published package from the remote.
        let other = TempDir::new().unwrap();
        let mut options = fixture.options();
        options.local_dir = other.path().to_path_buf();
        let installed = fixture
            .repository_with(options, Overrides::new())
            .load_package(&coordinate("app", "1.0"))
            .unwrap();
        assert_eq!(installed.unparse(), expected);
        assert_eq!(fs::read_to_string(other.path().join("app/1.0/b.jar")).unwrap(), "B");
    }

    #[test]
    fn local_only_publish_needs_no_remote() {
        let fixture = Fixture::new();
        let repository =
            fixture.repository_with(RepositoryOptions::new(&fixture.local), Overrides::new());
        repository
            .publish_package(
                &parse("config default\n  set A=b\nend"),
                &coordinate("solo", "1"),
                true,
            )
            .unwrap();

        assert!(fixture.local.join("solo/1/.fig").exists());
        assert!(!fixture.remote.join("solo").exists());
    }

    #[test]
    fn publish_refuses_url_outside_whitelist() {
        let fixture = Fixture::new();
        let access = AppConfig {
            url_whitelist: vec!["http://good/".into()],
        };
        let repository = Repository::with_overrides(
            Box::new(SystemOs::new().unwrap()),
            Box::new(DefinitionParser::new()),
            Box::new(access),
            fixture.options(),
            Overrides::new(),
        );

        let error = repository
            .publish_package(
                &parse("resource http://evil/x.jar"),
                &coordinate("p", "1"),
                false,
            )
            .unwrap_err();
        assert!(matches!(error, RepositoryError::UrlAccessDenied(ref url) if url == "http://evil/x.jar"));
        assert!(!repository.is_url_with_access("lib/x.jar").unwrap());
    }

    fn install_locally(fixture: &Fixture, name: &str, version: &str) -> PathBuf {
        let dir = fixture.local.join(name).join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(".fig"), "resource lib.jar").unwrap();
        fs::write(dir.join("lib.jar"), "jar").unwrap();
        dir
    }

    #[test]
    fn refused_publish_keeps_installed_package() {
        let fixture = Fixture::new();
        let installed = install_locally(&fixture, "p", "1");
        let repository = Repository::with_overrides(
            Box::new(SystemOs::new().unwrap()),
            Box::new(DefinitionParser::new()),
            Box::new(AppConfig {
                url_whitelist: vec!["http://good/".into()],
            }),
            fixture.options(),
            Overrides::new(),
        );

        let error = repository
            .publish_package(
                &parse("resource http://evil/x.jar"),
                &coordinate("p", "1"),
                false,
            )
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UrlAccessDenied);
        assert_eq!(
            fs::read_to_string(installed.join(".fig")).unwrap(),
            "resource lib.jar"
        );
        assert!(installed.join("lib.jar").exists());
        assert_eq!(repository.list_packages().unwrap(), ["p/1"]);
    }

    #[test]
    fn publish_without_remote_keeps_installed_package() {
        let fixture = Fixture::new();
        let installed = install_locally(&fixture, "p", "1");
        let repository =
            fixture.repository_with(RepositoryOptions::new(&fixture.local), Overrides::new());

        let error = repository
            .publish_package(&parse("config default\nend"), &coordinate("p", "1"), false)
            .unwrap_err();
        assert!(matches!(error, RepositoryError::RemoteUrlUnset));
        assert!(installed.join(".fig").exists());
        assert!(installed.join("lib.jar").exists());
    }

    #[test]
    fn failed_publish_leaves_no_partial_package() {
        let fixture = Fixture::new();
        install_locally(&fixture, "p", "1");
        let missing = fixture.local.parent().unwrap().join("missing.tar.gz");

        let repository = fixture.repository();
        repository
            .publish_package(
                &parse(&format!("archive {}", missing.display())),
                &coordinate("p", "1"),
                false,
            )
            .unwrap_err();
        assert!(!fixture.local.join("p/1").exists());
        assert!(repository.list_packages().unwrap().is_empty());
    }

    #[test]
    fn publish_downloads_whitelisted_url_assets() {
        let fixture = Fixture::new();
        let upstream = TempDir::new().unwrap();
        fs::write(upstream.path().join("ext.txt"), "external").unwrap();

        let statements = parse(&format!(
            "resource file://{}/ext.txt",
            upstream.path().display()
        ));
        fixture
            .repository()
            .publish_package(&statements, &coordinate("ext", "1"), false)
            .unwrap();

        assert_eq!(
            fs::read_to_string(fixture.remote.join("ext/1/ext.txt")).unwrap(),
            "external"
        );
        assert_eq!(
            fs::read_to_string(fixture.remote.join("ext/1/.fig")).unwrap(),
            "resource ext.txt"
        );
    }
}
