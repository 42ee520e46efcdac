//! Archive creation and extraction.
//!
//! Published bundles are always written as tar.gz. Extraction handles
//! tar.gz, tar.zst, plain tar and zip.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use zip::ZipArchive;
use zstd::stream::Decoder as ZstdDecoder;

use super::OsError;

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// gzip-compressed tar
    TarGz,
    /// zstd-compressed tar
    TarZst,
    /// Uncompressed tar
    Tar,
    /// zip
    Zip,
}

/// Detect archive format from file extension
pub fn detect_format(path: &Path) -> Option<ArchiveFormat> {
    let path_str = path.to_string_lossy().to_lowercase();

    if path_str.ends_with(".tar.zst") || path_str.ends_with(".tzst") {
        Some(ArchiveFormat::TarZst)
    } else if path_str.ends_with(".tar.gz") || path_str.ends_with(".tgz") {
        Some(ArchiveFormat::TarGz)
    } else if path_str.ends_with(".tar") {
        Some(ArchiveFormat::Tar)
    } else if path_str.ends_with(".zip") {
        Some(ArchiveFormat::Zip)
    } else {
        None
    }
}

/// Name an archive entry: relative to `base` if below it, otherwise the path
/// as given, or just its file name if that is absolute.
fn entry_name(base: &Path, file: &Path) -> PathBuf {
    if let Ok(relative) = file.strip_prefix(base) {
        return relative.to_path_buf();
    }
    if file.is_absolute() {
        return file.file_name().map(PathBuf::from).unwrap_or_default();
    }
    file.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

/// Write `files` (regular files or directories) into a new tar.gz.
///
/// # Errors
///
/// Fails if a file cannot be read or the archive cannot be written.
pub fn create_tar_gz(archive: &Path, base: &Path, files: &[PathBuf]) -> Result<(), OsError> {
    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent).map_err(OsError::io(parent))?;
    }
    let file = File::create(archive).map_err(OsError::io(archive))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    for path in files {
        let name = entry_name(base, path);
        if name.as_os_str().is_empty() {
            continue;
        }
        let result = if path.is_dir() {
            builder.append_dir_all(&name, path)
        } else {
            builder.append_path_with_name(path, &name)
        };
        result.map_err(OsError::io(path))?;
    }

    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .map_err(OsError::io(archive))?;
    Ok(())
}

/// Join an archive entry onto `dest_dir`, refusing anything that would land
/// outside it.
fn safe_join(dest_dir: &Path, archive: &Path, entry: &Path) -> Result<PathBuf, OsError> {
    let escapes = entry
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(OsError::Archive {
            path: archive.to_path_buf(),
            message: format!("Invalid path in archive: {}", entry.display()),
        });
    }
    Ok(dest_dir.join(entry))
}

/// Extract a tar archive from a reader
fn extract_tar<R: Read>(
    reader: R,
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<PathBuf>, OsError> {
    let archive_error = |e: io::Error| OsError::Archive {
        path: archive_path.to_path_buf(),
        message: e.to_string(),
    };

    fs::create_dir_all(dest_dir).map_err(OsError::io(dest_dir))?;

    let mut archive = tar::Archive::new(reader);
    let mut extracted = Vec::new();

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        let entry_path = entry.path().map_err(archive_error)?.into_owned();
        let absolute_path = safe_join(dest_dir, archive_path, &entry_path)?;

        if entry.header().entry_type().is_dir() {
            fs::create_dir_all(&absolute_path).map_err(OsError::io(&absolute_path))?;
            continue;
        }

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent).map_err(OsError::io(parent))?;
        }
        entry.unpack(&absolute_path).map_err(archive_error)?;
        extracted.push(entry_path);
    }

    Ok(extracted)
}

/// Extract a zip archive
fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, OsError> {
    let archive_error = |e: zip::result::ZipError| OsError::Archive {
        path: archive_path.to_path_buf(),
        message: e.to_string(),
    };

    let file = File::open(archive_path).map_err(OsError::io(archive_path))?;
    let mut archive = ZipArchive::new(file).map_err(archive_error)?;

    fs::create_dir_all(dest_dir).map_err(OsError::io(dest_dir))?;
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(archive_error)?;
        let Some(relative_path) = file.enclosed_name() else {
            return Err(OsError::Archive {
                path: archive_path.to_path_buf(),
                message: format!("Invalid path in archive: {}", file.name()),
            });
        };
        let absolute_path = dest_dir.join(&relative_path);

        if file.is_dir() {
            fs::create_dir_all(&absolute_path).map_err(OsError::io(&absolute_path))?;
            continue;
        }

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent).map_err(OsError::io(parent))?;
        }
        let mut outfile = File::create(&absolute_path).map_err(OsError::io(&absolute_path))?;
        io::copy(&mut file, &mut outfile).map_err(OsError::io(&absolute_path))?;

        apply_mode(&absolute_path, file.unix_mode()).map_err(OsError::io(&absolute_path))?;

        extracted.push(relative_path);
    }

    Ok(extracted)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    match mode {
        Some(mode) => fs::set_permissions(path, fs::Permissions::from_mode(mode)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

/// Extract an archive into `dest_dir`, detecting the format from its name.
/// Returns the relative paths of the files written.
///
/// # Errors
///
/// Fails on an unknown format, a corrupt archive or an escaping entry.
pub fn extract_auto(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, OsError> {
    let format = detect_format(archive_path)
        .ok_or_else(|| OsError::UnsupportedFormat(archive_path.to_path_buf()))?;

    if format == ArchiveFormat::Zip {
        return extract_zip(archive_path, dest_dir);
    }

    let file = File::open(archive_path).map_err(OsError::io(archive_path))?;
    let reader = BufReader::new(file);
    match format {
        ArchiveFormat::TarGz => extract_tar(
            flate2::read::GzDecoder::new(reader),
            archive_path,
            dest_dir,
        ),
        ArchiveFormat::TarZst => {
            let decoder = ZstdDecoder::new(reader).map_err(OsError::io(archive_path))?;
            extract_tar(decoder, archive_path, dest_dir)
        }
        ArchiveFormat::Tar | ArchiveFormat::Zip => extract_tar(reader, archive_path, dest_dir),
    }
}
