//! Archive extraction.
//!
//! The [`Extractor`] is chosen from the archive's file name and unpacks a
//! byte stream into a destination directory:
//!
//! - gzip is decoded lazily while tar members are read in stream order
//! - member names are normalized and must stay inside the destination
//! - regular files keep the permission bits recorded in the archive
//! - links and special files are rejected
//!
//! Extraction stops at the first error. Callers that need all-or-nothing
//! behavior extract into a staging directory (see [`crate::staging`]).

use crate::error::{Error, Result};
use crate::name;
use flate2::read::GzDecoder;
use std::cmp::Reverse;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::EntryType;

/// Mode for directories whose header carries none.
const DEFAULT_DIR_MODE: u32 = 0o755;

/// Mode for files whose header mode cannot be parsed.
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    /// gzip-compressed tar (`.tar.gz`, `.tgz`).
    TarGz,
}

impl Extractor {
    /// Select an extractor from a file name (or the last segment of a URL path).
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedArchiveFormat` for unknown suffixes.
    pub fn for_source(source: &str) -> Result<Self> {
        match name::archive_suffix(source) {
            Some(_) => Ok(Self::TarGz),
            None => Err(Error::UnsupportedArchiveFormat(source.to_string())),
        }
    }

    /// Unpack `reader` into `dest`, which must already exist.
    pub fn extract<R: Read>(&self, reader: R, dest: &Path) -> Result<()> {
        log::debug!("Extracting archive into {}", dest.display());
        match self {
            Self::TarGz => extract_tar(GzDecoder::new(reader), dest),
        }
    }
}

fn extract_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);

    // Directory modes are applied last so read-only directories can still be filled.
    let mut dir_modes: Vec<(PathBuf, u32)> = Vec::new();

    for entry in archive.entries().map_err(Error::CorruptArchive)? {
        let mut entry = entry.map_err(Error::CorruptArchive)?;
        let recorded = entry.path().map_err(Error::CorruptArchive)?.into_owned();
        let entry_type = entry.header().entry_type();

        if entry_type.is_pax_global_extensions() {
            continue;
        }

        let relative = normalize_entry_path(&recorded)?;
        let mode = entry.header().mode().ok();
        let full_path = dest.join(&relative);

        match entry_type {
            EntryType::Directory => {
                log::trace!("dir  {}", relative.display());
                fs::create_dir_all(&full_path).map_err(|e| Error::io(&full_path, e))?;
                if !relative.as_os_str().is_empty() {
                    let mode = mode.filter(|m| *m != 0).unwrap_or(DEFAULT_DIR_MODE);
                    dir_modes.push((full_path, mode));
                }
            }
            EntryType::Regular | EntryType::Continuous => {
                if relative.as_os_str().is_empty() {
                    return Err(Error::PathTraversal { entry: recorded });
                }
                log::trace!("file {}", relative.display());
                write_file(&mut entry, &full_path, mode.unwrap_or(DEFAULT_FILE_MODE))?;
            }
            other => {
                return Err(Error::UnsupportedEntry {
                    entry: recorded,
                    kind: format!("{other:?}"),
                });
            }
        }
    }

    dir_modes.sort_by_key(|(path, _)| Reverse(path.components().count()));
    for (path, mode) in dir_modes {
        set_mode(&path, mode)?;
    }

    Ok(())
}

/// Resolve an archive member name to a path relative to the destination.
///
/// `.` segments are dropped and `..` pops the previous segment; anything that
/// would leave the destination (or is absolute) is a `PathTraversal`.
pub fn normalize_entry_path(recorded: &Path) -> Result<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in recorded.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(Error::PathTraversal {
                        entry: recorded.to_path_buf(),
                    });
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::PathTraversal {
                    entry: recorded.to_path_buf(),
                });
            }
        }
    }
    Ok(normalized)
}

fn write_file<R: Read>(entry: &mut R, path: &Path, mode: u32) -> Result<()> {
    let mut contents = Vec::new();
    entry
        .read_to_end(&mut contents)
        .map_err(Error::CorruptArchive)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, &contents).map_err(|e| Error::io(path, e))?;
    set_mode(path, mode)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777))
        .map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
