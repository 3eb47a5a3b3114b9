//! Staged installation.
//!
//! Plugin contents are materialized in a hidden sibling directory of the
//! target (`<plugins_home>/.<name>-XXXXXX`) and renamed into place only once
//! complete. On any failure the staging directory is made writable again and
//! removed when the `TempDir` guard drops, so the target is either absent or
//! fully populated.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Mode given to the staging directory before it becomes the plugin directory.
#[cfg(unix)]
const PLUGIN_DIR_MODE: u32 = 0o755;

/// Check whether anything (including a dangling symlink) exists at `path`.
#[must_use]
pub fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Fill a staging directory with `fill`, then rename it onto `target`.
///
/// `target` must be a direct child of `plugins_home`; the staging directory is
/// created next to it so the final rename stays on one filesystem.
pub fn install_staged<F>(plugins_home: &Path, name: &str, target: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    fs::create_dir_all(plugins_home).map_err(|e| Error::io(plugins_home, e))?;

    let staging = tempfile::Builder::new()
        .prefix(&format!(".{name}-"))
        .tempdir_in(plugins_home)
        .map_err(|e| Error::io(plugins_home, e))?;
    log::debug!("Staging {name} in {}", staging.path().display());

    let result = fill(staging.path()).and_then(|()| promote(staging.path(), name, target));
    // Extraction may have left read-only directories the guard cannot remove.
    if result.is_err()
        && let Err(e) = make_writable(staging.path())
    {
        log::debug!("Could not reset modes under {}: {e}", staging.path().display());
    }
    result
}

fn promote(staging: &Path, name: &str, target: &Path) -> Result<()> {
    set_dir_mode(staging)?;

    // Another install may have finished while we were fetching.
    if exists(target) {
        return Err(Error::PluginAlreadyExists {
            name: name.to_string(),
            path: target.to_path_buf(),
        });
    }

    fs::rename(staging, target).map_err(|e| Error::io(target, e))?;
    log::debug!("Moved {} into place", target.display());
    Ok(())
}

/// Give the owner full access to every directory under `path`, so the tree
/// can be removed. Symlinks are not followed.
pub fn make_writable(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;
    if !metadata.is_dir() {
        return Ok(());
    }
    // Before reading, or an unreadable directory could not be walked.
    add_owner_access(path, &metadata)?;
    for entry in fs::read_dir(path).map_err(|e| Error::io(path, e))? {
        let entry = entry.map_err(|e| Error::io(path, e))?;
        make_writable(&entry.path())?;
    }
    Ok(())
}

#[cfg(unix)]
fn add_owner_access(path: &Path, metadata: &fs::Metadata) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = metadata.permissions().mode();
    if mode & 0o700 == 0o700 {
        return Ok(());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o700))
        .map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn add_owner_access(_path: &Path, _metadata: &fs::Metadata) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_dir_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(PLUGIN_DIR_MODE))
        .map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn set_dir_mode(_path: &Path) -> Result<()> {
    Ok(())
}
