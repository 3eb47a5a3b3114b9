//! Local plugin installer.
//!
//! A local directory is linked into the plugins root, so edits to the source
//! show up immediately. A local `.tar.gz`/`.tgz` file is unpacked through the
//! same staging pipeline as a downloaded archive.

use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::name;
use crate::source::PluginSource;
use crate::staging;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalMode {
    Link,
    Archive(Extractor),
}

/// Installs a plugin from the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalInstaller {
    source: PluginSource,
    name: String,
    plugins_home: PathBuf,
    target_dir: PathBuf,
    mode: LocalMode,
}

impl LocalInstaller {
    /// Create an installer for a local directory or archive file.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedArchiveFormat` for a file that is not a
    /// recognized archive, and `Error::InvalidPluginName` when no usable name
    /// can be derived from the path.
    pub fn new(source: PluginSource, plugins_home: &Path) -> Result<Self> {
        let path = Path::new(source.location());
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::InvalidPluginName(source.location().to_string()))?;

        let mode = if path.is_dir() {
            LocalMode::Link
        } else {
            LocalMode::Archive(Extractor::for_source(&file_name)?)
        };

        Self::build(source, name::strip_plugin_name(&file_name), plugins_home, mode)
    }

    /// Installer for a plugin already linked at `<plugins_home>/<name>`.
    pub(crate) fn linked(source: PluginSource, name: &str, plugins_home: &Path) -> Result<Self> {
        Self::build(source, name.to_string(), plugins_home, LocalMode::Link)
    }

    fn build(
        source: PluginSource,
        name: String,
        plugins_home: &Path,
        mode: LocalMode,
    ) -> Result<Self> {
        if !name::is_valid_plugin_name(&name) {
            return Err(Error::InvalidPluginName(name));
        }
        Ok(Self {
            target_dir: plugins_home.join(&name),
            plugins_home: plugins_home.to_path_buf(),
            source,
            name,
            mode,
        })
    }

    /// Canonical plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source this installer was built from.
    #[must_use]
    pub fn source(&self) -> &PluginSource {
        &self.source
    }

    /// Installation directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.target_dir
    }

    /// Whether the source is linked rather than unpacked.
    #[must_use]
    pub fn is_link(&self) -> bool {
        self.mode == LocalMode::Link
    }

    /// Link or unpack the plugin into its installation directory.
    pub fn install(&self) -> Result<()> {
        if staging::exists(&self.target_dir) {
            return Err(Error::PluginAlreadyExists {
                name: self.name.clone(),
                path: self.target_dir.clone(),
            });
        }

        let source = Path::new(self.source.location());
        match self.mode {
            LocalMode::Link => {
                crate::warn_missing_metadata(source);
                fs::create_dir_all(&self.plugins_home)
                    .map_err(|e| Error::io(&self.plugins_home, e))?;
                link_dir(source, &self.target_dir)
            }
            LocalMode::Archive(extractor) => {
                let file = File::open(source).map_err(|e| Error::io(source, e))?;
                staging::install_staged(&self.plugins_home, &self.name, &self.target_dir, |dir| {
                    extractor.extract(BufReader::new(file), dir)?;
                    crate::warn_missing_metadata(dir);
                    Ok(())
                })
            }
        }
    }

    /// Linked plugins always reflect their source, so there is nothing to do.
    /// Unpacked archives cannot be updated in place.
    pub fn update(&self) -> Result<()> {
        match self.mode {
            LocalMode::Link if staging::exists(&self.target_dir) => {
                log::debug!("{} is linked to its source; nothing to update", self.name);
                Ok(())
            }
            LocalMode::Link => Err(Error::PluginNotInstalled {
                name: self.name.clone(),
            }),
            LocalMode::Archive(_) => Err(Error::UpdateNotSupported {
                name: self.name.clone(),
                kind: "local archive".to_string(),
            }),
        }
    }
}

#[cfg(unix)]
fn link_dir(source: &Path, target: &Path) -> Result<()> {
    log::debug!("Linking {} -> {}", target.display(), source.display());
    std::os::unix::fs::symlink(source, target).map_err(|e| Error::io(target, e))
}

#[cfg(windows)]
fn link_dir(source: &Path, target: &Path) -> Result<()> {
    log::debug!("Linking {} -> {}", target.display(), source.display());
    std::os::windows::fs::symlink_dir(source, target).map_err(|e| Error::io(target, e))
}
