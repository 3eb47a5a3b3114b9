//! Remote archive installer.
//!
//! Install runs as:
//!
//! 1. refuse if the plugin directory already exists
//! 2. pick the archive URL for the requested version and check it exists
//! 3. download it through the injected [`Getter`]
//! 4. extract into a staging directory and rename it into place
//!
//! Remote archives have no update story: callers uninstall and install again.

use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::getter::Getter;
use crate::name;
use crate::source::PluginSource;
use crate::staging;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Installs a plugin from a `.tar.gz` / `.tgz` URL.
pub struct HttpInstaller {
    source: PluginSource,
    name: String,
    archive_name: String,
    plugins_home: PathBuf,
    target_dir: PathBuf,
    extractor: Extractor,
    getter: Arc<dyn Getter>,
}

impl HttpInstaller {
    /// Create an installer for an archive URL.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedArchiveFormat` when the URL does not end in
    /// a recognized archive suffix and `Error::InvalidPluginName` when the
    /// file name yields no usable plugin name.
    pub fn new(source: PluginSource, plugins_home: &Path, getter: Arc<dyn Getter>) -> Result<Self> {
        let url = parse_url(source.location())?;
        let archive_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(String::from)
            .ok_or_else(|| Error::UnsupportedArchiveFormat(source.location().to_string()))?;

        let extractor = Extractor::for_source(&archive_name)?;
        let name = name::strip_plugin_name(&archive_name);
        if !name::is_valid_plugin_name(&name) {
            return Err(Error::InvalidPluginName(name));
        }

        Ok(Self {
            target_dir: plugins_home.join(&name),
            plugins_home: plugins_home.to_path_buf(),
            source,
            name,
            archive_name,
            extractor,
            getter,
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

    /// Installation directory, whether or not the plugin is installed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.target_dir
    }

    /// Download and unpack the plugin.
    pub fn install(&self) -> Result<()> {
        if staging::exists(&self.target_dir) {
            return Err(Error::PluginAlreadyExists {
                name: self.name.clone(),
                path: self.target_dir.clone(),
            });
        }

        let href = self.download_url()?;
        log::info!("Downloading {} from {href}", self.name);
        let data = self.getter.get(&href)?;

        staging::install_staged(&self.plugins_home, &self.name, &self.target_dir, |dir| {
            self.extractor.extract(data.as_slice(), dir)?;
            crate::warn_missing_metadata(dir);
            Ok(())
        })
    }

    /// Always fails: remote archives cannot be updated in place.
    pub fn update(&self) -> Result<()> {
        Err(Error::UpdateNotSupported {
            name: self.name.clone(),
            kind: "http archive".to_string(),
        })
    }

    /// URL of the archive to download.
    ///
    /// With a version constraint the archive file name must carry exactly that
    /// version; the candidate is checked with the getter before anything is
    /// downloaded.
    fn download_url(&self) -> Result<String> {
        let location = self.source.location();
        let Some(version) = self.source.version() else {
            return Ok(location.to_string());
        };
        let wanted = version.strip_prefix('v').unwrap_or(version);

        let href = if name::archive_version(&self.archive_name) == Some(wanted) {
            location.to_string()
        } else {
            let file = name::with_version(&self.archive_name, wanted)
                .ok_or_else(|| Error::UnsupportedArchiveFormat(self.archive_name.clone()))?;
            let mut url = parse_url(location)?;
            url.path_segments_mut()
                .map_err(|()| Error::UnsupportedSourceKind(location.to_string()))?
                .pop()
                .push(&file);
            url.to_string()
        };

        if !self.getter.exists(&href)? {
            return Err(Error::VersionNotFound {
                plugin: self.name.clone(),
                version: version.to_string(),
            });
        }
        Ok(href)
    }
}

impl fmt::Debug for HttpInstaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpInstaller")
            .field("source", &self.source)
            .field("name", &self.name)
            .field("target_dir", &self.target_dir)
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}

fn parse_url(location: &str) -> Result<Url> {
    Url::parse(location).map_err(|_| Error::UnsupportedSourceKind(location.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::getter::MockGetter;
    use crate::source::SourceKind;
    use tempfile::TempDir;

    const SOURCE: &str = "https://repo.localdomain/plugins/fake-plugin-0.0.1.tar.gz";

    fn installer(source: &str, version: Option<&str>, mock: &MockGetter) -> (HttpInstaller, TempDir) {
        let home = TempDir::new().unwrap();
        let source = PluginSource::parse(source, version).unwrap();
        let installer = HttpInstaller::new(source, home.path(), Arc::new(mock.clone())).unwrap();
        (installer, home)
    }

    #[test]
    fn test_new_derives_name_and_path() {
        let (installer, home) = installer(SOURCE, None, &MockGetter::new());
        assert_eq!(installer.name(), "fake-plugin");
        assert_eq!(installer.path(), home.path().join("fake-plugin"));
    }

    #[test]
    fn test_new_ignores_query_string() {
        let (installer, _home) = installer(
            "https://example.com/dl/fake-plugin-1.0.0.tgz?token=abc",
            None,
            &MockGetter::new(),
        );
        assert_eq!(installer.name(), "fake-plugin");
    }

    #[test]
    fn test_new_rejects_url_without_file() {
        let home = TempDir::new().unwrap();
        let source = PluginSource::installed(SourceKind::Http, "https://example.com/".to_string());
        let err = HttpInstaller::new(source, home.path(), Arc::new(MockGetter::new())).unwrap_err();
        assert!(matches!(err, Error::UnsupportedArchiveFormat(_)));
    }

    #[test]
    fn test_download_url_without_version() {
        let mock = MockGetter::new();
        let (installer, _home) = installer(SOURCE, None, &mock);
        assert_eq!(installer.download_url().unwrap(), SOURCE);
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_download_url_matching_version() {
        let mock = MockGetter::new();
        mock.add_response(SOURCE, vec![]);
        let (installer, _home) = installer(SOURCE, Some("v0.0.1"), &mock);

        assert_eq!(installer.download_url().unwrap(), SOURCE);
        assert_eq!(mock.requests(), vec![format!("HEAD {SOURCE}")]);
    }

    #[test]
    fn test_download_url_other_version() {
        let mock = MockGetter::new();
        let wanted = "https://repo.localdomain/plugins/fake-plugin-0.0.3.tar.gz";
        mock.add_response(wanted, vec![]);
        let (installer, _home) = installer(SOURCE, Some("0.0.3"), &mock);

        assert_eq!(installer.download_url().unwrap(), wanted);
    }

    #[test]
    fn test_download_url_missing_version() {
        let mock = MockGetter::new();
        let (installer, _home) = installer(SOURCE, Some("9.9.9"), &mock);

        let err = installer.download_url().unwrap_err();
        assert!(matches!(err, Error::VersionNotFound { .. }), "{err:?}");
        assert_eq!(mock.get_count(), 0);
    }

    #[test]
    fn test_update_not_supported() {
        let (installer, _home) = installer(SOURCE, None, &MockGetter::new());
        let err = installer.update().unwrap_err();
        assert!(matches!(err, Error::UpdateNotSupported { .. }));
    }

    #[test]
    fn test_debug_omits_getter() {
        let (installer, _home) = installer(SOURCE, None, &MockGetter::new());
        let debug = format!("{installer:?}");
        assert!(debug.contains("fake-plugin"));
        assert!(!debug.contains("getter"));
    }
}
