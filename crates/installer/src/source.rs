//! Source classification and installer resolution.
//!
//! A user-supplied source string is classified into a [`SourceKind`]:
//!
//! | Source                                   | Kind    |
//! |------------------------------------------|---------|
//! | existing file or directory               | `Local` |
//! | `git://`, `ssh://`, `git+https://`, `git@host:repo`, `https://….git` | `Vcs` |
//! | `http://` / `https://` URL to a `.tgz` or `.tar.gz` | `Http` |
//! | other `http://` / `https://` URL         | `Vcs`   |
//!
//! Resolution touches the filesystem only to check whether a local path
//! exists; nothing is fetched.

use crate::error::{Error, Result};
use crate::getter::Getter;
use crate::getter::http::HttpGetter;
use crate::http::HttpInstaller;
use crate::local::LocalInstaller;
use crate::name;
use crate::vcs::{GitCli, Vcs, VcsInstaller};
use crate::Installer;
use regex::Regex;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use url::Url;

static SCP_LIKE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+@[A-Za-z0-9.-]+:[^/\\].*$").expect("valid scp-like regex")
});

/// Where a plugin comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A directory or archive on the local filesystem.
    Local,
    /// A remote `.tar.gz` / `.tgz` archive.
    Http,
    /// A version-control repository.
    Vcs,
}

impl SourceKind {
    /// Get the kind as a lowercase string.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Http => "http",
            Self::Vcs => "vcs",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A classified plugin source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSource {
    raw: String,
    kind: SourceKind,
    location: String,
    version: Option<String>,
}

impl PluginSource {
    /// Classify `source`.
    ///
    /// An empty `version` counts as no constraint.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedSourceKind` when the source matches no kind.
    pub fn parse(source: &str, version: Option<&str>) -> Result<Self> {
        let raw = source.trim();
        if raw.is_empty() {
            return Err(Error::UnsupportedSourceKind(source.to_string()));
        }
        let version = version
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from);

        let path = Path::new(raw);
        if path.exists() {
            let location = fs::canonicalize(path).map_err(|e| Error::io(path, e))?;
            return Ok(Self {
                raw: raw.to_string(),
                kind: SourceKind::Local,
                location: location.to_string_lossy().to_string(),
                version,
            });
        }

        let kind = if is_vcs_reference(raw) {
            SourceKind::Vcs
        } else if is_http_url(raw) {
            SourceKind::Http
        } else {
            return Err(Error::UnsupportedSourceKind(raw.to_string()));
        };

        let location = match kind {
            SourceKind::Vcs => raw.strip_prefix("git+").unwrap_or(raw).to_string(),
            _ => raw.to_string(),
        };

        Ok(Self {
            raw: raw.to_string(),
            kind,
            location,
            version,
        })
    }

    /// The string the user typed.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The source kind.
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Absolute path (local) or URL (http, vcs).
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Requested version constraint, if any.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub(crate) fn installed(kind: SourceKind, location: String) -> Self {
        Self {
            raw: location.clone(),
            kind,
            location,
            version: None,
        }
    }
}

fn is_http_url(source: &str) -> bool {
    Url::parse(source).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

fn is_vcs_reference(source: &str) -> bool {
    match Url::parse(source) {
        Ok(url) => match url.scheme() {
            "git" | "ssh" | "git+ssh" | "git+https" | "git+http" => true,
            // Plain web URLs name a repository unless they point at an archive.
            "http" | "https" => {
                let path = url.path().trim_end_matches('/');
                path.ends_with(".git") || name::archive_suffix(path).is_none()
            }
            _ => false,
        },
        Err(_) => SCP_LIKE_RE.is_match(source),
    }
}

/// Builds [`Installer`] values for a plugins root.
///
/// The transport and VCS capabilities default to [`HttpGetter`] and
/// [`GitCli`]; tests swap them for mocks.
///
/// # Example
///
/// ```no_run
/// use installer::Resolver;
///
/// let resolver = Resolver::new("/home/me/.local/share/plugman/plugins");
/// let plugin = resolver
///     .resolve("https://example.com/plugins/fake-plugin-0.0.1.tar.gz", Some("0.0.1"))
///     .unwrap();
/// plugin.install().unwrap();
/// println!("Installed to {}", plugin.path().display());
/// ```
pub struct Resolver {
    plugins_home: PathBuf,
    getter: Arc<dyn Getter>,
    vcs: Arc<dyn Vcs>,
}

impl Resolver {
    /// Create a resolver for `plugins_home` with the default capabilities.
    pub fn new(plugins_home: impl Into<PathBuf>) -> Self {
        Self {
            plugins_home: plugins_home.into(),
            getter: Arc::new(HttpGetter::new()),
            vcs: Arc::new(GitCli::new()),
        }
    }

    /// Use a different transport for HTTP sources.
    pub fn with_getter(mut self, getter: Arc<dyn Getter>) -> Self {
        self.getter = getter;
        self
    }

    /// Use a different VCS implementation.
    pub fn with_vcs(mut self, vcs: Arc<dyn Vcs>) -> Self {
        self.vcs = vcs;
        self
    }

    /// The managed plugins root.
    #[must_use]
    pub fn plugins_home(&self) -> &Path {
        &self.plugins_home
    }

    /// Classify `source` and build the matching installer.
    pub fn resolve(&self, source: &str, version: Option<&str>) -> Result<Installer> {
        let source = PluginSource::parse(source, version)?;
        log::debug!(
            "Resolved {} as {} source ({})",
            source.raw(),
            source.kind(),
            source.location()
        );

        match source.kind() {
            SourceKind::Local => {
                LocalInstaller::new(source, &self.plugins_home).map(Installer::Local)
            }
            SourceKind::Http => {
                HttpInstaller::new(source, &self.plugins_home, Arc::clone(&self.getter))
                    .map(Installer::Http)
            }
            SourceKind::Vcs => VcsInstaller::new(source, &self.plugins_home, Arc::clone(&self.vcs))
                .map(Installer::Vcs),
        }
    }

    /// Rebuild the installer for an already installed plugin.
    ///
    /// Linked directories map back to local sources and git checkouts to their
    /// `origin` remote. Unpacked archives keep no record of their URL.
    pub fn find_source(&self, name: &str) -> Result<Installer> {
        if !name::is_valid_plugin_name(name) {
            return Err(Error::InvalidPluginName(name.to_string()));
        }
        let path = self.plugins_home.join(name);

        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::PluginNotInstalled {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(Error::io(&path, e)),
        };

        if metadata.file_type().is_symlink() {
            let target = fs::read_link(&path).map_err(|e| Error::io(&path, e))?;
            let source =
                PluginSource::installed(SourceKind::Local, target.to_string_lossy().to_string());
            return LocalInstaller::linked(source, name, &self.plugins_home).map(Installer::Local);
        }

        if path.join(".git").exists() {
            let remote = self.vcs.remote_url(&path)?;
            let source = PluginSource::installed(SourceKind::Vcs, remote);
            return VcsInstaller::with_name(
                source,
                name.to_string(),
                &self.plugins_home,
                Arc::clone(&self.vcs),
            )
            .map(Installer::Vcs);
        }

        Err(Error::SourceUnknown { path })
    }
}
