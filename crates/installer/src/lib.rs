//! # installer
//!
//! Plugin installation into a managed plugins directory.
//!
//! A plugin source is one of:
//! - a local directory (linked into place) or local `.tar.gz`/`.tgz` archive
//! - a remote `.tar.gz`/`.tgz` archive URL, optionally pinned to a version
//! - a git repository, optionally pinned to a tag or semver requirement
//!
//! Every plugin lives at `<plugins_home>/<name>`. Archives and clones are
//! materialized in a hidden staging directory and renamed into place, so a
//! failed install never leaves a partial plugin behind.
//!
//! ## Example
//!
//! ```no_run
//! use installer::Resolver;
//!
//! let resolver = Resolver::new("/home/me/.local/share/plugman/plugins");
//!
//! let plugin = resolver
//!     .resolve("https://example.com/plugins/fake-plugin-0.0.1.tar.gz", None)
//!     .expect("unsupported source");
//! plugin.install().expect("installation failed");
//!
//! println!("Installed {} to {}", plugin.name(), plugin.path().display());
//! ```
//!
//! ## Testing
//!
//! Network and git access go through the [`Getter`] and [`vcs::Vcs`] traits.
//! [`MockGetter`] and [`MockVcs`] stand in for them:
//!
//! ```
//! use installer::{MockGetter, MockVcs, Resolver};
//! use std::sync::Arc;
//!
//! let resolver = Resolver::new("/tmp/plugins")
//!     .with_getter(Arc::new(MockGetter::new()))
//!     .with_vcs(Arc::new(MockVcs::new()));
//! assert_eq!(resolver.plugins_home().to_str(), Some("/tmp/plugins"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod extract;
pub mod getter;
pub mod http;
pub mod local;
pub mod name;
pub mod source;
pub mod staging;
pub mod vcs;

pub use error::{Error, ErrorCategory, Result, TransportError};
pub use extract::Extractor;
pub use getter::{Getter, MockGetter};
pub use source::{PluginSource, Resolver, SourceKind};
pub use vcs::MockVcs;

use http::HttpInstaller;
use local::LocalInstaller;
use std::path::Path;
use vcs::VcsInstaller;

/// Metadata file every plugin is expected to ship at its root.
pub const METADATA_FILE: &str = "plugin.yaml";

/// Log a warning when a plugin directory has no metadata file.
pub(crate) fn warn_missing_metadata(dir: &Path) {
    if !dir.join(METADATA_FILE).is_file() {
        log::warn!("{} has no {METADATA_FILE}", dir.display());
    }
}

/// An installer for one plugin source.
#[derive(Debug)]
pub enum Installer {
    /// Local directory or archive file.
    Local(LocalInstaller),
    /// Remote archive.
    Http(HttpInstaller),
    /// Version-control repository.
    Vcs(VcsInstaller),
}

impl Installer {
    /// Install the plugin into `<plugins_home>/<name>`.
    ///
    /// # Errors
    ///
    /// Returns `Error::PluginAlreadyExists` when the target directory exists,
    /// plus any error from fetching or unpacking the source. On failure the
    /// target directory is not created.
    pub fn install(&self) -> Result<()> {
        log::info!("Installing {} ({} source)", self.name(), self.kind());
        match self {
            Self::Local(i) => i.install(),
            Self::Http(i) => i.install(),
            Self::Vcs(i) => i.install(),
        }?;
        log::info!("Installed {} to {}", self.name(), self.path().display());
        Ok(())
    }

    /// Update an installed plugin.
    ///
    /// # Errors
    ///
    /// Remote archives and unpacked local archives return
    /// `Error::UpdateNotSupported`.
    pub fn update(&self) -> Result<()> {
        match self {
            Self::Local(i) => i.update(),
            Self::Http(i) => i.update(),
            Self::Vcs(i) => i.update(),
        }
    }

    /// Installation directory, whether or not the plugin is installed yet.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Local(i) => i.path(),
            Self::Http(i) => i.path(),
            Self::Vcs(i) => i.path(),
        }
    }

    /// Canonical plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Local(i) => i.name(),
            Self::Http(i) => i.name(),
            Self::Vcs(i) => i.name(),
        }
    }

    /// The classified source.
    #[must_use]
    pub fn source(&self) -> &PluginSource {
        match self {
            Self::Local(i) => i.source(),
            Self::Http(i) => i.source(),
            Self::Vcs(i) => i.source(),
        }
    }

    /// Source kind.
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Local(_) => SourceKind::Local,
            Self::Http(_) => SourceKind::Http,
            Self::Vcs(_) => SourceKind::Vcs,
        }
    }
}
