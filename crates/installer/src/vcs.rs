//! Version-control installer.
//!
//! Repositories are cloned into a staging directory, optionally checked out at
//! a tag chosen from a semver constraint, and renamed into place. Updates pull
//! in place and refuse to touch a checkout with local changes.

use crate::error::{Error, Result};
use crate::name;
use crate::source::PluginSource;
use crate::staging;
use semver::{Version, VersionReq};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

/// Version-control operations the installer needs.
pub trait Vcs: Send + Sync {
    /// Clone `remote` into the existing, empty directory `dir`.
    fn sync(&self, remote: &str, dir: &Path) -> Result<()>;

    /// List the tags of the repository at `dir`.
    fn tags(&self, dir: &Path) -> Result<Vec<String>>;

    /// Check out `rev` in `dir`.
    fn checkout(&self, dir: &Path, rev: &str) -> Result<()>;

    /// Whether the working tree at `dir` has uncommitted changes.
    fn is_dirty(&self, dir: &Path) -> Result<bool>;

    /// Fetch and fast-forward the repository at `dir`.
    fn pull(&self, dir: &Path) -> Result<()>;

    /// URL of the `origin` remote of the repository at `dir`.
    fn remote_url(&self, dir: &Path) -> Result<String>;
}

/// [`Vcs`] implementation driving the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl GitCli {
    /// Use `git` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }

    /// Run git with `args`, returning trimmed stdout.
    fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        if let Some(dir) = dir {
            cmd.arg("-C").arg(dir);
        }
        cmd.args(args);

        let command = format!("{} {}", self.program, args.join(" "));
        log::debug!("Running: {command}");

        let output = cmd.output().map_err(|e| Error::Vcs {
            command: command.clone(),
            message: e.to_string(),
        })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(Error::Vcs {
                command,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn succeeds(&self, dir: &Path, args: &[&str]) -> bool {
        self.run(Some(dir), args).is_ok()
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl Vcs for GitCli {
    fn sync(&self, remote: &str, dir: &Path) -> Result<()> {
        let dir_str = dir.to_string_lossy();
        self.run(None, &["clone", "--quiet", remote, &dir_str]).map(drop)
    }

    fn tags(&self, dir: &Path) -> Result<Vec<String>> {
        let output = self.run(Some(dir), &["tag", "--list"])?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    fn checkout(&self, dir: &Path, rev: &str) -> Result<()> {
        self.run(Some(dir), &["checkout", "--quiet", rev]).map(drop)
    }

    fn is_dirty(&self, dir: &Path) -> Result<bool> {
        let output = self.run(Some(dir), &["status", "--porcelain"])?;
        Ok(!output.is_empty())
    }

    fn pull(&self, dir: &Path) -> Result<()> {
        self.run(Some(dir), &["fetch", "--quiet", "--tags"])?;
        // A tag checkout has a detached HEAD with nothing to fast-forward.
        if self.succeeds(dir, &["symbolic-ref", "-q", "HEAD"]) {
            self.run(Some(dir), &["pull", "--quiet", "--ff-only"])?;
        }
        Ok(())
    }

    fn remote_url(&self, dir: &Path) -> Result<String> {
        self.run(Some(dir), &["config", "--get", "remote.origin.url"])
    }
}

/// Pick the tag matching a version constraint.
///
/// An exact tag name wins. A plain version (`1.2.3` or `v1.2.3`) must match a
/// tag's version exactly; anything else is read as a semver requirement and
/// the highest matching tag is chosen. Tags that are not versions are ignored.
#[must_use]
pub fn resolve_version<'a>(constraint: &str, tags: &'a [String]) -> Option<&'a str> {
    if let Some(tag) = tags.iter().find(|tag| tag.as_str() == constraint) {
        return Some(tag.as_str());
    }

    let wanted = constraint.trim();
    let versioned = tags
        .iter()
        .filter_map(|tag| parse_tag(tag).map(|version| (version, tag.as_str())));

    if let Ok(exact) = Version::parse(wanted.strip_prefix('v').unwrap_or(wanted)) {
        return versioned
            .filter(|(version, _)| *version == exact)
            .map(|(_, tag)| tag)
            .next();
    }

    let req = VersionReq::parse(wanted).ok()?;
    versioned
        .filter(|(version, _)| req.matches(version))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, tag)| tag)
}

fn parse_tag(tag: &str) -> Option<Version> {
    Version::parse(tag.strip_prefix('v').unwrap_or(tag)).ok()
}

/// Derive a plugin name from a repository reference.
fn repo_name(location: &str) -> String {
    let trimmed = location.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
    name::strip_plugin_name(last.strip_suffix(".git").unwrap_or(last))
}

/// Installs a plugin from a version-control repository.
pub struct VcsInstaller {
    source: PluginSource,
    name: String,
    plugins_home: PathBuf,
    target_dir: PathBuf,
    vcs: Arc<dyn Vcs>,
}

impl VcsInstaller {
    /// Create an installer for a repository reference.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPluginName` when the reference yields no usable
    /// plugin name.
    pub fn new(source: PluginSource, plugins_home: &Path, vcs: Arc<dyn Vcs>) -> Result<Self> {
        let name = repo_name(source.location());
        Self::with_name(source, name, plugins_home, vcs)
    }

    /// Create an installer with an explicit plugin name.
    pub fn with_name(
        source: PluginSource,
        name: String,
        plugins_home: &Path,
        vcs: Arc<dyn Vcs>,
    ) -> Result<Self> {
        if !name::is_valid_plugin_name(&name) {
            return Err(Error::InvalidPluginName(name));
        }
        Ok(Self {
            target_dir: plugins_home.join(&name),
            plugins_home: plugins_home.to_path_buf(),
            source,
            name,
            vcs,
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

    /// Clone the repository and check out the requested version.
    pub fn install(&self) -> Result<()> {
        if staging::exists(&self.target_dir) {
            return Err(Error::PluginAlreadyExists {
                name: self.name.clone(),
                path: self.target_dir.clone(),
            });
        }

        log::info!("Cloning {} from {}", self.name, self.source.location());
        staging::install_staged(&self.plugins_home, &self.name, &self.target_dir, |dir| {
            self.vcs.sync(self.source.location(), dir)?;
            self.checkout_version(dir)?;
            crate::warn_missing_metadata(dir);
            Ok(())
        })
    }

    /// Pull upstream changes into an installed checkout.
    pub fn update(&self) -> Result<()> {
        if !staging::exists(&self.target_dir) {
            return Err(Error::PluginNotInstalled {
                name: self.name.clone(),
            });
        }
        if self.vcs.is_dirty(&self.target_dir)? {
            return Err(Error::LocalChanges {
                path: self.target_dir.clone(),
            });
        }

        log::info!("Updating {}", self.name);
        self.vcs.pull(&self.target_dir)?;
        self.checkout_version(&self.target_dir)
    }

    fn checkout_version(&self, dir: &Path) -> Result<()> {
        let Some(constraint) = self.source.version() else {
            return Ok(());
        };

        let tags = self.vcs.tags(dir)?;
        let tag = resolve_version(constraint, &tags).ok_or_else(|| Error::VersionNotFound {
            plugin: self.name.clone(),
            version: constraint.to_string(),
        })?;

        log::debug!("Checking out {tag} for constraint {constraint}");
        self.vcs.checkout(dir, tag)
    }
}

impl fmt::Debug for VcsInstaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VcsInstaller")
            .field("source", &self.source)
            .field("name", &self.name)
            .field("target_dir", &self.target_dir)
            .finish_non_exhaustive()
    }
}

/// In-memory [`Vcs`] for tests.
///
/// `sync` writes a `plugin.yaml` into the destination so installs look real.
#[derive(Debug, Clone, Default)]
pub struct MockVcs {
    tags: Arc<Mutex<Vec<String>>>,
    dirty: Arc<Mutex<bool>>,
    remote: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockVcs {
    /// Create a mock with no tags and a clean working tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tags reported for every repository.
    pub fn set_tags(&self, tags: &[&str]) {
        *self.tags.lock().unwrap() = tags.iter().map(|t| (*t).to_string()).collect();
    }

    /// Set whether working trees report local changes.
    pub fn set_dirty(&self, dirty: bool) {
        *self.dirty.lock().unwrap() = dirty;
    }

    /// Set the `origin` URL reported by `remote_url`.
    pub fn set_remote(&self, remote: &str) {
        *self.remote.lock().unwrap() = Some(remote.to_string());
    }

    /// Operations performed so far, e.g. `"checkout v1.0.0"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Vcs for MockVcs {
    fn sync(&self, remote: &str, dir: &Path) -> Result<()> {
        self.record(format!("sync {remote}"));
        let manifest = dir.join(crate::METADATA_FILE);
        std::fs::write(&manifest, "name: mock\n").map_err(|e| Error::io(&manifest, e))
    }

    fn tags(&self, _dir: &Path) -> Result<Vec<String>> {
        Ok(self.tags.lock().unwrap().clone())
    }

    fn checkout(&self, _dir: &Path, rev: &str) -> Result<()> {
        self.record(format!("checkout {rev}"));
        Ok(())
    }

    fn is_dirty(&self, _dir: &Path) -> Result<bool> {
        Ok(*self.dirty.lock().unwrap())
    }

    fn pull(&self, _dir: &Path) -> Result<()> {
        self.record("pull".to_string());
        Ok(())
    }

    fn remote_url(&self, dir: &Path) -> Result<String> {
        self.remote.lock().unwrap().clone().ok_or_else(|| Error::Vcs {
            command: "git config --get remote.origin.url".to_string(),
            message: format!("no origin remote in {}", dir.display()),
        })
    }
}
