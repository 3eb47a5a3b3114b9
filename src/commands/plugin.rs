//! Plugin commands: install, update, uninstall, list, path.
//!
//! Installing and updating go through the `installer` crate; listing and
//! uninstalling only look at the plugins directory.

use crate::Context;
use crate::ui;
use anyhow::{Context as _, Result, bail};
use installer::name::is_valid_plugin_name;
use installer::staging;
use installer::{Error as InstallError, METADATA_FILE};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

// =============================================================================
// Install / Update
// =============================================================================

/// Install a plugin from `source`.
pub fn install(ctx: &Context, source: &str, version: Option<&str>) -> Result<()> {
    let plugin = ctx
        .resolver()
        .resolve(source, version)
        .with_context(|| format!("Cannot install from {source}"))?;

    if !ctx.quiet {
        ui::info(&format!(
            "Installing {} ({} source)...",
            plugin.name(),
            plugin.kind()
        ));
        if ctx.verbose > 0 {
            ui::kv("Source", plugin.source().location());
            ui::kv("Target", &plugin.path().display().to_string());
        }
    }

    plugin
        .install()
        .with_context(|| format!("Failed to install {}", plugin.name()))?;

    if !ctx.quiet {
        ui::success(&format!("Installed {}", plugin.name()));
        ui::dim(&plugin.path().display().to_string());
    }
    Ok(())
}

/// Update each named plugin, continuing past failures.
pub fn update(ctx: &Context, names: &[String]) -> Result<()> {
    let resolver = ctx.resolver();
    let mut failed = 0;

    for name in names {
        let result = resolver
            .find_source(name)
            .and_then(|plugin| plugin.update());
        match result {
            Ok(()) => {
                if !ctx.quiet {
                    ui::success(&format!("Updated {name}"));
                }
            }
            Err(e) => {
                ui::report(&anyhow::Error::new(e).context(format!("Failed to update {name}")));
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} plugin(s) failed to update");
    }
    Ok(())
}

// =============================================================================
// Uninstall
// =============================================================================

/// Remove each named plugin.
///
/// A linked plugin only loses its link; the source directory is left alone.
pub fn uninstall(ctx: &Context, names: &[String]) -> Result<()> {
    for name in names {
        let path = installed_path(&ctx.plugins_dir, name)?;
        remove_plugin(&path).with_context(|| format!("Failed to uninstall {name}"))?;
        if !ctx.quiet {
            ui::success(&format!("Uninstalled {name}"));
        }
    }
    Ok(())
}

fn remove_plugin(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path)
        .with_context(|| format!("Could not read {}", path.display()))?;

    if metadata.file_type().is_symlink() {
        log::debug!("Removing link {}", path.display());
        remove_link(path)
    } else if metadata.is_dir() {
        log::debug!("Removing directory {}", path.display());
        // Archives may carry read-only directories.
        staging::make_writable(path)
            .with_context(|| format!("Could not reset permissions under {}", path.display()))?;
        fs::remove_dir_all(path).with_context(|| format!("Could not remove {}", path.display()))
    } else {
        fs::remove_file(path).with_context(|| format!("Could not remove {}", path.display()))
    }
}

#[cfg(unix)]
fn remove_link(path: &Path) -> Result<()> {
    fs::remove_file(path).with_context(|| format!("Could not remove {}", path.display()))
}

#[cfg(windows)]
fn remove_link(path: &Path) -> Result<()> {
    fs::remove_dir(path).with_context(|| format!("Could not remove {}", path.display()))
}

// =============================================================================
// List / Path
// =============================================================================

/// How an installed plugin got there, as far as the directory shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallKind {
    /// Symlink to a local directory
    Linked,
    /// Git checkout
    Git,
    /// Unpacked archive
    Archive,
}

impl InstallKind {
    fn label(self) -> &'static str {
        match self {
            Self::Linked => "linked",
            Self::Git => "git",
            Self::Archive => "archive",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PluginEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: InstallKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_to: Option<PathBuf>,
    pub has_metadata: bool,
}

/// List installed plugins.
pub fn list(ctx: &Context, json: bool) -> Result<()> {
    let plugins = scan(&ctx.plugins_dir)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plugins)?);
        return Ok(());
    }

    if plugins.is_empty() {
        if !ctx.quiet {
            ui::info(&format!(
                "No plugins installed in {}",
                ctx.plugins_dir.display()
            ));
        }
        return Ok(());
    }

    ui::header("Installed Plugins");
    for plugin in &plugins {
        let detail = match &plugin.linked_to {
            Some(target) => format!(
                "{} -> {}",
                plugin.kind.label(),
                ui::truncate_path(&target.display().to_string(), 60)
            ),
            None => plugin.kind.label().to_string(),
        };
        ui::kv(&plugin.name, &detail);
        if !plugin.has_metadata {
            ui::warn(&format!("{} has no {METADATA_FILE}", plugin.name));
        }
    }
    Ok(())
}

/// Print the directory of an installed plugin.
pub fn path(ctx: &Context, name: &str) -> Result<()> {
    let path = installed_path(&ctx.plugins_dir, name)?;
    println!("{}", path.display());
    Ok(())
}

/// Scan the plugins directory. Hidden entries (staging directories) are skipped.
pub fn scan(plugins_dir: &Path) -> Result<Vec<PluginEntry>> {
    let entries = match fs::read_dir(plugins_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("Could not read {}", plugins_dir.display()));
        }
    };

    let mut plugins = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Could not read {}", plugins_dir.display()))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type()?;
        let (kind, linked_to) = if file_type.is_symlink() {
            (InstallKind::Linked, fs::read_link(&path).ok())
        } else if file_type.is_dir() {
            if path.join(".git").exists() {
                (InstallKind::Git, None)
            } else {
                (InstallKind::Archive, None)
            }
        } else {
            log::debug!("Skipping non-directory {}", path.display());
            continue;
        };

        plugins.push(PluginEntry {
            has_metadata: path.join(METADATA_FILE).is_file(),
            name,
            path,
            kind,
            linked_to,
        });
    }

    plugins.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(plugins)
}

/// Path of an installed plugin, or a `PluginNotInstalled` error.
fn installed_path(plugins_dir: &Path, name: &str) -> Result<PathBuf> {
    if !is_valid_plugin_name(name) {
        return Err(InstallError::InvalidPluginName(name.to_string()).into());
    }
    let path = plugins_dir.join(name);
    if fs::symlink_metadata(&path).is_err() {
        return Err(InstallError::PluginNotInstalled {
            name: name.to_string(),
        }
        .into());
    }
    Ok(path)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(scan(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_scan_classifies_entries() {
        let home = TempDir::new().unwrap();
        let unpacked = home.path().join("unpacked");
        fs::create_dir(&unpacked).unwrap();
        fs::write(unpacked.join(METADATA_FILE), "name: unpacked").unwrap();
        fs::create_dir_all(home.path().join("cloned/.git")).unwrap();
        fs::create_dir(home.path().join(".staging-abc123")).unwrap();
        fs::write(home.path().join("stray.txt"), "x").unwrap();

        let plugins = scan(home.path()).unwrap();
        let names: Vec<_> = plugins.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["cloned", "unpacked"]);
        assert_eq!(plugins[0].kind, InstallKind::Git);
        assert!(!plugins[0].has_metadata);
        assert_eq!(plugins[1].kind, InstallKind::Archive);
        assert!(plugins[1].has_metadata);
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_linked_plugin_keeps_source() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("src");
        fs::create_dir(&source).unwrap();
        fs::write(source.join(METADATA_FILE), "name: src").unwrap();
        let link = root.path().join("linked");
        std::os::unix::fs::symlink(&source, &link).unwrap();

        let plugins = scan(root.path()).unwrap();
        let linked = plugins.iter().find(|p| p.name == "linked").unwrap();
        assert_eq!(linked.kind, InstallKind::Linked);
        assert_eq!(linked.linked_to.as_deref(), Some(source.as_path()));

        remove_plugin(&link).unwrap();
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(source.join(METADATA_FILE).is_file());
    }

    #[test]
    fn test_remove_unpacked_plugin() {
        let home = TempDir::new().unwrap();
        let plugin = home.path().join("demo");
        fs::create_dir_all(plugin.join("bin")).unwrap();
        fs::write(plugin.join("bin/run"), "#!/bin/sh").unwrap();

        remove_plugin(&plugin).unwrap();
        assert!(!plugin.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_uninstall_archive_with_read_only_directory() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use installer::Resolver;
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let archive = root.path().join("demo-1.0.0.tgz");
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, kind, body, mode) in [
            ("plugin.yaml", tar::EntryType::Regular, &b"name: demo"[..], 0o644),
            ("ro/", tar::EntryType::Directory, &b""[..], 0o555),
            ("ro/file", tar::EntryType::Regular, &b"x"[..], 0o444),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(kind);
            header.set_size(body.len() as u64);
            header.set_mode(mode);
            header.set_cksum();
            builder.append_data(&mut header, path, body).unwrap();
        }
        fs::write(&archive, builder.into_inner().unwrap().finish().unwrap()).unwrap();

        let home = root.path().join("plugins");
        let plugin = Resolver::new(home.clone())
            .resolve(archive.to_str().unwrap(), None)
            .unwrap();
        plugin.install().unwrap();

        let ro = home.join("demo/ro");
        assert_eq!(fs::metadata(&ro).unwrap().permissions().mode() & 0o777, 0o555);

        remove_plugin(&home.join("demo")).unwrap();
        assert!(fs::symlink_metadata(home.join("demo")).is_err());
        assert!(scan(&home).unwrap().is_empty());
    }

    #[test]
    fn test_installed_path_errors() {
        let home = TempDir::new().unwrap();

        let err = installed_path(home.path(), "missing").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::PluginNotInstalled { .. })
        ));

        let err = installed_path(home.path(), "../escape").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::InvalidPluginName(_))
        ));
    }

    #[test]
    fn test_plugin_entry_json() {
        let entry = PluginEntry {
            name: "demo".to_string(),
            path: PathBuf::from("/plugins/demo"),
            kind: InstallKind::Archive,
            linked_to: None,
            has_metadata: true,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "archive");
        assert!(json.get("linked_to").is_none());
    }
}
