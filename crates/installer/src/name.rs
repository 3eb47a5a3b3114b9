//! Plugin name and version helpers.
//!
//! Archive file names look like `<name>-<version>.tar.gz`; the canonical
//! plugin name (and therefore its directory under the plugins root) is the
//! `<name>` part.

use regex::Regex;
use std::sync::LazyLock;

/// Archive suffixes recognized for plugin archives, longest first.
pub const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tgz"];

static VERSION_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+?)-(?P<version>\d+\.\d+\.\d+.*)$").expect("valid version regex")
});

/// Get the recognized archive suffix of a file name, if any.
#[must_use]
pub fn archive_suffix(name: &str) -> Option<&'static str> {
    ARCHIVE_SUFFIXES
        .iter()
        .copied()
        .find(|suffix| name.ends_with(suffix))
}

/// Derive the canonical plugin name from an archive file name.
///
/// Strips a recognized archive suffix, then a trailing `-<major>.<minor>.<patch>...`
/// version segment, repeating until neither matches. Applying it to an already
/// stripped name is a no-op.
///
/// ```
/// use installer::name::strip_plugin_name;
///
/// assert_eq!(strip_plugin_name("fake-plugin-0.0.1.tar.gz"), "fake-plugin");
/// assert_eq!(strip_plugin_name("fake-plugin.tgz"), "fake-plugin");
/// assert_eq!(strip_plugin_name("fake-plugin"), "fake-plugin");
/// ```
#[must_use]
pub fn strip_plugin_name(filename: &str) -> String {
    let mut name = filename;
    loop {
        let stem = strip_archive_suffix(name);
        let stripped = VERSION_SUFFIX_RE
            .captures(stem)
            .and_then(|caps| caps.name("name"))
            .map_or(stem, |m| m.as_str());
        if stripped == name {
            return name.to_string();
        }
        name = stripped;
    }
}

/// Get the version embedded in an archive file name.
///
/// `fake-plugin-0.0.1.tgz` yields `0.0.1`; `fake-plugin.tgz` yields `None`.
#[must_use]
pub fn archive_version(filename: &str) -> Option<&str> {
    let stem = strip_archive_suffix(filename);
    VERSION_SUFFIX_RE
        .captures(stem)
        .and_then(|caps| caps.name("version"))
        .map(|m| m.as_str())
}

/// Rebuild an archive file name for another version.
///
/// Returns `None` when `filename` has no recognized archive suffix.
#[must_use]
pub fn with_version(filename: &str, version: &str) -> Option<String> {
    let suffix = archive_suffix(filename)?;
    Some(format!("{}-{version}{suffix}", strip_plugin_name(filename)))
}

/// Check that a plugin name is usable as a single directory name.
///
/// Names starting with `.` are reserved for staging directories.
#[must_use]
pub fn is_valid_plugin_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}

fn strip_archive_suffix(filename: &str) -> &str {
    match archive_suffix(filename) {
        Some(suffix) => &filename[..filename.len() - suffix.len()],
        None => filename,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_name() {
        assert_eq!(strip_plugin_name("fake-plugin-0.0.1.tar.gz"), "fake-plugin");
        assert_eq!(strip_plugin_name("fake-plugin-0.0.1.tgz"), "fake-plugin");
        assert_eq!(strip_plugin_name("fake-plugin.tgz"), "fake-plugin");
        assert_eq!(strip_plugin_name("fake-plugin.tar.gz"), "fake-plugin");
    }

    #[test]
    fn test_strip_name_idempotent() {
        for name in ["x-1.2.3.tar.gz", "x-1.2.3.tgz", "x.tgz", "x.tar.gz"] {
            let once = strip_plugin_name(name);
            assert_eq!(once, "x");
            assert_eq!(strip_plugin_name(&once), once);
        }

        for (name, stripped) in [
            ("a.tgz.tgz", "a"),
            ("p.tgz-1.0.0.tgz", "p"),
            ("q-1.0.0.tgz-2.0.0.tar.gz", "q"),
        ] {
            let once = strip_plugin_name(name);
            assert_eq!(once, stripped, "{name}");
            assert_eq!(strip_plugin_name(&once), once, "{name}");
        }
    }

    #[test]
    fn test_strip_name_prerelease() {
        assert_eq!(strip_plugin_name("helm-diff-3.9.0-rc.1.tgz"), "helm-diff");
    }

    #[test]
    fn test_strip_name_keeps_non_version_suffix() {
        assert_eq!(strip_plugin_name("plugin-v2.tgz"), "plugin-v2");
        assert_eq!(strip_plugin_name("plugin-1.2.tgz"), "plugin-1.2");
    }

    #[test]
    fn test_archive_suffix() {
        assert_eq!(archive_suffix("a.tar.gz"), Some(".tar.gz"));
        assert_eq!(archive_suffix("a.tgz"), Some(".tgz"));
        assert_eq!(archive_suffix("a.zip"), None);
    }

    #[test]
    fn test_archive_version() {
        assert_eq!(archive_version("fake-plugin-0.0.1.tar.gz"), Some("0.0.1"));
        assert_eq!(archive_version("fake-plugin-1.10.0-beta.2.tgz"), Some("1.10.0-beta.2"));
        assert_eq!(archive_version("fake-plugin.tgz"), None);
    }

    #[test]
    fn test_with_version() {
        assert_eq!(
            with_version("fake-plugin-0.0.1.tar.gz", "0.0.2").as_deref(),
            Some("fake-plugin-0.0.2.tar.gz")
        );
        assert_eq!(
            with_version("fake-plugin.tgz", "1.0.0").as_deref(),
            Some("fake-plugin-1.0.0.tgz")
        );
        assert_eq!(with_version("fake-plugin", "1.0.0"), None);
    }

    #[test]
    fn test_is_valid_plugin_name() {
        assert!(is_valid_plugin_name("fake-plugin"));
        assert!(!is_valid_plugin_name(""));
        assert!(!is_valid_plugin_name("."));
        assert!(!is_valid_plugin_name(".."));
        assert!(!is_valid_plugin_name(".hidden"));
        assert!(!is_valid_plugin_name(".demo-abc123"));
        assert!(is_valid_plugin_name("demo.d"));
        assert!(!is_valid_plugin_name("a/b"));
        assert!(!is_valid_plugin_name("a\\b"));
    }
}
