use crate::paths;
use anyhow::{Context, Result};
use installer::getter::http::{DEFAULT_MAX_BODY_SIZE, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpGetter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Config file name inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

const MB: u64 = 1024 * 1024;

// ============================================================================
// Config
// ============================================================================

/// Contents of `config.toml`. Every field is optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Plugins directory override
    pub plugins_dir: Option<String>,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    pub timeout_secs: Option<u64>,
    pub max_download_mb: Option<u64>,
    pub user_agent: Option<String>,
}

impl Config {
    /// Load `config.toml` from the config directory, or defaults if absent
    pub fn load() -> Result<Self> {
        let path = paths::config_dir()?.join(CONFIG_FILE);
        Self::load_from(&path)
    }

    /// Load a config file, or defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid {}", path.display()))
    }

    /// Build the HTTP getter from the `[http]` table
    pub fn http_getter(&self) -> HttpGetter {
        let http = &self.http;
        HttpGetter::new()
            .timeout(http.timeout_secs.map_or(DEFAULT_TIMEOUT, Duration::from_secs))
            .max_body_size(
                http.max_download_mb
                    .map_or(DEFAULT_MAX_BODY_SIZE, |mb| mb.saturating_mul(MB)),
            )
            .user_agent(http.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert!(config.plugins_dir.is_none());
        assert!(config.http.timeout_secs.is_none());
    }

    #[test]
    fn test_load_full_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
plugins_dir = "~/plugins"

[http]
timeout_secs = 60
max_download_mb = 50
user_agent = "plugman-test"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.plugins_dir.as_deref(), Some("~/plugins"));
        assert_eq!(config.http.timeout_secs, Some(60));
        assert_eq!(config.http.max_download_mb, Some(50));
        assert_eq!(config.http.user_agent.as_deref(), Some("plugman-test"));
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "plugin_dir = \"typo\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid"));
    }

    #[test]
    fn test_http_getter_defaults() {
        let getter = Config::default().http_getter();
        let debug = format!("{getter:?}");
        assert!(debug.contains(DEFAULT_USER_AGENT));
    }
}
