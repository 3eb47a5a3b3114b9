//! Centralized path resolution for plugman
//!
//! # Environment Variables
//!
//! - `PLUGMAN_CONFIG_DIR` - Override config directory
//! - `PLUGMAN_PLUGINS_DIR` - Override plugins directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `PLUGMAN_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/plugman` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\plugman`
//!    - macOS/Linux: `~/.config/plugman`
//!
//! For plugins_dir():
//! 1. `PLUGMAN_PLUGINS_DIR` environment variable
//! 2. `plugins_dir` from `config.toml`
//! 3. `XDG_DATA_HOME/plugman/plugins` (if set)
//! 4. Platform data dir: `<data_dir>/plugman/plugins`

use crate::config::Config;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "PLUGMAN_CONFIG_DIR";

/// Environment variable for plugins directory override
pub const ENV_PLUGINS_DIR: &str = "PLUGMAN_PLUGINS_DIR";

/// Get the plugman config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("plugman");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join("plugman");
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("plugman");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the managed plugins directory
///
/// An explicit `--plugins-dir` is handled by the caller; this covers the
/// environment, the config file and the platform default.
pub fn plugins_dir(config: &Config) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_PLUGINS_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using plugins dir from {}: {}",
            ENV_PLUGINS_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Some(dir) = &config.plugins_dir {
        let path = expand(dir);
        log::debug!("Using plugins dir from config: {}", path.display());
        return Ok(path);
    }

    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        let path = PathBuf::from(xdg_data).join("plugman").join("plugins");
        log::debug!("Using XDG_DATA_HOME: {}", path.display());
        return Ok(path);
    }

    let data = dirs::data_dir().context("Could not determine data directory")?;
    let path = data.join("plugman").join("plugins");
    log::debug!("Using default plugins dir: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, PoisonError};

    /// Serializes tests that touch process environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause issues
    /// if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    /// Helper to run a test with env var removed
    fn without_env_var<F, R>(key: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::remove_var(key) };
        let result = f();
        if let Some(v) = original {
            // SAFETY: Tests run in isolation
            unsafe { env::set_var(key, v) };
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        let _guard = env_lock();
        with_env_var(ENV_CONFIG_DIR, "/custom/plugman/config", || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/plugman/config"));
        });
    }

    #[test]
    fn test_plugins_dir_env_override() {
        let _guard = env_lock();
        with_env_var(ENV_PLUGINS_DIR, "/custom/plugins", || {
            let config = Config {
                plugins_dir: Some("/from/config".to_string()),
                ..Config::default()
            };
            assert_eq!(plugins_dir(&config).unwrap(), PathBuf::from("/custom/plugins"));
        });
    }

    #[test]
    fn test_plugins_dir_from_config_with_tilde() {
        let _guard = env_lock();
        without_env_var(ENV_PLUGINS_DIR, || {
            let config = Config {
                plugins_dir: Some("~/plugman-config-test".to_string()),
                ..Config::default()
            };
            let home = dirs::home_dir().unwrap();
            assert_eq!(plugins_dir(&config).unwrap(), home.join("plugman-config-test"));
        });
    }

    #[test]
    fn test_plugins_dir_xdg_data_home() {
        let _guard = env_lock();
        without_env_var(ENV_PLUGINS_DIR, || {
            with_env_var("XDG_DATA_HOME", "/tmp/xdg-data-test", || {
                assert_eq!(
                    plugins_dir(&Config::default()).unwrap(),
                    PathBuf::from("/tmp/xdg-data-test/plugman/plugins")
                );
            });
        });
    }

    #[test]
    fn test_expand_with_env_var() {
        let _guard = env_lock();
        with_env_var("PLUGMAN_TEST_VAR", "test_value", || {
            assert_eq!(
                expand("/path/$PLUGMAN_TEST_VAR/file"),
                PathBuf::from("/path/test_value/file")
            );
        });
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }
}
