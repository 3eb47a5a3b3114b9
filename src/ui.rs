use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Error Reporting
// ============================================================================

/// Advice line for an error, if an installer error is anywhere in its chain
pub fn advice_for(err: &anyhow::Error) -> Option<String> {
    let install_err = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<installer::Error>())?;
    let category = install_err.category();
    let mut advice = format!("{}: {}", category.description(), category.advice());
    if install_err.is_retryable() {
        advice.push_str(" (retrying may help)");
    }
    Some(advice)
}

/// Print an error with its cause chain and category advice
pub fn report(err: &anyhow::Error) {
    error(&format!("{err:#}"));
    if let Some(advice) = advice_for(err) {
        dim(&advice);
    }
}

/// Truncate a path string for display, keeping the end
pub fn truncate_path(path: &str, max_len: usize) -> String {
    let len = path.chars().count();
    if len <= max_len {
        path.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let tail: String = path.chars().skip(len - (max_len - 3)).collect();
        format!("...{tail}")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_advice_for_installer_error() {
        let err = anyhow::Error::new(installer::Error::PluginNotInstalled {
            name: "diff".to_string(),
        })
        .context("Failed to update diff");

        let advice = advice_for(&err).unwrap();
        let category = installer::ErrorCategory::Conflict;
        assert!(advice.starts_with(category.description()));
        assert!(!advice.contains("retrying"));
    }

    #[test]
    fn test_advice_for_retryable_error() {
        let err: anyhow::Result<()> = Err(installer::Error::from(
            installer::TransportError::request("https://example.com/p.tgz", "timed out"),
        ))
        .context("Failed to install");

        let advice = advice_for(&err.unwrap_err()).unwrap();
        assert!(advice.ends_with("(retrying may help)"));
    }

    #[test]
    fn test_advice_for_other_error() {
        let err = anyhow::anyhow!("plain failure");
        assert!(advice_for(&err).is_none());
    }

    #[test]
    fn test_truncate_path_short() {
        assert_eq!(truncate_path("short.txt", 20), "short.txt");
        assert_eq!(truncate_path("exact", 5), "exact");
    }

    #[test]
    fn test_truncate_path_long() {
        assert_eq!(
            truncate_path("/very/long/path/to/file.txt", 15),
            ".../to/file.txt"
        );
    }

    #[test]
    fn test_truncate_path_edge_cases() {
        assert_eq!(truncate_path("test", 3), "...");
        assert_eq!(truncate_path("", 10), "");
    }
}
