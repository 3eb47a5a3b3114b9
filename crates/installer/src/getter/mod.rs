//! Transport capability for fetching plugin archives.
//!
//! The HTTP installer never talks to the network directly; it receives a
//! [`Getter`] in its constructor. [`http::HttpGetter`] is the real
//! implementation, [`MockGetter`] serves canned responses in tests.
//!
//! ```
//! use installer::getter::{Getter, MockGetter};
//!
//! let mock = MockGetter::new();
//! mock.add_response("https://example.com/p-1.0.0.tgz", vec![1, 2, 3]);
//!
//! assert!(mock.exists("https://example.com/p-1.0.0.tgz").unwrap());
//! assert_eq!(mock.get("https://example.com/p-1.0.0.tgz").unwrap(), vec![1, 2, 3]);
//! ```

pub mod http;

use crate::error::TransportError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Fetches remote resources.
pub trait Getter: Send + Sync {
    /// Download the resource at `href`.
    fn get(&self, href: &str) -> Result<Vec<u8>, TransportError>;

    /// Check whether `href` exists without downloading it.
    ///
    /// Returns `Ok(false)` for a definite "not found"; other failures are errors.
    fn exists(&self, href: &str) -> Result<bool, TransportError>;
}

/// Mock getter for testing without network access.
///
/// Responses are keyed by URL. Every call is recorded so tests can assert
/// that nothing was fetched.
#[derive(Debug, Clone, Default)]
pub struct MockGetter {
    responses: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    failure: Arc<Mutex<Option<String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockGetter {
    /// Create a new empty mock getter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock getter that fails every request with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        let mock = Self::new();
        *mock.failure.lock().unwrap() = Some(message.into());
        mock
    }

    /// Serve `body` for `href`.
    pub fn add_response(&self, href: impl Into<String>, body: Vec<u8>) {
        self.responses.lock().unwrap().insert(href.into(), body);
    }

    /// Requests seen so far, as `"GET <href>"` or `"HEAD <href>"`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of GET requests seen so far.
    #[must_use]
    pub fn get_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.starts_with("GET "))
            .count()
    }

    fn record(&self, method: &str, href: &str) -> Result<(), TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("{method} {href}"));
        match self.failure.lock().unwrap().as_ref() {
            Some(message) => Err(TransportError::request(href, message.clone())),
            None => Ok(()),
        }
    }
}

impl Getter for MockGetter {
    fn get(&self, href: &str) -> Result<Vec<u8>, TransportError> {
        self.record("GET", href)?;
        self.responses
            .lock()
            .unwrap()
            .get(href)
            .cloned()
            .ok_or_else(|| TransportError::Status {
                href: href.to_string(),
                status: 404,
            })
    }

    fn exists(&self, href: &str) -> Result<bool, TransportError> {
        self.record("HEAD", href)?;
        Ok(self.responses.lock().unwrap().contains_key(href))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_getter_new() {
        let mock = MockGetter::new();
        assert!(!mock.exists("https://example.com/a.tgz").unwrap());
        assert!(mock.get("https://example.com/a.tgz").is_err());
        assert_eq!(mock.requests().len(), 2);
    }

    #[test]
    fn test_mock_getter_response() {
        let mock = MockGetter::new();
        mock.add_response("https://example.com/a.tgz", vec![0x1f, 0x8b]);

        assert_eq!(mock.get("https://example.com/a.tgz").unwrap(), vec![0x1f, 0x8b]);
        assert_eq!(mock.get_count(), 1);
    }

    #[test]
    fn test_mock_getter_not_found_status() {
        let mock = MockGetter::new();
        let err = mock.get("https://example.com/missing.tgz").unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_mock_getter_failing() {
        let mock = MockGetter::failing("failed to download plugin for some reason");
        mock.add_response("https://example.com/a.tgz", vec![1]);

        let err = mock.get("https://example.com/a.tgz").unwrap_err();
        assert!(err.to_string().contains("failed to download plugin"));
        assert!(mock.exists("https://example.com/a.tgz").is_err());
    }

    #[test]
    fn test_mock_getter_clones_share_state() {
        let mock = MockGetter::new();
        let clone = mock.clone();
        clone.add_response("https://example.com/a.tgz", vec![1]);

        assert!(mock.exists("https://example.com/a.tgz").unwrap());
        assert_eq!(clone.requests(), vec!["HEAD https://example.com/a.tgz".to_string()]);
    }
}
