//! Blocking HTTP getter built on `ureq`.
//!
//! Timeouts and the body size limit live here, not in the installer: the
//! installer layer does not retry or time out on its own.

use crate::error::TransportError;
use crate::getter::Getter;
use std::time::Duration;

/// Default maximum download size (200 MB).
pub const DEFAULT_MAX_BODY_SIZE: u64 = 200 * 1024 * 1024;

/// Default overall request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("plugman-installer/", env!("CARGO_PKG_VERSION"));

/// HTTP(S) getter.
///
/// # Example
///
/// ```no_run
/// use installer::getter::Getter;
/// use installer::getter::http::HttpGetter;
/// use std::time::Duration;
///
/// let getter = HttpGetter::new().timeout(Duration::from_secs(30));
/// let bytes = getter.get("https://example.com/plugins/fake-plugin-0.0.1.tar.gz").unwrap();
/// println!("Downloaded {} bytes", bytes.len());
/// ```
#[derive(Debug, Clone)]
pub struct HttpGetter {
    timeout: Duration,
    max_body_size: u64,
    user_agent: String,
}

impl HttpGetter {
    /// Create a getter with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set the overall request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum accepted response size in bytes.
    pub fn max_body_size(mut self, bytes: u64) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Set the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn agent(&self) -> ureq::Agent {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build();
        ureq::Agent::new_with_config(config)
    }
}

impl Default for HttpGetter {
    fn default() -> Self {
        Self::new()
    }
}

impl Getter for HttpGetter {
    fn get(&self, href: &str) -> Result<Vec<u8>, TransportError> {
        log::debug!("GET {href}");

        let mut response = self
            .agent()
            .get(href)
            .header("Accept", "application/octet-stream")
            .header("User-Agent", self.user_agent.as_str())
            .call()
            .map_err(|e| transport_error(href, e))?;

        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.max_body_size)
            .read_to_vec()
            .map_err(|e| TransportError::Body {
                href: href.to_string(),
                message: e.to_string(),
            })?;

        log::debug!("Downloaded {} bytes from {href}", bytes.len());
        Ok(bytes)
    }

    fn exists(&self, href: &str) -> Result<bool, TransportError> {
        log::debug!("HEAD {href}");

        match self
            .agent()
            .head(href)
            .header("User-Agent", self.user_agent.as_str())
            .call()
        {
            Ok(_) => Ok(true),
            Err(ureq::Error::StatusCode(404 | 410)) => Ok(false),
            Err(e) => Err(transport_error(href, e)),
        }
    }
}

fn transport_error(href: &str, err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::StatusCode(status) => TransportError::Status {
            href: href.to_string(),
            status,
        },
        other => TransportError::request(href, other.to_string()),
    }
}
