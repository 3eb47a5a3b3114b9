//! Error types for plugin installation.
//!
//! Every failure in this crate is returned as an [`Error`]; nothing panics or
//! exits. Errors are grouped into [`ErrorCategory`] values so the CLI can pick
//! a message and decide whether a retry makes sense.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for installer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of installer errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The user supplied a source or archive we cannot handle.
    UserInput,
    /// The on-disk state conflicts with the request.
    Conflict,
    /// The transport failed to fetch something (transient, retryable).
    Transport,
    /// A requested version does not exist.
    NotFound,
    /// The archive is corrupt or unsafe.
    Integrity,
    /// The operation is not supported for this kind of plugin.
    Unsupported,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::UserInput => "Unsupported input",
            Self::Conflict => "Conflicting plugin state",
            Self::Transport => "Download failed",
            Self::NotFound => "Version not found",
            Self::Integrity => "Invalid or unsafe archive",
            Self::Unsupported => "Operation not supported",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::UserInput => {
                "Use a local directory, a .tar.gz/.tgz URL, or a git repository reference"
            }
            Self::Conflict => "Uninstall the plugin first, or check the plugin directory",
            Self::Transport => "Check your internet connection and try again",
            Self::NotFound => "Verify the version exists for this plugin",
            Self::Integrity => "The archive may be corrupted or malicious; do not install it",
            Self::Unsupported => "Uninstall the plugin and install it again",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Failure reported by a [`Getter`](crate::getter::Getter) implementation.
///
/// The installer never rewrites these; they reach the caller unchanged inside
/// [`Error::Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("{href} returned HTTP {status}")]
    Status {
        /// Requested URL.
        href: String,
        /// HTTP status code.
        status: u16,
    },

    /// The request could not be completed.
    #[error("request to {href} failed: {message}")]
    Request {
        /// Requested URL.
        href: String,
        /// Error message.
        message: String,
    },

    /// The response body could not be read (or exceeded the size limit).
    #[error("failed to read response from {href}: {message}")]
    Body {
        /// Requested URL.
        href: String,
        /// Error message.
        message: String,
    },
}

impl TransportError {
    /// Create a request error.
    pub fn request(href: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            href: href.into(),
            message: message.into(),
        }
    }

    /// HTTP status code if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors that can occur while resolving, installing or updating a plugin.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The plugin directory already exists.
    #[error("plugin already exists")]
    PluginAlreadyExists {
        /// Canonical plugin name.
        name: String,
        /// Existing plugin directory.
        path: PathBuf,
    },

    /// The plugin is not installed.
    #[error("plugin {name} is not installed")]
    PluginNotInstalled {
        /// Canonical plugin name.
        name: String,
    },

    /// No artifact exists for the requested version.
    #[error("version {version} not found for plugin {plugin}")]
    VersionNotFound {
        /// Canonical plugin name.
        plugin: String,
        /// Requested version constraint.
        version: String,
    },

    /// Update is not implemented for this kind of plugin.
    #[error("update is not supported for plugin {name} ({kind}); uninstall and install it again")]
    UpdateNotSupported {
        /// Canonical plugin name.
        name: String,
        /// Source kind of the installed plugin.
        kind: String,
    },

    /// The source is neither a local path, an archive URL, nor a VCS reference.
    #[error("unsupported plugin source: {0}")]
    UnsupportedSourceKind(String),

    /// No extractor handles this file name.
    #[error("unsupported archive format: {0}")]
    UnsupportedArchiveFormat(String),

    /// The compressed stream or tar structure is invalid.
    #[error("corrupt archive: {0}")]
    CorruptArchive(#[source] io::Error),

    /// An archive member resolves outside the destination directory.
    #[error("archive entry escapes the destination directory: {}", entry.display())]
    PathTraversal {
        /// Member name as recorded in the archive.
        entry: PathBuf,
    },

    /// An archive member has a type we refuse to materialize.
    #[error("unsupported archive entry {} ({kind})", entry.display())]
    UnsupportedEntry {
        /// Member name as recorded in the archive.
        entry: PathBuf,
        /// Tar entry type.
        kind: String,
    },

    /// The derived plugin name is not a single path component.
    #[error("invalid plugin name derived from source: {0:?}")]
    InvalidPluginName(String),

    /// The installed plugin directory cannot be traced back to a source.
    #[error("cannot determine the source of the plugin at {}", path.display())]
    SourceUnknown {
        /// Installed plugin directory.
        path: PathBuf,
    },

    /// A VCS checkout has uncommitted changes.
    #[error("plugin repository at {} has local changes", path.display())]
    LocalChanges {
        /// Checkout directory.
        path: PathBuf,
    },

    /// The transport failed; the error is the transport's own.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A version-control command failed.
    #[error("{command} failed: {message}")]
    Vcs {
        /// Command line that failed.
        command: String,
        /// Error output.
        message: String,
    },

    /// IO error during file operations.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UnsupportedSourceKind(_)
            | Error::UnsupportedArchiveFormat(_)
            | Error::InvalidPluginName(_) => ErrorCategory::UserInput,
            Error::PluginAlreadyExists { .. }
            | Error::PluginNotInstalled { .. }
            | Error::LocalChanges { .. } => ErrorCategory::Conflict,
            Error::Transport(_) => ErrorCategory::Transport,
            Error::VersionNotFound { .. } => ErrorCategory::NotFound,
            Error::CorruptArchive(_)
            | Error::PathTraversal { .. }
            | Error::UnsupportedEntry { .. } => ErrorCategory::Integrity,
            Error::UpdateNotSupported { .. } | Error::SourceUnknown { .. } => {
                ErrorCategory::Unsupported
            }
            Error::Vcs { .. } | Error::Io { .. } => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}
