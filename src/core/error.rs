//! Error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for pruning operations.
pub type Result<T> = std::result::Result<T, PruneError>;

/// Errors returned by the pruning engine and its collaborators.
#[derive(Debug, Error)]
pub enum PruneError {
    /// The target forwarding list does not exist.
    #[error("config file not found: {}", path.display())]
    ConfigNotFound {
        /// The path that was checked.
        path: PathBuf,
    },

    /// A matched line lacks the `server=/<domain>/<ip>` structure, so no
    /// domain token can be extracted from it.
    #[error("malformed line {line_number}: {line:?}")]
    MalformedLine {
        /// 1-based line number in the original file.
        line_number: usize,
        /// The offending line, without its terminator.
        line: String,
    },

    /// Reading, writing, flushing or syncing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stage or commit operation failed.
    #[error("git {operation} failed: {detail}")]
    VersionControl {
        /// `add` or `commit`.
        operation: &'static str,
        /// Exit status and captured stderr, or the libgit2 message.
        detail: String,
    },

    /// Another git process kept the index lock past the configured timeout.
    #[error("timed out waiting for {} to be released", path.display())]
    LockTimeout {
        /// The lock file that never went away.
        path: PathBuf,
    },

    /// Command-line settings failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl PruneError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the run never got as far as touching the file.
    #[must_use]
    pub fn is_config_not_found(&self) -> bool {
        matches!(self, Self::ConfigNotFound { .. })
    }
}

impl From<git2::Error> for PruneError {
    fn from(e: git2::Error) -> Self {
        Self::VersionControl {
            operation: "libgit2",
            detail: e.message().to_string(),
        }
    }
}
