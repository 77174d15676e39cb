//! Error types for the `dirmap` library.
//!
//! Only an invalid scan root is fatal to a scan. Unreadable entries below the
//! root are skipped by the scanner and never surface here, and cancellation is
//! a normal outcome ([`crate::scan::ScanOutcome::Cancelled`]), not an error.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal scan failures, raised before any traversal begins.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("path is excluded from scanning: {0}")]
    RootExcluded(PathBuf),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures of the scan session (orchestration layer).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a scan is already running; cancel it or wait for it to finish")]
    ScanInProgress,

    #[error("no results available")]
    NoResult,

    #[error("invalid exclude pattern: {0}")]
    InvalidPattern(String),

    #[error("failed to start scan worker: {0}")]
    Spawn(#[from] io::Error),
}
