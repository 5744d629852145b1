//! Error types for leysync-sync.

use std::path::PathBuf;

use thiserror::Error;

/// Filesystem failure while copying, hashing or removing a managed path.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// A single rule (or the ignore-file step) that failed during a pass.
///
/// Collected in the report; never aborts the remaining rules.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to copy {rule}: {source}")]
    Copy {
        rule: &'static str,
        #[source]
        source: SyncError,
    },

    #[error("failed to remove {rule}: {source}")]
    Remove {
        rule: &'static str,
        #[source]
        source: SyncError,
    },

    #[error("failed to update ignore file: {0}")]
    IgnoreFile(#[source] SyncError),
}
