//! Error types for leysync-contrib.

use std::path::PathBuf;

use thiserror::Error;

use leysync_repo::CacheError;
use leysync_sync::SyncError;

/// Merge-proposal HTTP failure.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response.
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, TLS or timeout failure before a response arrived.
    #[error("API request failed: {0}")]
    Transport(String),

    /// 2xx response without a usable `html_url`.
    #[error("unexpected API response: {0}")]
    Decode(String),
}

/// Any failed step of a contribution cycle.
#[derive(Debug, Error)]
pub enum ContributionError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("copy failed: {0}")]
    Copy(#[from] SyncError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unreadable pending-proposal record {path}: {source}")]
    PendingRecord {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("nothing was staged under {0}")]
    NothingStaged(&'static str),

    #[error("failed to create pull request: {0}")]
    Api(#[from] ApiError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ContributionError {
    ContributionError::Io {
        path: path.into(),
        source,
    }
}
