use std::path::PathBuf;

use thiserror::Error;

use leysync_contrib::ContributionError;
use leysync_repo::CacheError;

/// Error surface for the daemon runtime, scheduler and socket protocol.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("registry error: {0}")]
    Registry(#[from] leysync_core::RegistryError),

    #[error("settings error: {0}")]
    Settings(#[from] leysync_core::SettingsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("daemon protocol error: {0}")]
    Protocol(String),

    #[error("sync cycle failed: {0}")]
    CycleFailed(String),

    #[error("workspace not registered: {path}")]
    UnknownWorkspace { path: PathBuf },

    #[error("daemon is not running (socket missing: {socket})")]
    DaemonNotRunning { socket: PathBuf },
}

/// Why one sync cycle did not finish.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Contribution(#[from] ContributionError),

    /// The blocking task running the cycle panicked or was cancelled.
    #[error("cycle task failed: {0}")]
    Join(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
