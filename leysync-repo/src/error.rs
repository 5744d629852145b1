//! Error types for leysync-repo.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The repository operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStep {
    Clone,
    Fetch,
    RevParse,
    Reset,
    Checkout,
    CreateBranch,
    DeleteBranch,
    Stage,
    Commit,
    Push,
    Log,
}

impl fmt::Display for CacheStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheStep::Clone => "clone",
            CacheStep::Fetch => "fetch",
            CacheStep::RevParse => "rev-parse",
            CacheStep::Reset => "reset",
            CacheStep::Checkout => "checkout",
            CacheStep::CreateBranch => "create branch",
            CacheStep::DeleteBranch => "delete branch",
            CacheStep::Stage => "stage",
            CacheStep::Commit => "commit",
            CacheStep::Push => "push",
            CacheStep::Log => "log",
        };
        f.write_str(name)
    }
}

/// All errors that can arise from repository cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A `git` invocation exited non-zero.
    #[error("repository {step} failed: {detail}")]
    Git { step: CacheStep, detail: String },

    /// `git` could not be spawned, or a filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An operation that needs the mirror ran before it was cloned.
    #[error("repository cache not present at {path}")]
    NotPresent { path: PathBuf },

    /// `clone` was called on a cache that already exists.
    #[error("repository cache already present at {path}")]
    AlreadyPresent { path: PathBuf },
}

impl CacheError {
    /// The failed step, when the failure came from `git` itself.
    pub fn step(&self) -> Option<CacheStep> {
        match self {
            CacheError::Git { step, .. } => Some(*step),
            _ => None,
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.into(),
        source,
    }
}
