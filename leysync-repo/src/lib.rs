//! # leysync-repo
//!
//! The local template-repository mirror. [`RepositoryCache`] owns one cache
//! directory and drives `git` through [`git::Git`].

mod cache;
mod error;
pub mod git;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cache::{ReadyOutcome, RefreshOutcome, RepositoryCache, REMOTE};
pub use error::{CacheError, CacheStep};
