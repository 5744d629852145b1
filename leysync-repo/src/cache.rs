//! Local mirror of the template repository.
//!
//! The cache is disposable: [`RepositoryCache::refresh`] and
//! [`RepositoryCache::checkout_tracked_and_sync`] always reconcile to the
//! remote tip with a hard reset. The only time it holds unpushed work is
//! during a contribution cycle, between `create_branch` and `push`.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use leysync_core::RepoConfig;

use crate::error::{io_err, CacheError};
use crate::git::Git;

pub const REMOTE: &str = "origin";

/// Result of [`RepositoryCache::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Local tip was reset to a new remote tip.
    Updated,
    /// Local and remote tips already matched.
    Unchanged,
}

/// Result of [`RepositoryCache::ensure_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    Cloned,
    Refreshed(RefreshOutcome),
}

impl ReadyOutcome {
    /// True when the cache content may differ from before the call.
    pub fn changed(self) -> bool {
        !matches!(self, ReadyOutcome::Refreshed(RefreshOutcome::Unchanged))
    }
}

/// One local mirror of one remote branch.
#[derive(Debug, Clone)]
pub struct RepositoryCache {
    config: RepoConfig,
    git: Git,
}

impl RepositoryCache {
    pub fn new(config: RepoConfig) -> Self {
        let git = Git::new(&config.cache_path);
        Self { config, git }
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config.cache_path
    }

    pub fn tracked_branch(&self) -> &str {
        &self.config.branch
    }

    fn remote_ref(&self) -> String {
        format!("refs/remotes/{REMOTE}/{}", self.config.branch)
    }

    /// True iff `<cache>/.git` exists.
    pub fn is_present(&self) -> bool {
        self.config.cache_path.join(".git").exists()
    }

    fn require_present(&self) -> Result<(), CacheError> {
        if self.is_present() {
            return Ok(());
        }
        Err(CacheError::NotPresent {
            path: self.config.cache_path.clone(),
        })
    }

    /// Shallow clone of the tracked branch into the cache path.
    #[instrument(skip_all, fields(cache = %self.config.cache_path.display()))]
    pub fn clone_remote(&self) -> Result<(), CacheError> {
        if self.is_present() {
            return Err(CacheError::AlreadyPresent {
                path: self.config.cache_path.clone(),
            });
        }
        if let Some(parent) = self.config.cache_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        Git::clone_shallow(&self.config.url, &self.config.branch, &self.config.cache_path)?;
        info!(url = %self.config.url, branch = %self.config.branch, "template repository cloned");
        Ok(())
    }

    /// Fetch and compare tips; returns `(local, remote)` commit ids.
    fn fetch_tips(&self) -> Result<(String, String), CacheError> {
        self.git.fetch(REMOTE, &self.config.branch)?;
        let local = self.git.rev_parse("HEAD")?;
        let remote = self.git.rev_parse(&self.remote_ref())?;
        Ok((local, remote))
    }

    /// Fetch and, if the remote tip moved, hard-reset to it.
    ///
    /// Discards any edits made directly inside the cache.
    #[instrument(skip_all, fields(cache = %self.config.cache_path.display()))]
    pub fn refresh(&self) -> Result<RefreshOutcome, CacheError> {
        self.require_present()?;
        let (local, remote) = self.fetch_tips()?;
        if local == remote {
            return Ok(RefreshOutcome::Unchanged);
        }
        self.git.reset_hard(&self.remote_ref())?;
        info!(from = %short(&local), to = %short(&remote), "template repository updated");
        Ok(RefreshOutcome::Updated)
    }

    /// Fetch and compare tips without touching the working tree.
    ///
    /// An absent cache always needs work, so it reports `true`.
    pub fn has_remote_changes(&self) -> Result<bool, CacheError> {
        if !self.is_present() {
            return Ok(true);
        }
        let (local, remote) = self.fetch_tips()?;
        Ok(local != remote)
    }

    /// Clone if absent, otherwise refresh.
    pub fn ensure_ready(&self) -> Result<ReadyOutcome, CacheError> {
        if self.is_present() {
            self.refresh().map(ReadyOutcome::Refreshed)
        } else {
            self.clone_remote().map(|()| ReadyOutcome::Cloned)
        }
    }

    /// Checkout the tracked branch, then create and switch to `name`.
    pub fn create_branch(&self, name: &str) -> Result<(), CacheError> {
        self.require_present()?;
        self.git.checkout(&self.config.branch)?;
        self.git.checkout_new_branch(name)
    }

    /// Stage `pathspec` and commit. `Ok(false)` when nothing was staged.
    pub fn stage_and_commit(&self, pathspec: &str, message: &str) -> Result<bool, CacheError> {
        self.require_present()?;
        self.git.add(pathspec)?;
        self.git.commit_staged(message)
    }

    /// Push `branch` upstream.
    pub fn push(&self, branch: &str) -> Result<(), CacheError> {
        self.require_present()?;
        self.git.push_set_upstream(REMOTE, branch)
    }

    /// Return to mirror state: checkout tracked branch, delete every other
    /// local branch, fetch, hard-reset.
    #[instrument(skip_all, fields(cache = %self.config.cache_path.display()))]
    pub fn checkout_tracked_and_sync(&self) -> Result<(), CacheError> {
        self.require_present()?;
        // Drop copied-in files first so they cannot block the checkout or
        // linger as untracked content that later hides a real change.
        self.git.reset_hard("HEAD")?;
        self.git.clean_untracked()?;
        self.git.checkout(&self.config.branch)?;
        self.prune_local_branches()?;
        self.git.fetch(REMOTE, &self.config.branch)?;
        self.git.reset_hard(&self.remote_ref())?;
        Ok(())
    }

    /// Pushed branches live upstream; the mirror only keeps the tracked one.
    fn prune_local_branches(&self) -> Result<(), CacheError> {
        for branch in self.git.local_branches()? {
            if branch != self.config.branch {
                debug!(%branch, "deleting local branch");
                self.git.delete_branch(&branch)?;
            }
        }
        Ok(())
    }

    /// Local branches of the mirror; empty when absent.
    pub fn local_branches(&self) -> Result<Vec<String>, CacheError> {
        if !self.is_present() {
            return Ok(Vec::new());
        }
        self.git.local_branches()
    }

    /// Current branch of the mirror; `None` when absent or detached.
    pub fn current_branch(&self) -> Option<String> {
        if !self.is_present() {
            return None;
        }
        match self.git.current_branch() {
            Ok(branch) => branch,
            Err(err) => {
                warn!(error = %err, "could not read cache branch");
                None
            }
        }
    }

    /// Commit time of the mirrored tip; `None` when absent or unreadable.
    pub fn last_commit_time(&self) -> Option<DateTime<Utc>> {
        if !self.is_present() {
            return None;
        }
        self.git.head_commit_time().ok()
    }
}

fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn cache_at(path: PathBuf) -> RepositoryCache {
        RepositoryCache::new(RepoConfig {
            url: "file:///nonexistent".to_string(),
            branch: "main".to_string(),
            cache_path: path,
        })
    }

    #[test]
    fn absent_cache_is_not_present_and_needs_work() {
        let dir = TempDir::new().unwrap();
        let cache = cache_at(dir.path().join("cache"));
        assert!(!cache.is_present());
        assert!(cache.has_remote_changes().unwrap());
        assert!(cache.last_commit_time().is_none());
        assert!(cache.current_branch().is_none());
    }

    #[test]
    fn refresh_on_absent_cache_is_not_present() {
        let dir = TempDir::new().unwrap();
        let cache = cache_at(dir.path().join("cache"));
        assert!(matches!(cache.refresh(), Err(CacheError::NotPresent { .. })));
        assert!(matches!(
            cache.checkout_tracked_and_sync(),
            Err(CacheError::NotPresent { .. })
        ));
    }

    #[test]
    fn clone_refuses_existing_cache() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cache/.git")).unwrap();
        let cache = cache_at(dir.path().join("cache"));
        assert!(cache.is_present());
        assert!(matches!(
            cache.clone_remote(),
            Err(CacheError::AlreadyPresent { .. })
        ));
    }

    #[test]
    fn ready_outcome_changed() {
        assert!(ReadyOutcome::Cloned.changed());
        assert!(ReadyOutcome::Refreshed(RefreshOutcome::Updated).changed());
        assert!(!ReadyOutcome::Refreshed(RefreshOutcome::Unchanged).changed());
    }

    #[test]
    fn short_id_handles_short_input() {
        assert_eq!(short("abc"), "abc");
        assert_eq!(short("0123456789abcdef"), "01234567");
    }
}
