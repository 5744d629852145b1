//! Thin wrapper around `git` subprocess calls.
//!
//! Only the handful of operations the cache needs are exposed. Every call is
//! tagged with the [`CacheStep`] it belongs to so failures name the step.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::error::{io_err, CacheError, CacheStep};

/// Executes `git` in a fixed working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Shallow, single-branch clone of `branch` from `url` into `dest`.
    ///
    /// Runs in `dest`'s parent, which must already exist.
    #[instrument(skip_all, fields(url, branch))]
    pub fn clone_shallow(url: &str, branch: &str, dest: &Path) -> Result<(), CacheError> {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        let dest_str = dest.to_string_lossy();
        let args = [
            "clone",
            "--branch",
            branch,
            "--depth",
            "1",
            "--single-branch",
            url,
            dest_str.as_ref(),
        ];
        debug!("cloning template repository");
        let output = Command::new("git")
            .args(args)
            .current_dir(parent)
            .output()
            .map_err(|e| io_err(parent, e))?;
        check(CacheStep::Clone, &args, output).map(|_| ())
    }

    /// Fetch `branch` from `remote` into `refs/remotes/<remote>/<branch>`.
    pub fn fetch(&self, remote: &str, branch: &str) -> Result<(), CacheError> {
        let refspec = format!("+refs/heads/{branch}:refs/remotes/{remote}/{branch}");
        self.run_checked(CacheStep::Fetch, &["fetch", remote, &refspec])?;
        Ok(())
    }

    /// Resolve a revision to a full commit id.
    pub fn rev_parse(&self, rev: &str) -> Result<String, CacheError> {
        let out = self.run_capture(CacheStep::RevParse, &["rev-parse", "--verify", rev])?;
        Ok(out.trim().to_string())
    }

    pub fn reset_hard(&self, rev: &str) -> Result<(), CacheError> {
        self.run_checked(CacheStep::Reset, &["reset", "--hard", rev])?;
        Ok(())
    }

    /// Remove untracked files and directories (ignored files are kept).
    pub fn clean_untracked(&self) -> Result<(), CacheError> {
        self.run_checked(CacheStep::Reset, &["clean", "-fd"])?;
        Ok(())
    }

    /// Checkout an existing branch or revision.
    #[instrument(skip_all, fields(rev))]
    pub fn checkout(&self, rev: &str) -> Result<(), CacheError> {
        debug!(rev, "checking out");
        self.run_checked(CacheStep::Checkout, &["checkout", rev])?;
        Ok(())
    }

    /// Create and checkout a new local branch at the current HEAD.
    #[instrument(skip_all, fields(branch))]
    pub fn checkout_new_branch(&self, branch: &str) -> Result<(), CacheError> {
        debug!(branch, "creating and checking out new branch");
        self.run_checked(CacheStep::CreateBranch, &["checkout", "-b", branch])?;
        Ok(())
    }

    /// Names of every local branch.
    pub fn local_branches(&self) -> Result<Vec<String>, CacheError> {
        let out = self.run_capture(
            CacheStep::RevParse,
            &["for-each-ref", "--format=%(refname:short)", "refs/heads"],
        )?;
        Ok(out.lines().map(str::to_string).collect())
    }

    /// Force-delete a local branch; must not be the checked-out one.
    pub fn delete_branch(&self, branch: &str) -> Result<(), CacheError> {
        self.run_checked(CacheStep::DeleteBranch, &["branch", "-D", branch])?;
        Ok(())
    }

    /// Stage everything under `pathspec`, including deletions.
    pub fn add(&self, pathspec: &str) -> Result<(), CacheError> {
        self.run_checked(CacheStep::Stage, &["add", "--all", "--", pathspec])?;
        Ok(())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> Result<bool, CacheError> {
        let out = self.run_capture(CacheStep::Stage, &["diff", "--cached", "--name-only"])?;
        Ok(!out.trim().is_empty())
    }

    /// Commit staged changes with a message.
    ///
    /// If there are no staged changes, this returns Ok(false) and does nothing.
    #[instrument(skip_all)]
    pub fn commit_staged(&self, message: &str) -> Result<bool, CacheError> {
        if !self.has_staged_changes()? {
            debug!("no staged changes, skipping commit");
            return Ok(false);
        }
        self.run_checked(CacheStep::Commit, &["commit", "-m", message])?;
        Ok(true)
    }

    /// Push `branch` to `remote` and record it as the upstream.
    pub fn push_set_upstream(&self, remote: &str, branch: &str) -> Result<(), CacheError> {
        self.run_checked(CacheStep::Push, &["push", "--set-upstream", remote, branch])?;
        Ok(())
    }

    /// Current branch name; `None` on a detached HEAD.
    pub fn current_branch(&self) -> Result<Option<String>, CacheError> {
        let out = self.run_capture(CacheStep::RevParse, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim();
        if name == "HEAD" {
            return Ok(None);
        }
        Ok(Some(name.to_string()))
    }

    /// Committer time of `HEAD`.
    pub fn head_commit_time(&self) -> Result<DateTime<Utc>, CacheError> {
        let out = self.run_capture(CacheStep::Log, &["log", "-1", "--format=%cI", "HEAD"])?;
        DateTime::parse_from_rfc3339(out.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| CacheError::Git {
                step: CacheStep::Log,
                detail: format!("unparseable commit time '{}': {e}", out.trim()),
            })
    }

    fn run_capture(&self, step: CacheStep, args: &[&str]) -> Result<String, CacheError> {
        let output = self.run_checked(step, args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, step: CacheStep, args: &[&str]) -> Result<Output, CacheError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| io_err(&self.workdir, e))?;
        check(step, args, output)
    }
}

fn check(step: CacheStep, args: &[&str], output: Output) -> Result<Output, CacheError> {
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(CacheError::Git {
        step,
        detail: format!("git {} failed: {}", args.join(" "), stderr.trim()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn failing_command_names_the_step() {
        let dir = TempDir::new().unwrap();
        let git = Git::new(dir.path());
        let err = git.rev_parse("HEAD").unwrap_err();
        assert_eq!(err.step(), Some(CacheStep::RevParse));
        assert!(err.to_string().contains("rev-parse"), "got: {err}");
    }

    #[test]
    fn missing_workdir_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let git = Git::new(dir.path().join("gone"));
        let err = git.fetch("origin", "main").unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }), "got: {err}");
    }
}
