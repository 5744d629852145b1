//! Test-only helpers: a throwaway upstream repository backed by a bare repo
//! in a temp directory and reachable through a `file://` URL.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use leysync_core::RepoConfig;

pub const BRANCH: &str = "main";

/// Run `git` in `dir`, panicking with stderr on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap_or_else(|e| panic!("spawn git {}: {e}", args.join(" ")));
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Give a clone a committer identity so `commit` works on bare CI machines.
pub fn configure_identity(repo: &Path) {
    git(repo, &["config", "user.name", "leysync test"]);
    git(repo, &["config", "user.email", "leysync@example.invalid"]);
    git(repo, &["config", "commit.gpgsign", "false"]);
}

/// A bare upstream plus a seed working copy used to publish commits to it.
pub struct Upstream {
    root: TempDir,
    bare: PathBuf,
    seed: PathBuf,
}

impl Upstream {
    /// Create an upstream whose first commit on `main` contains `files`.
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let root = TempDir::new().expect("upstream tempdir");
        let bare = root.path().join("upstream.git");
        let seed = root.path().join("seed");
        std::fs::create_dir_all(&bare).unwrap();
        std::fs::create_dir_all(&seed).unwrap();

        git(&bare, &["init", "--bare", "--quiet"]);
        git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&seed, &["init", "--quiet"]);
        git(&seed, &["checkout", "-q", "-b", BRANCH]);
        configure_identity(&seed);
        git(&seed, &["remote", "add", "origin", bare.to_string_lossy().as_ref()]);

        let upstream = Self { root, bare, seed };
        upstream.commit(files, "initial template");
        upstream
    }

    /// `file://` URL of the bare repository (keeps `--depth` meaningful).
    pub fn url(&self) -> String {
        format!("file://{}", self.bare.display())
    }

    pub fn bare_path(&self) -> &Path {
        &self.bare
    }

    /// A config pointing a cache at `cache_path`.
    pub fn repo_config(&self, cache_path: impl Into<PathBuf>) -> RepoConfig {
        RepoConfig {
            url: self.url(),
            branch: BRANCH.to_string(),
            cache_path: cache_path.into(),
        }
    }

    /// Write `files` in the seed copy, commit and push to `main`.
    pub fn commit(&self, files: &[(&str, &str)], message: &str) {
        for (rel, content) in files {
            let path = self.seed.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
        }
        git(&self.seed, &["add", "--all"]);
        git(&self.seed, &["commit", "-q", "--allow-empty", "-m", message]);
        git(&self.seed, &["push", "-q", "origin", BRANCH]);
    }

    /// Tip commit of `branch` in the bare repository.
    pub fn tip(&self, branch: &str) -> String {
        git(&self.bare, &["rev-parse", branch]).trim().to_string()
    }

    /// True when `branch` exists in the bare repository.
    pub fn has_branch(&self, branch: &str) -> bool {
        Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")])
            .current_dir(&self.bare)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Branch names in the bare repository.
    pub fn branches(&self) -> Vec<String> {
        git(&self.bare, &["for-each-ref", "--format=%(refname:short)", "refs/heads"])
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Content of `path` at the tip of `branch`.
    pub fn show(&self, branch: &str, path: &str) -> String {
        git(&self.bare, &["show", &format!("{branch}:{path}")])
    }

    /// Paths changed by the tip commit of `branch`.
    pub fn files_in_tip(&self, branch: &str) -> Vec<String> {
        git(
            &self.bare,
            &["diff-tree", "--no-commit-id", "--name-only", "-r", branch],
        )
        .lines()
        .map(str::to_string)
        .collect()
    }

    /// Scratch directory that lives as long as the upstream.
    pub fn scratch(&self) -> PathBuf {
        let dir = self.root.path().join("scratch");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
