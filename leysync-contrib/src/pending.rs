//! Contribution branches that were pushed but have no pull request yet.
//!
//! A push without a credential, or a rejected proposal request, leaves an
//! entry here. The next check opens the proposal for the recorded branch
//! instead of pushing the same edits again.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use leysync_core::layout::PENDING_PROPOSALS_FILE;

use crate::error::{io_err, ContributionError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingProposal {
    pub branch: String,
    /// `/`-separated, relative to the shared subtree.
    pub files: Vec<String>,
    pub pushed_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PendingFile {
    #[serde(default)]
    proposals: Vec<PendingProposal>,
}

/// `<workspace>/.my/pending-proposals.yaml`.
#[derive(Debug, Clone)]
pub struct PendingProposals {
    path: PathBuf,
}

impl PendingProposals {
    pub fn for_workspace(workspace_root: &Path) -> Self {
        Self {
            path: workspace_root.join(PENDING_PROPOSALS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Oldest first. A missing file is an empty list.
    pub fn load(&self) -> Result<Vec<PendingProposal>, ContributionError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| io_err(&self.path, e))?;
        let file: PendingFile =
            serde_yaml::from_str(&contents).map_err(|e| ContributionError::PendingRecord {
                path: self.path.clone(),
                source: e,
            })?;
        Ok(file.proposals)
    }

    pub fn add(&self, proposal: PendingProposal) -> Result<(), ContributionError> {
        let mut proposals = self.load()?;
        proposals.retain(|p| p.branch != proposal.branch);
        proposals.push(proposal);
        self.save(proposals)
    }

    /// `Ok(false)` if `branch` was not recorded.
    pub fn remove(&self, branch: &str) -> Result<bool, ContributionError> {
        let mut proposals = self.load()?;
        let before = proposals.len();
        proposals.retain(|p| p.branch != branch);
        if proposals.len() == before {
            return Ok(false);
        }
        self.save(proposals)?;
        Ok(true)
    }

    fn save(&self, proposals: Vec<PendingProposal>) -> Result<(), ContributionError> {
        if proposals.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_err(&self.path, e)),
            };
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let yaml = serde_yaml::to_string(&PendingFile { proposals }).map_err(|e| {
            ContributionError::PendingRecord {
                path: self.path.clone(),
                source: e,
            }
        })?;
        let tmp = self.path.with_extension("yaml.tmp");
        std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| io_err(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pending(branch: &str) -> PendingProposal {
        PendingProposal {
            branch: branch.to_string(),
            files: vec!["base.md".to_string()],
            pushed_at: Utc::now(),
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let ws = TempDir::new().unwrap();
        assert!(PendingProposals::for_workspace(ws.path()).load().unwrap().is_empty());
    }

    #[test]
    fn add_replaces_same_branch_and_keeps_order() {
        let ws = TempDir::new().unwrap();
        let store = PendingProposals::for_workspace(ws.path());
        store.add(pending("contribution/a")).unwrap();
        store.add(pending("contribution/b")).unwrap();
        store.add(pending("contribution/a")).unwrap();

        let branches: Vec<String> = store.load().unwrap().into_iter().map(|p| p.branch).collect();
        assert_eq!(branches, vec!["contribution/b", "contribution/a"]);
    }

    #[test]
    fn removing_the_last_entry_deletes_the_file() {
        let ws = TempDir::new().unwrap();
        let store = PendingProposals::for_workspace(ws.path());
        store.add(pending("contribution/a")).unwrap();
        assert!(store.path().exists());

        assert!(store.remove("contribution/a").unwrap());
        assert!(!store.remove("contribution/a").unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn corrupt_file_is_a_record_error() {
        let ws = TempDir::new().unwrap();
        let store = PendingProposals::for_workspace(ws.path());
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "proposals: {{").unwrap();
        assert!(matches!(
            store.load(),
            Err(ContributionError::PendingRecord { .. })
        ));
    }
}
