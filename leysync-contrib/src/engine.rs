//! The contribution cycle: diff → branch → commit → push → archive →
//! propose, always followed by returning the cache to its tracked branch.
//!
//! Edits are archived as soon as their branch is pushed, so they are never
//! pushed twice. A branch whose proposal could not be opened is recorded in
//! [`PendingProposals`] and retried by the next check.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use leysync_core::layout::{ARCHIVE_DIR, SHARED_SUBTREE};
use leysync_core::settings::ContributeSettings;
use leysync_core::{registry, Notifier, Settings};
use leysync_repo::{CacheError, RepositoryCache};
use leysync_sync::copy_if_changed;

use crate::branch::ContributionBranch;
use crate::changeset::ChangeSet;
use crate::credential::CredentialSource;
use crate::error::{ApiError, ContributionError};
use crate::pending::{PendingProposal, PendingProposals};
use crate::proposal::{GitHubProposalClient, ProposalClient, ProposalRequest};

const PROPOSAL_TITLE: &str = "Community contribution: Updated shared files";

/// What a contribution check ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContributionOutcome {
    /// `contribute.enabled` is off.
    Disabled,
    NoChanges,
    /// Branch pushed, but no proposal was opened yet; it is retried by the
    /// next check.
    Pushed { branch: String, files: Vec<String> },
    Proposed {
        branch: String,
        files: Vec<String>,
        url: String,
    },
}

/// Round-trips edits under the workspace's shared subtree to the upstream
/// template repository.
pub struct ContributionEngine {
    workspace_root: PathBuf,
    cache: RepositoryCache,
    settings: ContributeSettings,
    proposals: Box<dyn ProposalClient>,
    credentials: CredentialSource,
}

impl ContributionEngine {
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        cache: RepositoryCache,
        settings: ContributeSettings,
        proposals: Box<dyn ProposalClient>,
        credentials: CredentialSource,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            cache,
            settings,
            proposals,
            credentials,
        }
    }

    /// GitHub client and `GITHUB_TOKEN`, as configured for `workspace_root`.
    pub fn from_settings(workspace_root: &Path, settings: &Settings) -> Self {
        Self::new(
            workspace_root,
            RepositoryCache::new(settings.repo_config(workspace_root)),
            settings.contribute.clone(),
            Box::new(GitHubProposalClient::from_settings(&settings.contribute)),
            CredentialSource::default(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    fn workspace_shared(&self) -> PathBuf {
        self.workspace_root.join(SHARED_SUBTREE)
    }

    fn archive_root(&self) -> PathBuf {
        self.workspace_root.join(ARCHIVE_DIR)
    }

    pub fn pending_proposals(&self) -> PendingProposals {
        PendingProposals::for_workspace(&self.workspace_root)
    }

    fn project_name(&self) -> String {
        registry::workspace_name_for(&self.workspace_root).0
    }

    /// Every shared file that differs from the cache, contributed or not.
    /// These are the workspace's own edits and must survive a reconcile pass.
    pub fn local_edits(&self) -> Result<ChangeSet, ContributionError> {
        ChangeSet::compute(
            &self.workspace_shared(),
            &self.cache.path().join(SHARED_SUBTREE),
        )
    }

    /// Files that the next check would contribute.
    pub fn pending_changes(&self) -> Result<ChangeSet, ContributionError> {
        let changes = self.local_edits()?;
        Ok(changes.without_archived(&self.workspace_shared(), &self.archive_root()))
    }

    /// Run one contribution check. No-op when disabled or nothing changed.
    ///
    /// Branches recorded as pending get their proposal retried first. Once
    /// anything has been copied into the cache, the cache is returned to the
    /// tracked branch whatever happens; a failure of that cleanup is logged
    /// and never replaces the original result.
    #[instrument(skip_all, fields(workspace = %self.workspace_root.display()))]
    pub fn check_and_contribute(
        &self,
        notifier: &dyn Notifier,
    ) -> Result<ContributionOutcome, ContributionError> {
        if !self.settings.enabled {
            debug!("contribution disabled");
            return Ok(ContributionOutcome::Disabled);
        }
        if !self.cache.is_present() {
            return Err(CacheError::NotPresent {
                path: self.cache.path().to_path_buf(),
            }
            .into());
        }

        let token = OnceCell::new();
        let retried = self.retry_pending(&token, notifier)?;

        let changes = self.pending_changes()?;
        if changes.is_empty() {
            debug!("no changes in shared subtree");
            return Ok(retried.unwrap_or(ContributionOutcome::NoChanges));
        }

        info!(files = changes.len(), "shared changes detected");
        notifier.info(&format!(
            "Detected {} changed file(s) in {SHARED_SUBTREE}. Contributing back...",
            changes.len()
        ));

        let branch = ContributionBranch::new(&self.project_name(), Utc::now());
        let result = self.contribute(&changes, &branch, &token, notifier);

        if let Err(cleanup) = self.cache.checkout_tracked_and_sync() {
            warn!(error = %cleanup, "could not return cache to tracked branch");
        }

        match &result {
            Ok(ContributionOutcome::Proposed { files, .. })
            | Ok(ContributionOutcome::Pushed { files, .. }) => {
                notifier.info(&format!(
                    "Contribution complete: {} file(s) contributed.",
                    files.len()
                ));
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "contribution failed");
                notifier.error(&format!("Contribution failed: {e}"));
            }
        }
        result
    }

    fn contribute(
        &self,
        changes: &ChangeSet,
        branch: &ContributionBranch,
        token: &OnceCell<Option<String>>,
        notifier: &dyn Notifier,
    ) -> Result<ContributionOutcome, ContributionError> {
        let workspace_shared = self.workspace_shared();
        let cache_shared = self.cache.path().join(SHARED_SUBTREE);
        for rel in changes.iter() {
            copy_if_changed(&workspace_shared.join(rel), &cache_shared.join(rel))?;
        }

        self.cache.create_branch(branch.name())?;

        let project = self.project_name();
        let files = changes.display_paths();
        let message = format!(
            "Community contribution: Updated {} file(s) in shared\n\nFrom workspace: {project}\nFiles:\n{}",
            files.len(),
            changes.bullet_list()
        );
        if !self.cache.stage_and_commit(SHARED_SUBTREE, &message)? {
            return Err(ContributionError::NothingStaged(SHARED_SUBTREE));
        }
        self.cache.push(branch.name())?;
        info!(%branch, "contribution branch pushed");

        self.archive(changes)?;
        let pending = PendingProposal {
            branch: branch.name().to_string(),
            files,
            pushed_at: Utc::now(),
        };

        let Some(token) = token.get_or_init(|| self.credentials.resolve(notifier)) else {
            notifier.warn(&format!(
                "No GitHub token available; branch {branch} was pushed but no pull request was created."
            ));
            let outcome = ContributionOutcome::Pushed {
                branch: pending.branch.clone(),
                files: pending.files.clone(),
            };
            self.pending_proposals().add(pending)?;
            return Ok(outcome);
        };

        match self.propose(&pending, token, notifier) {
            Ok(url) => Ok(ContributionOutcome::Proposed {
                branch: pending.branch,
                files: pending.files,
                url,
            }),
            Err(err) => {
                self.pending_proposals().add(pending)?;
                Err(err.into())
            }
        }
    }

    /// Open proposals for branches pushed by earlier checks. Returns the
    /// last proposal opened, if any.
    fn retry_pending(
        &self,
        token: &OnceCell<Option<String>>,
        notifier: &dyn Notifier,
    ) -> Result<Option<ContributionOutcome>, ContributionError> {
        let store = self.pending_proposals();
        let pending = store.load()?;
        if pending.is_empty() {
            return Ok(None);
        }
        let Some(token) = token.get_or_init(|| self.credentials.resolve(notifier)) else {
            debug!(branches = pending.len(), "no token; proposals stay pending");
            return Ok(None);
        };

        let mut opened = None;
        for proposal in pending {
            match self.propose(&proposal, token, notifier) {
                Ok(url) => {
                    store.remove(&proposal.branch)?;
                    opened = Some(ContributionOutcome::Proposed {
                        branch: proposal.branch,
                        files: proposal.files,
                        url,
                    });
                }
                // 422: already proposed, or the branch is gone upstream.
                Err(ApiError::Status { status: 422, body }) => {
                    warn!(branch = %proposal.branch, %body, "proposal rejected; dropping record");
                    notifier.warn(&format!(
                        "Pull request for {} was rejected and will not be retried: {body}",
                        proposal.branch
                    ));
                    store.remove(&proposal.branch)?;
                }
                Err(err) => {
                    warn!(branch = %proposal.branch, error = %err, "proposal retry failed");
                    notifier.warn(&format!(
                        "Could not create pull request for {}: {err}",
                        proposal.branch
                    ));
                }
            }
        }
        Ok(opened)
    }

    fn propose(
        &self,
        pending: &PendingProposal,
        token: &str,
        notifier: &dyn Notifier,
    ) -> Result<String, ApiError> {
        let bullets: Vec<String> = pending.files.iter().map(|f| format!("- {f}")).collect();
        let request = ProposalRequest {
            title: PROPOSAL_TITLE.to_string(),
            body: format!(
                "Automated pull request from leysync.\n\n**Changed files:**\n{}\n\nFrom workspace: {}",
                bullets.join("\n"),
                self.project_name()
            ),
            head: pending.branch.clone(),
            base: self.cache.tracked_branch().to_string(),
        };
        let url = self.proposals.open(&request, token)?;
        info!(%url, "pull request created");
        notifier.info(&format!("Pull request created: {url}"));
        Ok(url)
    }

    /// Copy every contributed file into the permanent local archive.
    fn archive(&self, changes: &ChangeSet) -> Result<(), ContributionError> {
        let workspace_shared = self.workspace_shared();
        let archive = self.archive_root();
        for rel in changes.iter() {
            copy_if_changed(&workspace_shared.join(rel), &archive.join(rel))?;
        }
        debug!(files = changes.len(), archive = %archive.display(), "archived contribution");
        Ok(())
    }
}
