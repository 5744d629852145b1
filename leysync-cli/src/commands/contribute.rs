//! `leysync contribute` — run one contribution check.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use leysync_contrib::ContributionOutcome;

use super::open_workspace;

/// Arguments for `leysync contribute`.
#[derive(Args, Debug)]
pub struct ContributeArgs {
    /// Workspace root. Defaults to the current directory.
    pub path: Option<PathBuf>,

    /// Only list the files that would be contributed.
    #[arg(long)]
    pub dry_run: bool,
}

impl ContributeArgs {
    pub fn run(self) -> Result<()> {
        let context = open_workspace(self.path)?;
        let engine = context.engine();

        if self.dry_run {
            let changes = engine
                .pending_changes()
                .context("failed to compare shared files")?;
            if changes.is_empty() {
                println!("No shared changes to contribute.");
            } else {
                println!("{} file(s) would be contributed:", changes.len());
                println!("{}", changes.bullet_list());
            }
            return Ok(());
        }

        let outcome = engine
            .check_and_contribute(context.notifier())
            .with_context(|| format!("contribution failed for '{}'", context.name()))?;
        match outcome {
            ContributionOutcome::Disabled => {
                println!("Contribution is disabled in .leysync.yaml (contribute.enabled).")
            }
            ContributionOutcome::NoChanges => println!("No shared changes to contribute."),
            ContributionOutcome::Pushed { branch, .. } => println!("Pushed branch {branch}."),
            ContributionOutcome::Proposed { url, .. } => println!("Opened {url}"),
        }
        Ok(())
    }
}
