//! `leysync sync` — redeploy from the template cache; no network access.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use leysync_sync::Reporting;

use super::open_workspace;

/// Arguments for `leysync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Workspace root. Defaults to the current directory.
    pub path: Option<PathBuf>,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let context = open_workspace(self.path)?;
        if !context.cache().is_present() {
            bail!(
                "template cache not present at {}; run `leysync update` first",
                context.cache().path().display()
            );
        }

        let report = context.reconcile(context.local_edits(), Reporting::Summary);

        if !report.failures.is_empty() {
            bail!("{} rule(s) failed to sync", report.failures.len());
        }
        println!(
            "{} '{}' ({} written, {} removed)",
            "✓".green(),
            context.name(),
            report.updated,
            report.removed
        );
        Ok(())
    }
}
