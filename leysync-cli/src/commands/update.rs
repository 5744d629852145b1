//! `leysync update` — one forced cycle: refresh, redeploy, contribute.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use leysync_daemon::{CycleKind, CycleRunner, SchedulerState};

use super::open_workspace;

/// Arguments for `leysync update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Workspace root. Defaults to the current directory.
    pub path: Option<PathBuf>,
}

impl UpdateArgs {
    pub fn run(self) -> Result<()> {
        let context = open_workspace(self.path)?;
        let report = context
            .run_cycle(CycleKind::Forced, &print_state)
            .with_context(|| format!("update failed for '{}'", context.name()))?;

        println!(
            "{} '{}' cache {:?}, {} written, {} removed",
            "✓".green(),
            context.name(),
            report.cache,
            report.updated,
            report.removed
        );
        Ok(())
    }
}

fn print_state(state: SchedulerState) {
    let label = match state {
        SchedulerState::Cloning => "cloning template repository",
        SchedulerState::Updating => "fetching template repository",
        SchedulerState::Initializing => "deploying files",
        _ => return,
    };
    eprintln!("{}", format!("… {label}").bright_black());
}
