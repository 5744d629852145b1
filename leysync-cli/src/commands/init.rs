//! `leysync init [<path>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use leysync_core::{registry, settings};

use super::resolve_workspace;

/// Register a workspace with leysync.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Workspace root directory. Defaults to the current directory.
    pub path: Option<PathBuf>,

    /// Do not write a default .leysync.yaml.
    #[arg(long)]
    pub no_settings: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        let root = resolve_workspace(self.path)?;

        let entry = registry::register_at(&home, &root)
            .with_context(|| format!("failed to register '{}'", root.display()))?;
        println!("✓ Registered '{}'", entry.name);
        println!("  Path: {}", entry.path.display());

        if self.no_settings {
            return Ok(());
        }
        let created = settings::write_default_if_missing(&entry.path)
            .with_context(|| format!("failed to write settings in '{}'", entry.path.display()))?;
        let settings_file = settings::settings_path(&entry.path);
        if created {
            println!("  Settings: {} (created)", settings_file.display());
        } else {
            println!("  Settings: {} (kept)", settings_file.display());
        }
        Ok(())
    }
}
