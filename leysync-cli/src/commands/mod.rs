pub mod contribute;
pub mod daemon;
pub mod init;
pub mod list;
pub mod status;
pub mod sync;
pub mod update;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use leysync_core::settings;
use leysync_daemon::WorkspaceContext;

use crate::console::ConsoleNotifier;

/// `path` canonicalized, or the current directory.
pub fn resolve_workspace(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => std::env::current_dir().context("cannot read current directory")?,
    };
    path.canonicalize()
        .with_context(|| format!("cannot resolve path '{}'", path.display()))
}

/// Load a workspace's settings and build a context that reports to the terminal.
pub fn open_workspace(path: Option<PathBuf>) -> Result<WorkspaceContext> {
    let root = resolve_workspace(path)?;
    let settings = settings::load(&root)
        .with_context(|| format!("failed to load settings for '{}'", root.display()))?;
    Ok(WorkspaceContext::new(
        &root,
        settings,
        Arc::new(ConsoleNotifier),
    ))
}
