//! The marker-delimited block leysync keeps in the workspace `.gitignore`.

use std::path::{Path, PathBuf};

use leysync_core::layout::{ARCHIVE_DIR, GITIGNORE_FILE};

use crate::error::{io_err, SyncError};

pub const BLOCK_START: &str = "# >>> leysync managed block >>>";
pub const BLOCK_END: &str = "# <<< leysync managed block <<<";

/// Entries written between the markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedBlock {
    entries: Vec<String>,
}

impl ManagedBlock {
    /// The cache directory (when it lives inside the workspace) and the
    /// local archive root.
    pub fn for_workspace(workspace_root: &Path, cache_path: &Path) -> Self {
        let mut entries = Vec::new();
        if let Ok(rel) = cache_path.strip_prefix(workspace_root) {
            let rel = rel.to_string_lossy().replace('\\', "/");
            if !rel.is_empty() {
                entries.push(format!("{}/", rel.trim_end_matches('/')));
            }
        }
        let archive_root = ARCHIVE_DIR.split('/').next().unwrap_or(ARCHIVE_DIR);
        entries.push(format!("{archive_root}/"));
        Self { entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(BLOCK_START);
        out.push('\n');
        for entry in &self.entries {
            out.push_str(entry);
            out.push('\n');
        }
        out.push_str(BLOCK_END);
        out.push('\n');
        out
    }

    /// Append the block to `<workspace>/.gitignore` unless its start marker is
    /// already there. Returns `true` when the file was changed.
    pub fn ensure(&self, workspace_root: &Path) -> Result<bool, SyncError> {
        let path = workspace_root.join(GITIGNORE_FILE);
        let existing = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(io_err(&path, e)),
        };
        if existing.lines().any(|line| line.trim() == BLOCK_START) {
            return Ok(false);
        }

        let mut updated = existing;
        if !updated.is_empty() {
            if !updated.ends_with('\n') {
                updated.push('\n');
            }
            updated.push('\n');
        }
        updated.push_str(&self.render());

        let tmp = PathBuf::from(format!("{}.leysync.tmp", path.display()));
        std::fs::write(&tmp, updated).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&path, e));
        }
        tracing::info!("added managed block to {}", path.display());
        Ok(true)
    }
}
