//! Hash-gated atomic copy and target removal.
//!
//! ## `copy_if_changed` protocol
//!
//! 1. Read the source bytes and hash them.
//! 2. Hash the existing target (missing or unreadable ⇒ mismatch).
//! 3. Equal ⇒ skip; the target is not touched, so its mtime survives.
//! 4. Write to `<target>.leysync.tmp` next to the target.
//! 5. Copy the source permissions onto the temp file.
//! 6. Rename over the target (atomic on POSIX).

use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};
use crate::hash::FileDigest;

/// Outcome of one file copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyResult {
    /// Target was created or overwritten.
    Written { path: PathBuf },
    /// Target already had the same content.
    Unchanged { path: PathBuf },
}

impl CopyResult {
    pub fn was_written(&self) -> bool {
        matches!(self, CopyResult::Written { .. })
    }
}

fn tmp_path_for(target: &Path) -> PathBuf {
    PathBuf::from(format!("{}.leysync.tmp", target.display()))
}

/// Copy `source` to `target` unless their contents already match.
pub fn copy_if_changed(source: &Path, target: &Path) -> Result<CopyResult, SyncError> {
    copy_with_tmp(source, target, &tmp_path_for(target))
}

fn copy_with_tmp(source: &Path, target: &Path, tmp: &Path) -> Result<CopyResult, SyncError> {
    let bytes = std::fs::read(source).map_err(|e| io_err(source, e))?;
    let source_digest = FileDigest::of_bytes(&bytes);

    if target.exists() && FileDigest::of_file(target).matches(&source_digest) {
        tracing::debug!("unchanged: {}", target.display());
        return Ok(CopyResult::Unchanged {
            path: target.to_path_buf(),
        });
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, &bytes).map_err(|e| io_err(tmp, e))?;
    if let Ok(meta) = std::fs::metadata(source) {
        let _ = std::fs::set_permissions(tmp, meta.permissions());
    }

    if let Err(e) = std::fs::rename(tmp, target) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(target, e));
    }

    tracing::debug!("wrote: {}", target.display());
    Ok(CopyResult::Written {
        path: target.to_path_buf(),
    })
}

/// Remove a file, symlink or directory tree. `Ok(false)` if nothing was there.
pub fn remove_target(target: &Path) -> Result<bool, SyncError> {
    let meta = match std::fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(io_err(target, e)),
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(target).map_err(|e| io_err(target, e))?;
    } else {
        std::fs::remove_file(target).map_err(|e| io_err(target, e))?;
    }
    tracing::debug!("removed: {}", target.display());
    Ok(true)
}
