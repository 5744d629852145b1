//! Workspace registry.
//!
//! # Storage layout
//!
//! ```text
//! ~/.leysync/
//!   workspaces.yaml   (index of managed workspaces — mode 0600)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::RegistryError;
use crate::types::{WorkspaceEntry, WorkspaceIndex, WorkspaceName};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.leysync/`
pub fn leysync_root(home: &Path) -> PathBuf {
    home.join(".leysync")
}

/// `<home>/.leysync/workspaces.yaml` — pure, no I/O.
pub fn index_path_at(home: &Path) -> PathBuf {
    leysync_root(home).join("workspaces.yaml")
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load the workspace index. A missing file is an empty index.
///
/// Returns `RegistryError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<WorkspaceIndex, RegistryError> {
    let path = index_path_at(home);
    if !path.exists() {
        return Ok(WorkspaceIndex::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<WorkspaceIndex, RegistryError> {
    load_at(&home()?)
}

/// All registered workspaces, sorted by path.
pub fn list_at(home: &Path) -> Result<Vec<WorkspaceEntry>, RegistryError> {
    let mut entries = load_at(home)?.workspaces;
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

/// `list_at` convenience wrapper.
pub fn list() -> Result<Vec<WorkspaceEntry>, RegistryError> {
    list_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the index to `<home>/.leysync/workspaces.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, index: &WorkspaceIndex) -> Result<(), RegistryError> {
    let root = leysync_root(home);
    if !root.exists() {
        std::fs::create_dir_all(&root)?;
        set_dir_permissions(&root)?;
    }
    let path = index_path_at(home);
    let tmp_path = path.with_file_name("workspaces.yaml.tmp");

    let yaml = serde_yaml::to_string(index)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Register / unregister
// ---------------------------------------------------------------------------

/// Register the workspace rooted at `workspace_path`.
///
/// The path is canonicalized so the same directory reached through a symlink
/// is not registered twice. Idempotent: an existing entry is returned as is.
pub fn register_at(home: &Path, workspace_path: &Path) -> Result<WorkspaceEntry, RegistryError> {
    if !workspace_path.is_dir() {
        return Err(RegistryError::WorkspaceNotFound {
            path: workspace_path.to_path_buf(),
        });
    }
    let path = std::fs::canonicalize(workspace_path)?;

    let mut index = load_at(home)?;
    if let Some(existing) = index.workspaces.iter().find(|w| w.path == path) {
        return Ok(existing.clone());
    }

    let now = Utc::now();
    let entry = WorkspaceEntry {
        name: workspace_name_for(&path),
        path,
        added_at: now,
    };
    index.workspaces.push(entry.clone());
    index.updated_at = now;
    save_at(home, &index)?;
    Ok(entry)
}

/// `register_at` convenience wrapper.
pub fn register(workspace_path: &Path) -> Result<WorkspaceEntry, RegistryError> {
    register_at(&home()?, workspace_path)
}

/// Remove a workspace from the index. Returns `true` if an entry was removed.
pub fn unregister_at(home: &Path, workspace_path: &Path) -> Result<bool, RegistryError> {
    let path = std::fs::canonicalize(workspace_path).unwrap_or_else(|_| workspace_path.to_path_buf());
    let mut index = load_at(home)?;
    let before = index.workspaces.len();
    index.workspaces.retain(|w| w.path != path);
    if index.workspaces.len() == before {
        return Ok(false);
    }
    index.updated_at = Utc::now();
    save_at(home, &index)?;
    Ok(true)
}

/// `unregister_at` convenience wrapper.
pub fn unregister(workspace_path: &Path) -> Result<bool, RegistryError> {
    unregister_at(&home()?, workspace_path)
}

/// Folder name of a workspace root, used as its display name.
pub fn workspace_name_for(path: &Path) -> WorkspaceName {
    WorkspaceName::from(
        path.file_name()
            .unwrap_or_else(|| path.as_os_str())
            .to_string_lossy()
            .into_owned(),
    )
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// `dirs::home_dir()` or [`RegistryError::HomeNotFound`].
fn home() -> Result<PathBuf, RegistryError> {
    dirs::home_dir().ok_or(RegistryError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
