//! Files in the workspace's shared subtree that differ from the cache.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use leysync_core::layout::SHARED_SUBTREE;
use leysync_sync::{rules::should_skip, FileDigest};

use crate::error::{io_err, ContributionError};

/// Paths relative to the shared subtree, in sorted order.
///
/// Only additions and modifications are detected: a file deleted from the
/// workspace is not a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    files: BTreeSet<PathBuf>,
}

impl ChangeSet {
    /// Compare `workspace_shared` against `cache_shared`. A file is changed
    /// when it is missing from the cache or its content hash differs.
    pub fn compute(workspace_shared: &Path, cache_shared: &Path) -> Result<Self, ContributionError> {
        let mut files = BTreeSet::new();
        if !workspace_shared.is_dir() {
            return Ok(Self { files });
        }
        for rel in walk_files(workspace_shared)? {
            let ours = FileDigest::of_file(&workspace_shared.join(&rel));
            let theirs = cache_shared.join(&rel);
            if !theirs.exists() || !ours.matches(&FileDigest::of_file(&theirs)) {
                files.insert(rel);
            }
        }
        Ok(Self { files })
    }

    /// Drop files whose current content already sits in `archive_root`, i.e.
    /// were contributed before and have not been edited since.
    pub fn without_archived(self, workspace_shared: &Path, archive_root: &Path) -> Self {
        let files = self
            .files
            .into_iter()
            .filter(|rel| {
                let archived = archive_root.join(rel);
                !(archived.exists()
                    && FileDigest::of_file(&archived)
                        .matches(&FileDigest::of_file(&workspace_shared.join(rel))))
            })
            .collect();
        Self { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    /// `/`-separated display form, one per file.
    pub fn display_paths(&self) -> Vec<String> {
        self.iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    /// Markdown bullet list of the changed files.
    pub fn bullet_list(&self) -> String {
        self.display_paths()
            .iter()
            .map(|p| format!("- {p}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<PathBuf> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = PathBuf>>(iter: T) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// Regular files under `root`, relative to it. Deny-listed paths and
/// symlinks are skipped.
fn walk_files(root: &Path) -> Result<Vec<PathBuf>, ContributionError> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))? {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let rel = rel.to_path_buf();
            let cache_relative = format!("{SHARED_SUBTREE}/{}", rel.to_string_lossy());
            if should_skip(&cache_relative, file_type.is_dir()) {
                continue;
            }
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                out.push(rel);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, content).unwrap();
    }

    #[test]
    fn detects_new_and_modified_but_not_deleted() {
        let tmp = TempDir::new().unwrap();
        let ws = tmp.path().join("ws");
        let cache = tmp.path().join("cache");
        write(&ws, "same.md", "x");
        write(&cache, "same.md", "x");
        write(&ws, "edited.md", "new");
        write(&cache, "edited.md", "old");
        write(&ws, "nested/added.md", "added");
        write(&cache, "deleted-locally.md", "gone");

        let changes = ChangeSet::compute(&ws, &cache).unwrap();
        assert_eq!(changes.display_paths(), vec!["edited.md", "nested/added.md"]);
        assert_eq!(changes.bullet_list(), "- edited.md\n- nested/added.md");
    }

    #[test]
    fn missing_workspace_subtree_is_empty() {
        let tmp = TempDir::new().unwrap();
        let changes = ChangeSet::compute(&tmp.path().join("nope"), tmp.path()).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn missing_cache_subtree_means_everything_is_new() {
        let tmp = TempDir::new().unwrap();
        let ws = tmp.path().join("ws");
        write(&ws, "a.md", "a");
        write(&ws, "b/c.md", "c");
        let changes = ChangeSet::compute(&ws, &tmp.path().join("cache")).unwrap();
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn deny_listed_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let ws = tmp.path().join("ws");
        write(&ws, ".DS_Store", "meta");
        write(&ws, "notes.md.leysync.tmp", "partial");
        write(&ws, "node_modules/x.js", "x");
        write(&ws, "real.md", "real");
        let changes = ChangeSet::compute(&ws, &tmp.path().join("cache")).unwrap();
        assert_eq!(changes.display_paths(), vec!["real.md"]);
    }

    #[test]
    fn archived_copies_are_dropped_until_edited_again() {
        let tmp = TempDir::new().unwrap();
        let ws = tmp.path().join("ws");
        let archive = tmp.path().join("archive");
        write(&ws, "a.md", "v1");
        write(&ws, "b.md", "b");
        write(&archive, "a.md", "v1");

        let changes = ChangeSet::compute(&ws, &tmp.path().join("cache"))
            .unwrap()
            .without_archived(&ws, &archive);
        assert_eq!(changes.display_paths(), vec!["b.md"]);

        write(&ws, "a.md", "v2");
        let changes = ChangeSet::compute(&ws, &tmp.path().join("cache"))
            .unwrap()
            .without_archived(&ws, &archive);
        assert_eq!(changes.len(), 2);
    }
}
