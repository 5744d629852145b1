//! Make a workspace match the mapping-rule outcome for one toggle set.
//!
//! Each rule is handled on its own: an active rule copies its source from the
//! cache (hash-gated, so unchanged files are never rewritten), an inactive
//! gated rule removes its target, and the core bundle is never removed. A
//! failing rule lands in [`ReconcileReport::failures`] and the pass moves on.
//!
//! Workspace files marked as preserved (local edits awaiting contribution)
//! are never overwritten.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use leysync_core::{FeatureToggleSet, MappingRule, Notifier, RuleKind, Settings};

use crate::error::{io_err, ReconcileError, SyncError};
use crate::gitignore::ManagedBlock;
use crate::rules::{should_skip, DEFAULT_RULES};
use crate::writer::{copy_if_changed, remove_target};

/// Whether a pass announces its summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reporting {
    Summary,
    /// Failures are still reported; the summary is not.
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileNote {
    /// An active rule whose source is absent from the cache.
    SourceNotFound { rule: &'static str },
    /// A preserved workspace file that differs from the cache was left alone.
    LocalEditKept { path: PathBuf },
    IgnoreFileUpdated,
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Files written.
    pub updated: usize,
    /// Targets removed because their integration is off.
    pub removed: usize,
    pub notes: Vec<ReconcileNote>,
    pub failures: Vec<ReconcileError>,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        self.updated > 0 || self.removed > 0
    }

    pub fn summary(&self) -> String {
        if !self.changed() {
            return "All configurations are up to date.".to_string();
        }
        let mut parts = Vec::new();
        if self.updated > 0 {
            parts.push(format!("synchronized {}", plural(self.updated, "file")));
        }
        if self.removed > 0 {
            parts.push(format!("removed {}", plural(self.removed, "disabled target")));
        }
        let mut summary = parts.join(", ");
        if let Some(first) = summary.get(..1) {
            summary = first.to_uppercase() + &summary[1..];
        }
        summary.push('.');
        summary
    }

    /// One message covering every failure, or `None` when there were none.
    pub fn failure_summary(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let lines: Vec<String> = self.failures.iter().map(|f| format!("  - {f}")).collect();
        Some(format!(
            "{} failed during sync:\n{}",
            plural(self.failures.len(), "rule"),
            lines.join("\n")
        ))
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Applies mapping rules from one cache root to one workspace root.
#[derive(Debug, Clone)]
pub struct FileReconciler {
    workspace_root: PathBuf,
    cache_root: PathBuf,
    rules: Vec<MappingRule>,
    ignore_block: Option<ManagedBlock>,
    /// Relative to the workspace root.
    preserved: BTreeSet<PathBuf>,
}

impl FileReconciler {
    /// Default rule table, no ignore-file maintenance.
    pub fn new(workspace_root: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            cache_root: cache_root.into(),
            rules: DEFAULT_RULES.to_vec(),
            ignore_block: None,
            preserved: BTreeSet::new(),
        }
    }

    /// Reconciler configured from workspace settings.
    pub fn from_settings(workspace_root: &Path, settings: &Settings) -> Self {
        let cache_root = settings.cache_path(workspace_root);
        let ignore_block = settings
            .gitignore
            .auto_update
            .then(|| ManagedBlock::for_workspace(workspace_root, &cache_root));
        Self::new(workspace_root, cache_root).with_ignore_block(ignore_block)
    }

    pub fn with_rules(mut self, rules: impl Into<Vec<MappingRule>>) -> Self {
        self.rules = rules.into();
        self
    }

    pub fn with_ignore_block(mut self, block: Option<ManagedBlock>) -> Self {
        self.ignore_block = block;
        self
    }

    /// Workspace-relative files this reconciler must not overwrite.
    pub fn with_preserved(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.preserved = paths.into_iter().collect();
        self
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    /// Run one pass. Never fails as a whole; see [`ReconcileReport::failures`].
    pub fn reconcile(&self, toggles: &FeatureToggleSet) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for rule in &self.rules {
            if rule.is_active(toggles) {
                self.apply(rule, &mut report);
            } else if !rule.is_protected() {
                let target = self.workspace_root.join(rule.target);
                match remove_target(&target) {
                    Ok(true) => {
                        tracing::info!("removed disabled target {}", rule.target);
                        report.removed += 1;
                    }
                    Ok(false) => {}
                    Err(source) => report.failures.push(ReconcileError::Remove {
                        rule: rule.target,
                        source,
                    }),
                }
            }
        }

        if let Some(block) = &self.ignore_block {
            match block.ensure(&self.workspace_root) {
                Ok(true) => report.notes.push(ReconcileNote::IgnoreFileUpdated),
                Ok(false) => {}
                Err(e) => report.failures.push(ReconcileError::IgnoreFile(e)),
            }
        }

        tracing::debug!(
            "reconciled {}: {} updated, {} removed, {} failed",
            self.workspace_root.display(),
            report.updated,
            report.removed,
            report.failures.len()
        );
        report
    }

    /// [`reconcile`](Self::reconcile), then report through `notifier`.
    pub fn reconcile_and_notify(
        &self,
        toggles: &FeatureToggleSet,
        notifier: &dyn Notifier,
        reporting: Reporting,
    ) -> ReconcileReport {
        let report = self.reconcile(toggles);
        if let Some(failures) = report.failure_summary() {
            notifier.warn(&failures);
        }
        if reporting == Reporting::Summary {
            notifier.info(&report.summary());
        }
        report
    }

    fn apply(&self, rule: &MappingRule, report: &mut ReconcileReport) {
        let source = self.cache_root.join(rule.source);
        let target = self.workspace_root.join(rule.target);
        if !source.exists() {
            tracing::debug!("source not found: {}", rule.source);
            report.notes.push(ReconcileNote::SourceNotFound { rule: rule.source });
            return;
        }

        let mut written = 0;
        let result = match rule.kind {
            RuleKind::File => self.copy_file(&source, &target, &mut written, &mut report.notes),
            RuleKind::Directory => {
                self.copy_tree(&source, &target, &mut written, &mut report.notes)
            }
        };
        // Files written before a failure still count.
        report.updated += written;
        if let Err(source) = result {
            report.failures.push(ReconcileError::Copy {
                rule: rule.target,
                source,
            });
        }
    }

    fn copy_file(
        &self,
        source: &Path,
        target: &Path,
        written: &mut usize,
        notes: &mut Vec<ReconcileNote>,
    ) -> Result<(), SyncError> {
        if let Ok(relative) = target.strip_prefix(&self.workspace_root) {
            if self.preserved.contains(relative) {
                tracing::debug!("keeping local edit: {}", relative.display());
                notes.push(ReconcileNote::LocalEditKept {
                    path: relative.to_path_buf(),
                });
                return Ok(());
            }
        }
        if copy_if_changed(source, target)?.was_written() {
            *written += 1;
        }
        Ok(())
    }

    fn copy_tree(
        &self,
        source: &Path,
        target: &Path,
        written: &mut usize,
        notes: &mut Vec<ReconcileNote>,
    ) -> Result<(), SyncError> {
        std::fs::create_dir_all(target).map_err(|e| io_err(target, e))?;

        let mut entries = std::fs::read_dir(source)
            .map_err(|e| io_err(source, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| io_err(source, e))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
            let relative = path
                .strip_prefix(&self.cache_root)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            if should_skip(&relative, file_type.is_dir()) {
                tracing::trace!("excluded: {relative}");
                continue;
            }

            let dest = target.join(entry.file_name());
            if file_type.is_dir() {
                self.copy_tree(&path, &dest, written, notes)?;
            } else if file_type.is_file() {
                self.copy_file(&path, &dest, written, notes)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leysync_core::{Integration, RecordingNotifier};
    use leysync_core::notifier::Level;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let ws = tmp.path().join("ws");
        let cache = ws.join(".cache/ai-ley");
        std::fs::create_dir_all(cache.join(".ai-ley/shared")).unwrap();
        std::fs::write(cache.join(".ai-ley/shared/a.md"), "a").unwrap();
        std::fs::write(cache.join("CLAUDE.md"), "claude").unwrap();
        (tmp, ws, cache)
    }

    #[test]
    fn summary_wording() {
        let mut report = ReconcileReport::default();
        assert_eq!(report.summary(), "All configurations are up to date.");
        report.updated = 1;
        assert_eq!(report.summary(), "Synchronized 1 file.");
        report.updated = 3;
        report.removed = 2;
        assert_eq!(
            report.summary(),
            "Synchronized 3 files, removed 2 disabled targets."
        );
        report.updated = 0;
        assert_eq!(report.summary(), "Removed 2 disabled targets.");
    }

    #[test]
    fn missing_sources_are_notes_not_failures() {
        let (_tmp, ws, cache) = fixture();
        let report = FileReconciler::new(&ws, &cache).reconcile(&FeatureToggleSet::all());
        assert!(report.failures.is_empty());
        assert!(report
            .notes
            .contains(&ReconcileNote::SourceNotFound { rule: "GEMINI.md" }));
        assert!(!report
            .notes
            .contains(&ReconcileNote::SourceNotFound { rule: "CLAUDE.md" }));
        assert_eq!(report.updated, 2);
    }

    #[test]
    fn silent_mode_suppresses_summary_but_not_failures() {
        let (_tmp, ws, cache) = fixture();
        // A directory where a file is expected makes the CLAUDE.md rule fail.
        std::fs::create_dir_all(ws.join("CLAUDE.md/blocker")).unwrap();
        let notifier = RecordingNotifier::new();
        let reconciler = FileReconciler::new(&ws, &cache);
        let toggles = FeatureToggleSet::none().with(Integration::Claude, true);

        let report = reconciler.reconcile_and_notify(&toggles, &notifier, Reporting::Silent);
        assert_eq!(report.failures.len(), 1);
        assert!(notifier.at(Level::Info).is_empty());
        let warnings = notifier.at(Level::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("CLAUDE.md"), "got: {}", warnings[0]);
        // The core bundle rule still ran.
        assert!(ws.join(".ai-ley/shared/a.md").exists());
    }

    #[test]
    fn summary_mode_reports_once() {
        let (_tmp, ws, cache) = fixture();
        let notifier = RecordingNotifier::new();
        FileReconciler::new(&ws, &cache).reconcile_and_notify(
            &FeatureToggleSet::all(),
            &notifier,
            Reporting::Summary,
        );
        assert_eq!(notifier.messages().len(), 1);
        assert_eq!(notifier.at(Level::Info), vec!["Synchronized 2 files.".to_string()]);
    }

    #[test]
    fn preserved_files_are_not_overwritten() {
        let (_tmp, ws, cache) = fixture();
        std::fs::write(cache.join(".ai-ley/shared/b.md"), "b").unwrap();
        let reconciler = FileReconciler::new(&ws, &cache);
        reconciler.reconcile(&FeatureToggleSet::all());

        std::fs::write(ws.join(".ai-ley/shared/a.md"), "a, edited").unwrap();
        std::fs::write(ws.join(".ai-ley/shared/b.md"), "b, edited").unwrap();
        std::fs::write(ws.join("CLAUDE.md"), "claude, edited").unwrap();
        let report = reconciler
            .clone()
            .with_preserved([PathBuf::from(".ai-ley/shared/a.md")])
            .reconcile(&FeatureToggleSet::all());

        assert_eq!(
            std::fs::read_to_string(ws.join(".ai-ley/shared/a.md")).unwrap(),
            "a, edited"
        );
        assert_eq!(std::fs::read_to_string(ws.join(".ai-ley/shared/b.md")).unwrap(), "b");
        assert_eq!(std::fs::read_to_string(ws.join("CLAUDE.md")).unwrap(), "claude");
        assert_eq!(report.updated, 2);
        assert!(report.notes.contains(&ReconcileNote::LocalEditKept {
            path: PathBuf::from(".ai-ley/shared/a.md")
        }));
    }

    #[test]
    fn from_settings_honours_gitignore_flag() {
        let (_tmp, ws, _cache) = fixture();
        let mut settings = Settings::default();
        settings.gitignore.auto_update = false;
        let report = FileReconciler::from_settings(&ws, &settings).reconcile(&FeatureToggleSet::none());
        assert!(!ws.join(".gitignore").exists());
        assert!(!report.notes.contains(&ReconcileNote::IgnoreFileUpdated));

        settings.gitignore.auto_update = true;
        let report = FileReconciler::from_settings(&ws, &settings).reconcile(&FeatureToggleSet::none());
        assert!(report.notes.contains(&ReconcileNote::IgnoreFileUpdated));
        let ignore = std::fs::read_to_string(ws.join(".gitignore")).unwrap();
        assert!(ignore.contains(".cache/ai-ley/"));
    }
}
