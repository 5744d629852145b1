//! Everything one workspace needs to run a cycle, built from its settings.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use leysync_contrib::ContributionEngine;
use leysync_core::layout::SHARED_SUBTREE;
use leysync_core::{registry, settings, Notifier, Settings, SettingsError};
use leysync_repo::{RefreshOutcome, RepositoryCache};
use leysync_sync::{FileReconciler, ReconcileReport, Reporting};

use crate::error::CycleError;
use crate::notifier::TracingNotifier;
use crate::scheduler::{CacheAction, CycleKind, CycleReport, CycleRunner, SchedulerState};

/// Per-workspace state: settings, cache, reconciler and contribution engine.
///
/// Rebuilt from scratch whenever `.leysync.yaml` changes.
pub struct WorkspaceContext {
    root: PathBuf,
    name: String,
    settings: Settings,
    cache: RepositoryCache,
    reconciler: FileReconciler,
    engine: ContributionEngine,
    notifier: Arc<dyn Notifier>,
}

impl WorkspaceContext {
    pub fn new(root: &Path, settings: Settings, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            root: root.to_path_buf(),
            name: registry::workspace_name_for(root).0,
            cache: RepositoryCache::new(settings.repo_config(root)),
            reconciler: FileReconciler::from_settings(root, &settings),
            engine: ContributionEngine::from_settings(root, &settings),
            settings,
            notifier,
        }
    }

    /// Replace the contribution engine built from settings.
    pub fn with_engine(mut self, engine: ContributionEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Read `.leysync.yaml` and report through `tracing`.
    pub fn load(root: &Path) -> Result<Self, SettingsError> {
        let settings = settings::load(root)?;
        let notifier = Arc::new(TracingNotifier::new(
            registry::workspace_name_for(root).0,
        ));
        Ok(Self::new(root, settings, notifier))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &RepositoryCache {
        &self.cache
    }

    pub fn engine(&self) -> &ContributionEngine {
        &self.engine
    }

    pub fn notifier(&self) -> &dyn Notifier {
        &*self.notifier
    }

    /// Workspace-relative shared files that differ from the cache as it is
    /// now. Empty when the cache is absent.
    pub fn local_edits(&self) -> Vec<PathBuf> {
        if !self.cache.is_present() {
            return Vec::new();
        }
        match self.engine.local_edits() {
            Ok(changes) => changes
                .iter()
                .map(|rel| Path::new(SHARED_SUBTREE).join(rel))
                .collect(),
            Err(err) => {
                warn!(error = %err, "could not scan shared subtree for local edits");
                Vec::new()
            }
        }
    }

    /// Reconcile without overwriting `local_edits`.
    pub fn reconcile(&self, local_edits: Vec<PathBuf>, reporting: Reporting) -> ReconcileReport {
        let toggles = self.settings.agentic.toggles();
        self.reconciler
            .clone()
            .with_preserved(local_edits)
            .reconcile_and_notify(&toggles, self.notifier(), reporting)
    }

    fn cycle(
        &self,
        kind: CycleKind,
        on_state: &dyn Fn(SchedulerState),
    ) -> Result<CycleReport, CycleError> {
        on_state(SchedulerState::Checking);
        // Taken before any refresh, so upstream changes never look local.
        let local_edits = self.local_edits();

        if kind == CycleKind::Reconcile {
            if !self.cache.is_present() {
                debug!("cache absent; nothing to redeploy");
                return Ok(CycleReport::new(kind, CacheAction::Skipped));
            }
            let report = self.reconcile(local_edits, Reporting::Summary);
            return Ok(CycleReport::new(kind, CacheAction::Unchanged).with_reconcile(&report));
        }

        let (action, reporting) = if !self.cache.is_present() {
            on_state(SchedulerState::Cloning);
            self.notifier.info("Cloning template repository...");
            self.cache.clone_remote()?;
            on_state(SchedulerState::Initializing);
            (CacheAction::Cloned, Reporting::Summary)
        } else if kind == CycleKind::Forced {
            on_state(SchedulerState::Updating);
            let action = match self.cache.refresh()? {
                RefreshOutcome::Updated => CacheAction::Refreshed,
                RefreshOutcome::Unchanged => CacheAction::Unchanged,
            };
            (action, Reporting::Summary)
        } else if self.cache.has_remote_changes()? {
            on_state(SchedulerState::Updating);
            self.notifier.info("Template updates available. Updating...");
            self.cache.refresh()?;
            (CacheAction::Refreshed, Reporting::Summary)
        } else {
            (CacheAction::Unchanged, Reporting::Silent)
        };

        let reconciled = self.reconcile(local_edits, reporting);
        let contribution = self.engine.check_and_contribute(self.notifier())?;

        if kind == CycleKind::Forced {
            self.notifier.info("Force update completed!");
        }
        Ok(CycleReport::new(kind, action)
            .with_reconcile(&reconciled)
            .with_contribution(&contribution))
    }
}

impl CycleRunner for WorkspaceContext {
    fn period(&self) -> Option<Duration> {
        self.settings.update.period()
    }

    /// The contribution engine reports its own failures; cache failures are
    /// reported here.
    #[instrument(skip_all, fields(workspace = %self.name, kind = ?kind))]
    fn run_cycle(
        &self,
        kind: CycleKind,
        on_state: &dyn Fn(SchedulerState),
    ) -> Result<CycleReport, CycleError> {
        let result = self.cycle(kind, on_state);
        if let Err(CycleError::Cache(err)) = &result {
            self.notifier.error(&format!("Template update failed: {err}"));
        }
        result
    }
}
