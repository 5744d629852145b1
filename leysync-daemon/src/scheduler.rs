//! Per-workspace cycle scheduling.
//!
//! A [`SyncScheduler`] owns one job queue and one processor task. Timer
//! ticks, forced updates and settings-triggered reconciles all enqueue a
//! [`CycleJob`], and the processor runs them one at a time on the blocking
//! pool, so two cycles for the same workspace never overlap.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use leysync_contrib::ContributionOutcome;
use leysync_sync::ReconcileReport;

use crate::error::{CycleError, DaemonError};

const JOB_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Checking,
    Cloning,
    Updating,
    Initializing,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleKind {
    /// Timer tick or initial cycle: only refresh when the remote moved.
    Scheduled,
    /// Refresh and report even when nothing changed.
    Forced,
    /// Settings changed the toggles; redeploy from the cache, no network.
    Reconcile,
}

/// What a cycle did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheAction {
    Cloned,
    Refreshed,
    Unchanged,
    /// Reconcile-only cycle on a cache that was never cloned.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContributionSummary {
    Disabled,
    NoChanges,
    Pushed {
        branch: String,
        files: usize,
    },
    Proposed {
        branch: String,
        files: usize,
        url: String,
    },
}

impl From<&ContributionOutcome> for ContributionSummary {
    fn from(outcome: &ContributionOutcome) -> Self {
        match outcome {
            ContributionOutcome::Disabled => Self::Disabled,
            ContributionOutcome::NoChanges => Self::NoChanges,
            ContributionOutcome::Pushed { branch, files } => Self::Pushed {
                branch: branch.clone(),
                files: files.len(),
            },
            ContributionOutcome::Proposed { branch, files, url } => Self::Proposed {
                branch: branch.clone(),
                files: files.len(),
                url: url.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub kind: CycleKind,
    pub cache: CacheAction,
    pub updated: usize,
    pub removed: usize,
    pub failures: Vec<String>,
    /// `None` for reconcile-only cycles.
    pub contribution: Option<ContributionSummary>,
}

impl CycleReport {
    pub fn new(kind: CycleKind, cache: CacheAction) -> Self {
        Self {
            kind,
            cache,
            updated: 0,
            removed: 0,
            failures: Vec::new(),
            contribution: None,
        }
    }

    pub fn with_reconcile(mut self, report: &ReconcileReport) -> Self {
        self.updated = report.updated;
        self.removed = report.removed;
        self.failures = report.failures.iter().map(ToString::to_string).collect();
        self
    }

    pub fn with_contribution(mut self, outcome: &ContributionOutcome) -> Self {
        self.contribution = Some(outcome.into());
        self
    }
}

/// One workspace's cycle body. Implemented by
/// [`WorkspaceContext`](crate::context::WorkspaceContext).
pub trait CycleRunner: Send + Sync + 'static {
    /// Timer period; `None` when scheduled updates are switched off.
    fn period(&self) -> Option<Duration>;

    /// Run one blocking cycle, reporting each state it enters.
    fn run_cycle(
        &self,
        kind: CycleKind,
        on_state: &dyn Fn(SchedulerState),
    ) -> Result<CycleReport, CycleError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Finished cycles, successful or not.
    pub cycles: u64,
    pub timer_armed: bool,
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        Self {
            state: SchedulerState::Idle,
            last_cycle_at: None,
            last_error: None,
            cycles: 0,
            timer_armed: false,
        }
    }
}

struct CycleJob {
    kind: CycleKind,
    respond_to: Option<oneshot::Sender<Result<CycleReport, String>>>,
}

/// Cloneable sender side of a scheduler's queue.
#[derive(Clone)]
pub struct SchedulerHandle {
    jobs: mpsc::Sender<CycleJob>,
}

impl SchedulerHandle {
    /// Queue a forced cycle and wait for its result.
    pub async fn force_update(&self) -> Result<CycleReport, DaemonError> {
        let (tx, rx) = oneshot::channel();
        self.jobs
            .send(CycleJob {
                kind: CycleKind::Forced,
                respond_to: Some(tx),
            })
            .await
            .map_err(|_| DaemonError::ChannelClosed("cycle queue"))?;
        let outcome = rx
            .await
            .map_err(|_| DaemonError::ChannelClosed("cycle response"))?;
        outcome.map_err(DaemonError::CycleFailed)
    }

    async fn enqueue(&self, kind: CycleKind) -> Result<(), DaemonError> {
        self.jobs
            .send(CycleJob {
                kind,
                respond_to: None,
            })
            .await
            .map_err(|_| DaemonError::ChannelClosed("cycle queue"))
    }
}

/// Periodic update controller for one workspace.
pub struct SyncScheduler {
    label: String,
    runner: Arc<RwLock<Arc<dyn CycleRunner>>>,
    handle: SchedulerHandle,
    status: Arc<Mutex<SchedulerStatus>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    processor: JoinHandle<()>,
}

impl SyncScheduler {
    /// Spawn the processor task. Must be called inside a tokio runtime.
    /// No cycle runs until [`start`](Self::start) or a forced update.
    pub fn spawn(label: impl Into<String>, runner: Arc<dyn CycleRunner>) -> Self {
        let label = label.into();
        let runner = Arc::new(RwLock::new(runner));
        let status = Arc::new(Mutex::new(SchedulerStatus::default()));
        let (jobs, rx) = mpsc::channel(JOB_QUEUE_DEPTH);

        let processor = tokio::spawn(process_jobs(
            label.clone(),
            runner.clone(),
            status.clone(),
            rx,
        ));

        Self {
            label,
            runner,
            handle: SchedulerHandle { jobs },
            status,
            timer: Mutex::new(None),
            processor,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn status(&self) -> SchedulerStatus {
        lock(&self.status).clone()
    }

    /// Run an initial cycle, then one per period. Returns `false` and leaves
    /// the scheduler stopped when updates are disabled or the interval is
    /// not positive.
    pub async fn start(&self, force_initial: bool) -> bool {
        self.stop();
        let Some(period) = self.runner.read().await.period() else {
            tracing::info!(workspace = %self.label, "scheduled updates disabled");
            return false;
        };

        let kind = if force_initial {
            CycleKind::Forced
        } else {
            CycleKind::Scheduled
        };
        if let Err(err) = self.handle.enqueue(kind).await {
            tracing::error!(workspace = %self.label, error = %err, "could not queue initial cycle");
            return false;
        }

        let handle = self.handle.clone();
        let label = self.label.clone();
        let timer = tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if handle.enqueue(CycleKind::Scheduled).await.is_err() {
                    tracing::debug!(workspace = %label, "cycle queue closed; timer exiting");
                    break;
                }
            }
        });
        *lock(&self.timer) = Some(timer);
        lock(&self.status).timer_armed = true;
        tracing::info!(workspace = %self.label, period_secs = period.as_secs(), "scheduler started");
        true
    }

    /// Cancel future ticks. An in-flight or already-queued cycle still runs.
    /// Idempotent.
    pub fn stop(&self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
            tracing::debug!(workspace = %self.label, "scheduler timer cancelled");
        }
        lock(&self.status).timer_armed = false;
    }

    pub async fn restart(&self) -> bool {
        self.start(false).await
    }

    pub async fn force_update(&self) -> Result<CycleReport, DaemonError> {
        self.handle.force_update().await
    }

    /// Queue a reconcile-only cycle without waiting for it.
    pub async fn reconcile_now(&self) -> Result<(), DaemonError> {
        self.handle.enqueue(CycleKind::Reconcile).await
    }

    /// Swap the cycle body; the next queued cycle uses the new one.
    pub async fn replace_runner(&self, runner: Arc<dyn CycleRunner>) {
        *self.runner.write().await = runner;
    }

    /// Stop the timer, close the queue and wait for the processor to drain.
    pub async fn shutdown(self) {
        self.stop();
        let Self {
            label,
            handle,
            processor,
            ..
        } = self;
        drop(handle);
        if let Err(err) = processor.await {
            if !err.is_cancelled() {
                tracing::error!(workspace = %label, error = %err, "scheduler processor failed");
            }
        }
    }
}

async fn process_jobs(
    label: String,
    runner: Arc<RwLock<Arc<dyn CycleRunner>>>,
    status: Arc<Mutex<SchedulerStatus>>,
    mut jobs: mpsc::Receiver<CycleJob>,
) {
    while let Some(job) = jobs.recv().await {
        let runner = runner.read().await.clone();
        let kind = job.kind;
        let states = status.clone();
        let started = std::time::Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            runner.run_cycle(kind, &|state| lock(&states).state = state)
        })
        .await
        .unwrap_or_else(|err| Err(CycleError::Join(err.to_string())));

        {
            let mut status = lock(&status);
            status.cycles += 1;
            status.last_cycle_at = Some(Utc::now());
            match &result {
                Ok(_) => {
                    status.state = SchedulerState::Idle;
                    status.last_error = None;
                }
                Err(err) => {
                    status.state = SchedulerState::Error;
                    status.last_error = Some(err.to_string());
                }
            }
        }

        match &result {
            Ok(report) => tracing::info!(
                workspace = %label,
                kind = ?report.kind,
                cache = ?report.cache,
                updated = report.updated,
                removed = report.removed,
                duration_ms = started.elapsed().as_millis() as u64,
                "cycle finished",
            ),
            Err(err) => tracing::error!(workspace = %label, kind = ?kind, error = %err, "cycle failed"),
        }

        if let Some(respond_to) = job.respond_to {
            let _ = respond_to.send(result.map_err(|err| err.to_string()));
        }
    }
    tracing::debug!(workspace = %label, "cycle queue closed");
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
