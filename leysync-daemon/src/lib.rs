//! Background runtime: one [`SyncScheduler`] per registered workspace, a
//! watcher for registry and settings edits, and a Unix-socket control
//! channel.

mod context;
mod error;
pub mod notifier;
pub mod paths;
pub mod protocol;
mod runtime;
pub mod scheduler;

pub use context::WorkspaceContext;
pub use error::{CycleError, DaemonError};
pub use notifier::TracingNotifier;
pub use protocol::{
    request_status, request_stop, request_update, send_request, DaemonRequest, DaemonResponse,
};
pub use runtime::{run, start_blocking, AttachedWorkspace, Workspaces};
pub use scheduler::{
    CacheAction, ContributionSummary, CycleKind, CycleReport, CycleRunner, SchedulerHandle,
    SchedulerState, SchedulerStatus, SyncScheduler,
};
