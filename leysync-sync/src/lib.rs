//! # leysync-sync
//!
//! Hash-gated file reconciliation between the template cache and a workspace.
//!
//! Build a [`FileReconciler`] (usually with [`FileReconciler::from_settings`])
//! and call [`FileReconciler::reconcile`] with the workspace's toggles.

pub mod error;
pub mod gitignore;
pub mod hash;
pub mod reconcile;
pub mod rules;
pub mod writer;

pub use error::{ReconcileError, SyncError};
pub use gitignore::ManagedBlock;
pub use hash::FileDigest;
pub use reconcile::{FileReconciler, ReconcileNote, ReconcileReport, Reporting};
pub use rules::DEFAULT_RULES;
pub use writer::{copy_if_changed, CopyResult};
