//! leysync core library — domain types, settings, workspace registry, errors.
//!
//! - [`types`] — newtypes, toggles, mapping rules
//! - [`settings`] — typed `.leysync.yaml` with defaults
//! - [`registry`] — `~/.leysync/workspaces.yaml` load / save / register
//! - [`layout`] — fixed workspace paths
//! - [`notifier`] — the [`Notifier`] message surface
//! - [`error`] — [`RegistryError`], [`SettingsError`]

pub mod error;
pub mod layout;
pub mod notifier;
pub mod registry;
pub mod settings;
pub mod types;

pub use error::{RegistryError, SettingsError};
pub use notifier::{Notifier, NullNotifier, RecordingNotifier};
pub use settings::Settings;
pub use types::{
    FeatureToggleSet, Integration, MappingRule, RepoConfig, RuleKind, WorkspaceEntry,
    WorkspaceIndex, WorkspaceName,
};
