//! Domain types shared by every leysync crate.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for a registered workspace (the root folder name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkspaceName(pub String);

impl fmt::Display for WorkspaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for WorkspaceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkspaceName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Integrations and toggles
// ---------------------------------------------------------------------------

/// An agent integration whose files can be switched on or off per workspace.
///
/// The core `.ai-ley` bundle is not an integration: it is always deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integration {
    GithubCopilot,
    Claude,
    Gemini,
    Cursor,
    Windsurf,
    Cline,
    Roo,
    Codex,
    Opencode,
    Metis,
    Generic,
}

impl Integration {
    pub fn all() -> &'static [Integration] {
        &[
            Integration::GithubCopilot,
            Integration::Claude,
            Integration::Gemini,
            Integration::Cursor,
            Integration::Windsurf,
            Integration::Cline,
            Integration::Roo,
            Integration::Codex,
            Integration::Opencode,
            Integration::Metis,
            Integration::Generic,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Integration::GithubCopilot => "github_copilot",
            Integration::Claude => "claude",
            Integration::Gemini => "gemini",
            Integration::Cursor => "cursor",
            Integration::Windsurf => "windsurf",
            Integration::Cline => "cline",
            Integration::Roo => "roo",
            Integration::Codex => "codex",
            Integration::Opencode => "opencode",
            Integration::Metis => "metis",
            Integration::Generic => "generic",
        }
    }
}

impl fmt::Display for Integration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of integrations enabled for one reconciliation pass.
///
/// Built fresh from settings for every call; it has no persisted identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureToggleSet {
    enabled: BTreeSet<Integration>,
}

impl FeatureToggleSet {
    /// Every integration disabled (the core bundle stays on regardless).
    pub fn none() -> Self {
        Self::default()
    }

    /// Every integration enabled.
    pub fn all() -> Self {
        Self {
            enabled: Integration::all().iter().copied().collect(),
        }
    }

    /// Builder-style toggle.
    pub fn with(mut self, integration: Integration, on: bool) -> Self {
        self.set(integration, on);
        self
    }

    pub fn set(&mut self, integration: Integration, on: bool) {
        if on {
            self.enabled.insert(integration);
        } else {
            self.enabled.remove(&integration);
        }
    }

    pub fn is_enabled(&self, integration: Integration) -> bool {
        self.enabled.contains(&integration)
    }

    /// The core bundle toggle. Always on.
    pub fn core_enabled(&self) -> bool {
        true
    }

    pub fn enabled(&self) -> impl Iterator<Item = Integration> + '_ {
        self.enabled.iter().copied()
    }
}

impl FromIterator<Integration> for FeatureToggleSet {
    fn from_iter<T: IntoIterator<Item = Integration>>(iter: T) -> Self {
        Self {
            enabled: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping rules
// ---------------------------------------------------------------------------

/// Whether a mapping rule copies a single file or a whole directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    File,
    Directory,
}

/// A static declaration of which cache artifact maps to which workspace target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingRule {
    /// Relative to the cache repository root.
    pub source: &'static str,
    /// Relative to the workspace root.
    pub target: &'static str,
    pub kind: RuleKind,
    /// `None` marks the protected core bundle: always active, never removed.
    pub requires: Option<Integration>,
}

impl MappingRule {
    pub const fn core(source: &'static str, target: &'static str, kind: RuleKind) -> Self {
        Self {
            source,
            target,
            kind,
            requires: None,
        }
    }

    pub const fn gated(
        source: &'static str,
        target: &'static str,
        kind: RuleKind,
        integration: Integration,
    ) -> Self {
        Self {
            source,
            target,
            kind,
            requires: Some(integration),
        }
    }

    pub fn is_protected(&self) -> bool {
        self.requires.is_none()
    }

    pub fn is_active(&self, toggles: &FeatureToggleSet) -> bool {
        match self.requires {
            None => toggles.core_enabled(),
            Some(integration) => toggles.is_enabled(integration),
        }
    }
}

// ---------------------------------------------------------------------------
// Repository config
// ---------------------------------------------------------------------------

/// Where the template repository lives and where it is mirrored locally.
///
/// Immutable for the lifetime of a repository cache; changing it means
/// building a new cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    pub url: String,
    pub branch: String,
    /// Absolute path of the local mirror.
    pub cache_path: PathBuf,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A workspace registered with leysync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    pub name: WorkspaceName,
    /// Absolute path to the workspace root on disk.
    pub path: PathBuf,
    pub added_at: DateTime<Utc>,
}

/// Root of `~/.leysync/workspaces.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceIndex {
    pub version: u32,
    #[serde(default)]
    pub workspaces: Vec<WorkspaceEntry>,
    pub updated_at: DateTime<Utc>,
}

impl Default for WorkspaceIndex {
    fn default() -> Self {
        Self {
            version: 1,
            workspaces: vec![],
            updated_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
