//! Per-workspace settings stored in `<workspace>/.leysync.yaml`.
//!
//! Every section is optional. A missing file, a missing section and a missing
//! key all fall back to the defaults below, so a workspace with no settings
//! file at all syncs against the public template repository with every
//! integration enabled.
//!
//! ```yaml
//! repository:
//!   url: https://github.com/armoin2018/ai-ley.git
//!   branch: main
//! cache:
//!   directory: .cache/ai-ley
//! update:
//!   enabled: true
//!   interval: 86400
//! contribute:
//!   enabled: true
//! gitignore:
//!   auto_update: true
//! agentic:
//!   claude: true
//!   cursor: false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::layout::SETTINGS_FILE;
use crate::types::{FeatureToggleSet, Integration, RepoConfig};

pub const DEFAULT_REPOSITORY_URL: &str = "https://github.com/armoin2018/ai-ley.git";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_CACHE_DIRECTORY: &str = ".cache/ai-ley";
pub const DEFAULT_UPDATE_INTERVAL_SECS: i64 = 86_400;
pub const DEFAULT_PROPOSAL_OWNER: &str = "armoin2018";
pub const DEFAULT_PROPOSAL_REPO: &str = "ai-ley";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub repository: RepositorySettings,
    pub cache: CacheSettings,
    pub update: UpdateSettings,
    pub contribute: ContributeSettings,
    pub gitignore: GitignoreSettings,
    pub agentic: AgenticSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySettings {
    pub url: String,
    pub branch: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_REPOSITORY_URL.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Relative paths resolve against the workspace root.
    pub directory: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_CACHE_DIRECTORY),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateSettings {
    pub enabled: bool,
    /// Seconds between scheduled cycles. Zero or negative disables the timer.
    pub interval: i64,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_UPDATE_INTERVAL_SECS,
        }
    }
}

impl UpdateSettings {
    /// The timer period, or `None` when scheduling is switched off.
    pub fn period(&self) -> Option<Duration> {
        if !self.enabled || self.interval <= 0 {
            return None;
        }
        Some(Duration::from_secs(self.interval as u64))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContributeSettings {
    pub enabled: bool,
    /// Owner of the repository that receives merge proposals.
    pub owner: String,
    pub repo: String,
    pub api_base: String,
}

impl Default for ContributeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            owner: DEFAULT_PROPOSAL_OWNER.to_string(),
            repo: DEFAULT_PROPOSAL_REPO.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitignoreSettings {
    pub auto_update: bool,
}

impl Default for GitignoreSettings {
    fn default() -> Self {
        Self { auto_update: true }
    }
}

/// One flag per [`Integration`]. All default to enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgenticSettings {
    pub github_copilot: bool,
    pub claude: bool,
    pub gemini: bool,
    pub cursor: bool,
    pub windsurf: bool,
    pub cline: bool,
    pub roo: bool,
    pub codex: bool,
    pub opencode: bool,
    pub metis: bool,
    pub generic: bool,
}

impl Default for AgenticSettings {
    fn default() -> Self {
        Self {
            github_copilot: true,
            claude: true,
            gemini: true,
            cursor: true,
            windsurf: true,
            cline: true,
            roo: true,
            codex: true,
            opencode: true,
            metis: true,
            generic: true,
        }
    }
}

impl AgenticSettings {
    pub fn get(&self, integration: Integration) -> bool {
        match integration {
            Integration::GithubCopilot => self.github_copilot,
            Integration::Claude => self.claude,
            Integration::Gemini => self.gemini,
            Integration::Cursor => self.cursor,
            Integration::Windsurf => self.windsurf,
            Integration::Cline => self.cline,
            Integration::Roo => self.roo,
            Integration::Codex => self.codex,
            Integration::Opencode => self.opencode,
            Integration::Metis => self.metis,
            Integration::Generic => self.generic,
        }
    }

    pub fn toggles(&self) -> FeatureToggleSet {
        Integration::all()
            .iter()
            .copied()
            .filter(|integration| self.get(*integration))
            .collect()
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.repository.url.trim().is_empty() {
            return Err(SettingsError::Invalid("repository.url must not be empty".into()));
        }
        if self.repository.branch.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "repository.branch must not be empty".into(),
            ));
        }
        if self.cache.directory.as_os_str().is_empty() {
            return Err(SettingsError::Invalid("cache.directory must not be empty".into()));
        }
        Ok(())
    }

    /// Absolute cache path for `workspace_root`.
    pub fn cache_path(&self, workspace_root: &Path) -> PathBuf {
        if self.cache.directory.is_absolute() {
            self.cache.directory.clone()
        } else {
            workspace_root.join(&self.cache.directory)
        }
    }

    pub fn repo_config(&self, workspace_root: &Path) -> RepoConfig {
        RepoConfig {
            url: self.repository.url.clone(),
            branch: self.repository.branch.clone(),
            cache_path: self.cache_path(workspace_root),
        }
    }
}

/// `<workspace>/.leysync.yaml` — pure, no I/O.
pub fn settings_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(SETTINGS_FILE)
}

/// Load settings for a workspace. Missing file ⇒ [`Settings::default`].
pub fn load(workspace_root: &Path) -> Result<Settings, SettingsError> {
    let path = settings_path(workspace_root);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| SettingsError::Io {
        path: path.clone(),
        source,
    })?;
    // An empty file deserializes to `null`, which serde_yaml rejects for a struct.
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings =
        serde_yaml::from_str(&contents).map_err(|source| SettingsError::Parse { path, source })?;
    settings.validate()?;
    Ok(settings)
}

/// Write the default settings file unless one already exists.
///
/// Returns `true` when a file was created.
pub fn write_default_if_missing(workspace_root: &Path) -> Result<bool, SettingsError> {
    let path = settings_path(workspace_root);
    if path.exists() {
        return Ok(false);
    }
    let yaml = serde_yaml::to_string(&Settings::default())?;
    let tmp = path.with_file_name(format!("{SETTINGS_FILE}.tmp"));
    std::fs::write(&tmp, yaml).map_err(|source| SettingsError::Io {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, &path).map_err(|source| SettingsError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let ws = TempDir::new().unwrap();
        let settings = load(ws.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.repository.url, DEFAULT_REPOSITORY_URL);
        assert_eq!(settings.agentic.toggles().enabled().count(), Integration::all().len());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let ws = TempDir::new().unwrap();
        std::fs::write(
            settings_path(ws.path()),
            "agentic:\n  cursor: false\nupdate:\n  interval: 60\n",
        )
        .unwrap();
        let settings = load(ws.path()).unwrap();
        assert!(!settings.agentic.cursor);
        assert!(settings.agentic.claude);
        assert_eq!(settings.update.interval, 60);
        assert!(settings.update.enabled);
        assert_eq!(settings.repository.branch, "main");
    }

    #[test]
    fn empty_file_yields_defaults() {
        let ws = TempDir::new().unwrap();
        std::fs::write(settings_path(ws.path()), "  \n").unwrap();
        assert_eq!(load(ws.path()).unwrap(), Settings::default());
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let ws = TempDir::new().unwrap();
        std::fs::write(settings_path(ws.path()), "update: [not, a, map").unwrap();
        let err = load(ws.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
        assert!(err.to_string().contains(SETTINGS_FILE));
    }

    #[test]
    fn empty_branch_is_rejected() {
        let ws = TempDir::new().unwrap();
        std::fs::write(settings_path(ws.path()), "repository:\n  branch: \"\"\n").unwrap();
        assert!(matches!(load(ws.path()), Err(SettingsError::Invalid(_))));
    }

    #[rstest]
    #[case(true, 3600, Some(3600))]
    #[case(true, 0, None)]
    #[case(true, -5, None)]
    #[case(false, 3600, None)]
    fn update_period(#[case] enabled: bool, #[case] interval: i64, #[case] expected: Option<u64>) {
        let update = UpdateSettings { enabled, interval };
        assert_eq!(update.period(), expected.map(Duration::from_secs));
    }

    #[test]
    fn relative_cache_directory_resolves_under_workspace() {
        let settings = Settings::default();
        let cfg = settings.repo_config(Path::new("/work/app"));
        assert_eq!(cfg.cache_path, PathBuf::from("/work/app/.cache/ai-ley"));
        assert_eq!(cfg.branch, "main");
    }

    #[test]
    fn absolute_cache_directory_is_kept() {
        let mut settings = Settings::default();
        settings.cache.directory = PathBuf::from("/var/cache/ley");
        assert_eq!(
            settings.cache_path(Path::new("/work/app")),
            PathBuf::from("/var/cache/ley")
        );
    }

    #[test]
    fn write_default_is_idempotent() {
        let ws = TempDir::new().unwrap();
        assert!(write_default_if_missing(ws.path()).unwrap());
        assert!(!write_default_if_missing(ws.path()).unwrap());
        assert_eq!(load(ws.path()).unwrap(), Settings::default());
    }
}
