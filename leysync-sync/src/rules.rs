//! The fixed mapping-rule table and the directory deny-list.

use leysync_core::layout::CORE_BUNDLE_DIR;
use leysync_core::{Integration, MappingRule, RuleKind};

use RuleKind::{Directory, File};

/// Every artifact leysync deploys, in reporting order. Targets never overlap.
pub const DEFAULT_RULES: &[MappingRule] = &[
    MappingRule::core(CORE_BUNDLE_DIR, CORE_BUNDLE_DIR, Directory),
    MappingRule::gated(
        ".github/copilot-instructions.md",
        ".github/copilot-instructions.md",
        File,
        Integration::GithubCopilot,
    ),
    MappingRule::gated("CLAUDE.md", "CLAUDE.md", File, Integration::Claude),
    MappingRule::gated(".claude", ".claude", Directory, Integration::Claude),
    MappingRule::gated("GEMINI.md", "GEMINI.md", File, Integration::Gemini),
    MappingRule::gated(".gemini", ".gemini", Directory, Integration::Gemini),
    MappingRule::gated(".cursor", ".cursor", Directory, Integration::Cursor),
    MappingRule::gated("cursor-config.json", "cursor-config.json", File, Integration::Cursor),
    MappingRule::gated(".windsurf", ".windsurf", Directory, Integration::Windsurf),
    MappingRule::gated(
        "windsurf-config.json",
        "windsurf-config.json",
        File,
        Integration::Windsurf,
    ),
    MappingRule::gated(".clinerules", ".clinerules", Directory, Integration::Cline),
    MappingRule::gated(".roorules", ".roorules", Directory, Integration::Roo),
    MappingRule::gated(".codex", ".codex", Directory, Integration::Codex),
    MappingRule::gated(".opencode", ".opencode", Directory, Integration::Opencode),
    MappingRule::gated(".metis", ".metis", Directory, Integration::Metis),
    MappingRule::gated("AGENT.md", "AGENT.md", File, Integration::Generic),
    MappingRule::gated("AGENTS.md", "AGENTS.md", File, Integration::Generic),
];

/// Matched anywhere in the path; directories are tested with a trailing `/`.
const DIRECTORY_PATTERNS: &[&str] = &[
    "node_modules/",
    ".next/",
    "dist/",
    "build/",
    ".git/",
    "__pycache__/",
];

const SUFFIX_PATTERNS: &[&str] = &[".DS_Store", ".tmp", ".log", ".env.local", ".env.production"];

const SUBSTRING_PATTERNS: &[&str] = &["package-lock.json", "yarn.lock"];

/// True if `relative` (a path under the cache root) must not be deployed.
pub fn should_skip(relative: &str, is_dir: bool) -> bool {
    let mut normalized = relative.replace('\\', "/");
    if is_dir && !normalized.ends_with('/') {
        normalized.push('/');
    }
    DIRECTORY_PATTERNS.iter().any(|p| normalized.contains(p))
        || SUFFIX_PATTERNS.iter().any(|p| normalized.ends_with(p))
        || SUBSTRING_PATTERNS.iter().any(|p| normalized.contains(p))
}
