//! Fixed workspace layout: where each managed artifact lives relative to the
//! workspace root (or the cache root, which mirrors the same layout).

/// Core bundle directory. Deployed unconditionally and never removed.
pub const CORE_BUNDLE_DIR: &str = ".ai-ley";

/// Shared subtree, relative to both the workspace and the cache root.
/// Local edits here are contributed back upstream.
pub const SHARED_SUBTREE: &str = ".ai-ley/shared";

/// Permanent local archive of contributed files, relative to the workspace.
pub const ARCHIVE_DIR: &str = ".my/shared";

/// Per-workspace settings file.
pub const SETTINGS_FILE: &str = ".leysync.yaml";

/// Version-control ignore file that receives the managed block.
pub const GITIGNORE_FILE: &str = ".gitignore";

/// Pushed contribution branches still waiting for a pull request.
pub const PENDING_PROPOSALS_FILE: &str = ".my/pending-proposals.yaml";
