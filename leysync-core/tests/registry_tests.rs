//! Workspace registry and settings integration tests.

use assert_fs::prelude::*;
use leysync_core::{
    registry,
    settings::{self, Settings},
    Integration, RegistryError,
};
use predicates::prelude::predicate;

// ---------------------------------------------------------------------------
// 1. Registry
// ---------------------------------------------------------------------------

#[test]
fn register_writes_index_with_workspace_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let ws = assert_fs::TempDir::new().expect("workspace");

    let entry = registry::register_at(home.path(), ws.path()).expect("register");
    let canonical = std::fs::canonicalize(ws.path()).expect("canonicalize");
    assert_eq!(entry.path, canonical);

    home.child(".leysync/workspaces.yaml")
        .assert(predicate::path::exists())
        .assert(predicate::str::contains(canonical.to_string_lossy().as_ref()));
}

#[test]
fn registered_workspaces_are_sorted_by_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let root = assert_fs::TempDir::new().expect("root");
    let b = root.child("b_app");
    let a = root.child("a_app");
    b.create_dir_all().unwrap();
    a.create_dir_all().unwrap();

    registry::register_at(home.path(), b.path()).unwrap();
    registry::register_at(home.path(), a.path()).unwrap();

    let names: Vec<String> = registry::list_at(home.path())
        .unwrap()
        .into_iter()
        .map(|w| w.name.0)
        .collect();
    assert_eq!(names, vec!["a_app".to_string(), "b_app".to_string()]);
}

#[test]
fn corrupt_index_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".leysync/workspaces.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .unwrap();

    let err = registry::load_at(home.path()).unwrap_err();
    assert!(matches!(err, RegistryError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("workspaces.yaml"));
}

// ---------------------------------------------------------------------------
// 2. Settings
// ---------------------------------------------------------------------------

#[test]
fn settings_toggles_follow_agentic_section() {
    let ws = assert_fs::TempDir::new().expect("workspace");
    ws.child(".leysync.yaml")
        .write_str("agentic:\n  claude: true\n  cursor: false\n  gemini: false\n")
        .unwrap();

    let toggles = settings::load(ws.path()).unwrap().agentic.toggles();
    assert!(toggles.is_enabled(Integration::Claude));
    assert!(!toggles.is_enabled(Integration::Cursor));
    assert!(!toggles.is_enabled(Integration::Gemini));
    assert!(toggles.is_enabled(Integration::Generic));
}

#[test]
fn default_settings_file_round_trips() {
    let ws = assert_fs::TempDir::new().expect("workspace");
    settings::write_default_if_missing(ws.path()).unwrap();
    ws.child(".leysync.yaml")
        .assert(predicate::str::contains("repository:"))
        .assert(predicate::str::contains("agentic:"));
    assert_eq!(settings::load(ws.path()).unwrap(), Settings::default());
}
