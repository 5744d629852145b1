use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;

use leysync_core::{registry, settings};
use leysync_repo::test_support::Upstream;
use tempfile::TempDir;

fn leysync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("leysync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("GITHUB_TOKEN");
    cmd
}

/// A workspace pointed at a local upstream, with contribution switched off.
fn workspace_for(upstream: &Upstream, parent: &Path, name: &str) -> PathBuf {
    let root = parent.join(name);
    fs::create_dir_all(&root).expect("create workspace");
    fs::write(
        settings::settings_path(&root),
        format!(
            "repository:\n  url: {}\n  branch: main\ncontribute:\n  enabled: false\nagentic:\n  cursor: false\n",
            upstream.url()
        ),
    )
    .expect("write settings");
    root
}

fn template() -> Upstream {
    Upstream::with_files(&[
        (".ai-ley/personas/dev.md", "dev\n"),
        (".ai-ley/shared/guide.md", "guide\n"),
        ("CLAUDE.md", "claude rules\n"),
        (".cursor/rules/base.mdc", "cursor\n"),
    ])
}

#[test]
fn init_registers_and_writes_default_settings() {
    let home = TempDir::new().expect("home");
    let parent = TempDir::new().expect("parent");
    let ws = parent.path().join("webapp");
    fs::create_dir_all(&ws).expect("create workspace");

    leysync_cmd(home.path())
        .args(["init"])
        .arg(&ws)
        .assert()
        .success()
        .stdout(contains("Registered 'webapp'"))
        .stdout(contains("(created)"));

    leysync_cmd(home.path())
        .args(["init"])
        .arg(&ws)
        .assert()
        .success()
        .stdout(contains("(kept)"));

    assert_eq!(registry::list_at(home.path()).expect("list").len(), 1);
    assert!(settings::settings_path(&ws).exists());

    leysync_cmd(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(contains("webapp"));
}

#[test]
fn list_without_registry_explains_init() {
    let home = TempDir::new().expect("home");
    leysync_cmd(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(contains("No workspaces registered."));
}

#[test]
fn sync_without_cache_points_at_update() {
    let home = TempDir::new().expect("home");
    let parent = TempDir::new().expect("parent");
    let upstream = template();
    let ws = workspace_for(&upstream, parent.path(), "app");

    leysync_cmd(home.path())
        .arg("sync")
        .arg(&ws)
        .assert()
        .failure()
        .stderr(contains("leysync update"));
}

#[test]
fn update_clones_and_deploys_enabled_integrations_only() {
    let home = TempDir::new().expect("home");
    let parent = TempDir::new().expect("parent");
    let upstream = template();
    let ws = workspace_for(&upstream, parent.path(), "app");

    leysync_cmd(home.path())
        .arg("update")
        .arg(&ws)
        .assert()
        .success()
        .stdout(contains("Force update completed!"));

    assert_eq!(
        fs::read_to_string(ws.join("CLAUDE.md")).expect("CLAUDE.md"),
        "claude rules\n"
    );
    assert!(ws.join(".ai-ley/personas/dev.md").exists());
    assert!(!ws.join(".cursor").exists(), "cursor is toggled off");
    assert!(fs::read_to_string(ws.join(".gitignore"))
        .expect(".gitignore")
        .contains(".cache/ai-ley/"));

    leysync_cmd(home.path())
        .arg("sync")
        .arg(&ws)
        .assert()
        .success()
        .stdout(contains("All configurations are up to date."));
}

#[test]
fn status_json_reports_cache_and_pending_changes() {
    let home = TempDir::new().expect("home");
    let parent = TempDir::new().expect("parent");
    let upstream = template();
    let ws = workspace_for(&upstream, parent.path(), "app");
    registry::register_at(home.path(), &ws).expect("register");

    leysync_cmd(home.path())
        .arg("update")
        .arg(&ws)
        .assert()
        .success();
    fs::write(ws.join(".ai-ley/shared/guide.md"), "guide, edited\n").expect("edit shared");

    let assert = leysync_cmd(home.path())
        .args(["status", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    let payload: serde_json::Value = serde_json::from_str(&stdout).expect("parse status json");

    let rows = payload["workspaces"].as_array().expect("workspaces array");
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["name"], "app");
    assert_eq!(row["cache_present"], true);
    assert_eq!(row["branch"], "main");
    assert_eq!(row["pending_changes"], 1);
    assert_eq!(row["contribute"], false);
    assert!(!row["integrations"]
        .as_array()
        .expect("integrations")
        .iter()
        .any(|i| i == "cursor"));
}

#[test]
fn contribute_respects_disabled_setting() {
    let home = TempDir::new().expect("home");
    let parent = TempDir::new().expect("parent");
    let upstream = template();
    let ws = workspace_for(&upstream, parent.path(), "app");

    leysync_cmd(home.path())
        .arg("update")
        .arg(&ws)
        .assert()
        .success();
    fs::write(ws.join(".ai-ley/shared/guide.md"), "guide, edited\n").expect("edit shared");

    leysync_cmd(home.path())
        .args(["contribute", "--dry-run"])
        .arg(&ws)
        .assert()
        .success()
        .stdout(contains("1 file(s) would be contributed"))
        .stdout(contains("guide.md"));

    leysync_cmd(home.path())
        .arg("contribute")
        .arg(&ws)
        .assert()
        .success()
        .stdout(contains("disabled"));
}

#[test]
fn daemon_status_when_not_running() {
    let home = TempDir::new().expect("home");
    let assert = leysync_cmd(home.path())
        .args(["daemon", "status"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    let payload: serde_json::Value = serde_json::from_str(&stdout).expect("parse status json");
    assert_eq!(payload["running"], false);

    leysync_cmd(home.path())
        .args(["daemon", "stop"])
        .assert()
        .success()
        .stdout(contains("daemon is not running"));
}
