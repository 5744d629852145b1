//! `leysync status` — cache and contribution visibility.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use leysync_core::{registry, settings, NullNotifier};
use leysync_daemon::WorkspaceContext;

use super::resolve_workspace;

/// Arguments for `leysync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// One workspace root. Every registered workspace when omitted.
    pub path: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let roots = match self.path {
            Some(path) => vec![resolve_workspace(Some(path))?],
            None => {
                let home = dirs::home_dir().context("could not determine home directory")?;
                registry::list_at(&home)
                    .context("failed to load workspace registry")?
                    .into_iter()
                    .map(|entry| entry.path)
                    .collect()
            }
        };

        let rows: Vec<WorkspaceStatus> = roots.iter().map(|root| inspect(root)).collect();
        if self.json {
            let payload = StatusReportJson { workspaces: rows };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(rows);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReportJson {
    workspaces: Vec<WorkspaceStatus>,
}

#[derive(Debug, Serialize)]
struct WorkspaceStatus {
    name: String,
    path: String,
    cache_present: bool,
    branch: Option<String>,
    last_commit_at: Option<String>,
    last_commit_age: String,
    /// Files a contribution check would send; `None` without a cache.
    pending_changes: Option<usize>,
    integrations: Vec<String>,
    update_interval_secs: Option<u64>,
    contribute: bool,
    error: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "workspace")]
    name: String,
    #[tabled(rename = "cache")]
    cache: String,
    #[tabled(rename = "template updated")]
    age: String,
    #[tabled(rename = "pending")]
    pending: String,
    #[tabled(rename = "schedule")]
    schedule: String,
}

fn inspect(root: &Path) -> WorkspaceStatus {
    let name = registry::workspace_name_for(root).0;
    let path = root.display().to_string();
    let loaded = match settings::load(root) {
        Ok(loaded) => loaded,
        Err(err) => {
            return WorkspaceStatus {
                name,
                path,
                cache_present: false,
                branch: None,
                last_commit_at: None,
                last_commit_age: "unknown".to_string(),
                pending_changes: None,
                integrations: Vec::new(),
                update_interval_secs: None,
                contribute: false,
                error: Some(err.to_string()),
            };
        }
    };

    let context = WorkspaceContext::new(root, loaded, Arc::new(NullNotifier));
    let cache = context.cache();
    let cache_present = cache.is_present();
    let last_commit = cache.last_commit_time();

    let (pending_changes, error) = if cache_present {
        match context.engine().pending_changes() {
            Ok(changes) => (Some(changes.len()), None),
            Err(err) => (None, Some(err.to_string())),
        }
    } else {
        (None, None)
    };

    let settings = context.settings();
    WorkspaceStatus {
        name,
        path,
        cache_present,
        branch: cache.current_branch(),
        last_commit_at: last_commit.map(|t| t.to_rfc3339()),
        last_commit_age: last_commit
            .map(format_age)
            .unwrap_or_else(|| "never".to_string()),
        pending_changes,
        integrations: settings
            .agentic
            .toggles()
            .enabled()
            .map(|i| i.as_str().to_string())
            .collect(),
        update_interval_secs: settings.update.period().map(|p| p.as_secs()),
        contribute: settings.contribute.enabled,
        error,
    }
}

fn print_table(rows: Vec<WorkspaceStatus>) {
    println!(
        "leysync v{} | {} workspaces",
        env!("CARGO_PKG_VERSION"),
        rows.len()
    );
    if rows.is_empty() {
        println!("No workspaces registered.");
        return;
    }

    let errors: Vec<(String, String)> = rows
        .iter()
        .filter_map(|row| row.error.clone().map(|e| (row.name.clone(), e)))
        .collect();

    let table_rows: Vec<StatusTableRow> = rows
        .into_iter()
        .map(|row| StatusTableRow {
            cache: if row.cache_present {
                "■".green().bold().to_string()
            } else {
                "■".bright_black().bold().to_string()
            },
            age: row.last_commit_age,
            pending: row
                .pending_changes
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            schedule: row
                .update_interval_secs
                .map(format_interval)
                .unwrap_or_else(|| "off".to_string()),
            name: row.name,
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    for (name, error) in errors {
        println!("{} {name}: {error}", "!".red().bold());
    }
}

fn format_age(at: DateTime<Utc>) -> String {
    let secs = (Utc::now() - at).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

fn format_interval(secs: u64) -> String {
    if secs % 86_400 == 0 {
        format!("every {}d", secs / 86_400)
    } else if secs % 3_600 == 0 {
        format!("every {}h", secs / 3_600)
    } else if secs % 60 == 0 {
        format!("every {}m", secs / 60)
    } else {
        format!("every {secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn age_buckets() {
        assert_eq!(format_age(Utc::now()), "just now");
        assert_eq!(format_age(Utc::now() - Duration::minutes(5)), "5m ago");
        assert_eq!(format_age(Utc::now() - Duration::hours(3)), "3h ago");
        assert_eq!(format_age(Utc::now() - Duration::days(2)), "2d ago");
    }

    #[test]
    fn interval_uses_largest_whole_unit() {
        assert_eq!(format_interval(86_400), "every 1d");
        assert_eq!(format_interval(7_200), "every 2h");
        assert_eq!(format_interval(90), "every 90s");
        assert_eq!(format_interval(300), "every 5m");
    }
}
