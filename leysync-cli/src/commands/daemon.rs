//! `leysync daemon` — run the background schedulers and talk to them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::{json, Value};

use leysync_daemon::paths::socket_path;
use leysync_daemon::{request_status, request_stop, request_update, start_blocking, DaemonError};

use super::resolve_workspace;

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the daemon in the foreground (schedulers, watcher, socket server).
    Start,
    /// Ask a running daemon to shut down.
    Stop,
    /// Print the running daemon's status as JSON.
    Status,
    /// Force an update of one workspace, or of every attached one.
    Update {
        /// Workspace root. All attached workspaces when omitted.
        path: Option<PathBuf>,

        /// Print the raw JSON reply.
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: DaemonCommand) -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;

    match command {
        DaemonCommand::Start => start_blocking(&home).context("daemon exited with error")?,
        DaemonCommand::Stop => match request_stop(&home) {
            Ok(()) => println!("daemon stop requested"),
            Err(DaemonError::DaemonNotRunning { .. }) => println!("daemon is not running"),
            Err(err) => return Err(err).context("failed to stop daemon"),
        },
        DaemonCommand::Status => {
            let status = match request_status(&home) {
                Ok(status) => status,
                Err(DaemonError::DaemonNotRunning { socket }) => json!({
                    "running": false,
                    "socket": socket.display().to_string(),
                }),
                Err(err) => return Err(err).context("failed to query daemon status"),
            };
            print_json(&status)?;
        }
        DaemonCommand::Update { path, json } => {
            let root = path.map(|p| resolve_workspace(Some(p))).transpose()?;
            let reply = match request_update(&home, root.as_deref()) {
                Ok(reply) => reply,
                Err(DaemonError::DaemonNotRunning { .. }) => anyhow::bail!(
                    "daemon is not running (no socket at {}); use `leysync update` instead",
                    socket_path(&home).display()
                ),
                Err(err) => return Err(err).context("daemon update request failed"),
            };
            if json {
                print_json(&reply)?;
            } else {
                print_update_rows(&reply);
            }
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}

fn print_update_rows(reply: &Value) {
    let Some(rows) = reply["workspaces"].as_array().filter(|rows| !rows.is_empty()) else {
        println!("No workspaces attached to the daemon.");
        return;
    };
    for row in rows {
        let name = row["workspace"].as_str().unwrap_or("?");
        if row["ok"].as_bool() == Some(true) {
            let report = &row["report"];
            println!(
                "{} {name}: {} updated, {} removed",
                "✓".green(),
                report["updated"],
                report["removed"]
            );
        } else {
            let error = row["error"].as_str().unwrap_or("unknown error");
            println!("{} {name}: {error}", "✗".red());
        }
    }
}
