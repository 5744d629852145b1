//! `leysync list`

use anyhow::{Context, Result};
use tabled::{settings::Style, Table, Tabled};

use leysync_core::registry;

#[derive(Tabled)]
struct WorkspaceRow {
    #[tabled(rename = "workspace")]
    name: String,
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "added")]
    added: String,
}

pub fn run() -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let entries = registry::list_at(&home).context("failed to load workspace registry")?;

    if entries.is_empty() {
        println!("No workspaces registered.");
        println!("Run: leysync init <path>");
        return Ok(());
    }

    let rows: Vec<WorkspaceRow> = entries
        .into_iter()
        .map(|entry| WorkspaceRow {
            name: entry.name.0,
            path: entry.path.display().to_string(),
            added: entry.added_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}
