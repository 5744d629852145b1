//! leysync — keeps AI-assistant configuration in sync with a template repository.
//!
//! # Usage
//!
//! ```text
//! leysync init [<path>]
//! leysync list
//! leysync sync [<path>]
//! leysync update [<path>]
//! leysync contribute [<path>]
//! leysync status [<path>] [--json]
//! leysync daemon start|stop|status|update [<path>]
//! ```

mod commands;
mod console;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    contribute::ContributeArgs, daemon::DaemonCommand, init::InitArgs, status::StatusArgs,
    sync::SyncArgs, update::UpdateArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "leysync",
    version,
    about = "Sync AI-assistant configuration from a shared template repository",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a workspace and write its default settings file.
    Init(InitArgs),

    /// List registered workspaces.
    List,

    /// Redeploy from the local template cache without touching the network.
    Sync(SyncArgs),

    /// Refresh the template cache, redeploy, and contribute shared edits.
    Update(UpdateArgs),

    /// Contribute edits under .ai-ley/shared back to the template repository.
    Contribute(ContributeArgs),

    /// Show cache and contribution state for workspaces.
    Status(StatusArgs),

    /// Run or control the background scheduler.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::List => commands::list::run(),
        Commands::Sync(args) => args.run(),
        Commands::Update(args) => args.run(),
        Commands::Contribute(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}
