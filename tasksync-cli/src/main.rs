//! Tasksync — three-store task reconciliation CLI.
//!
//! # Usage
//!
//! ```text
//! tasksync sync [--dry-run]
//! tasksync status [--json]
//! tasksync import [--dry-run]
//! ```
//!
//! Configuration comes from the environment: `TASKSYNC_TODO_FILE` (required),
//! `TODOIST_API_TOKEN` (required), `TASKSYNC_TASK_BIN` and
//! `TASKSYNC_TODOIST_URL` (optional overrides).

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{import::ImportArgs, status::StatusArgs, sync::SyncArgs};

#[derive(Parser, Debug)]
#[command(
    name = "tasksync",
    version,
    about = "Reconcile a task list across todo.txt, Taskwarrior and Todoist",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch all three stores, diff against the last snapshot, apply actions.
    Sync(SyncArgs),

    /// Show per-source record counts and the pending plan without applying it.
    Status(StatusArgs),

    /// Copy tasks that exist in only Taskwarrior or only Todoist to the other.
    Import(ImportArgs),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Import(args) => args.run(),
    }
}
