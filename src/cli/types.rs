//! Top-level CLI argument types.

use clap::{Parser, Subcommand};

use crate::cli::commands::{project, run};

#[derive(Parser)]
#[command(name = "forge")]
#[command(about = "Parallel execution engine for dependency-batched, worktree-isolated code agent orchestration", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Project management commands
    #[command(subcommand)]
    Project(project::ProjectCommands),

    /// Build an execution plan from a project's pending tasks
    Plan {
        /// Project name
        project: String,
    },

    /// Run the execution plan (sequential or parallel) to completion
    Run(run::RunArgs),

    /// Show project status: epics, tasks, worktrees, budget
    Status {
        /// Project name
        project: String,
    },

    /// Request a running execution to stop after its current batch
    Stop {
        /// Project name
        project: String,
    },

    /// Reap stale sessions whose heartbeat has expired
    Reap,
}
