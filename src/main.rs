//! `forge` binary entry point.

use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;

use forge_engine::app::ForgeApp;
use forge_engine::cli::commands::{plan, project, reap, run, status, stop};
use forge_engine::cli::error::CliError;
use forge_engine::cli::{Cli, Commands};
use forge_engine::infrastructure::config::{ConfigError, ConfigLoader};
use forge_engine::infrastructure::logging::{LoggerError, LoggerImpl};

#[derive(Debug, Error)]
enum MainError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("logger initialization failed: {0}")]
    Logger(#[from] LoggerError),
    #[error(transparent)]
    Cli(#[from] CliError),
    #[error("could not determine current working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run_cli().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run_cli() -> Result<(), MainError> {
    let cli = Cli::parse();

    let config = ConfigLoader::load()?;
    let _logger = LoggerImpl::init(&config.logging)?;

    let repo_root = std::env::current_dir().map_err(MainError::WorkingDir)?;
    let app = ForgeApp::new(config, repo_root).await.map_err(CliError::from)?;

    dispatch(&app, cli).await?;
    Ok(())
}

async fn dispatch(app: &ForgeApp, cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Project(command) => project::run(app, command, cli.json).await,
        Commands::Plan { project } => plan::run(app, project, cli.json).await,
        Commands::Run(args) => run::run(app, args, cli.json).await,
        Commands::Status { project } => status::run(app, project, cli.json).await,
        Commands::Stop { project } => stop::run(app, project, cli.json).await,
        Commands::Reap => reap::run(app, cli.json).await,
    }
}
