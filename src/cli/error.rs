//! CLI-level error type wrapping every failure mode a command can hit.

use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::infrastructure::config::ConfigError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("project not found: {0}")]
    UnknownProject(String),

    #[error("epic not found: {0}")]
    UnknownEpic(String),

    #[error("task not found: {0}")]
    UnknownTask(String),
}

pub type CliResult<T> = Result<T, CliError>;
