//! Domain errors for the parallel execution engine.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors. Budget exhaustion and cancellation are deliberately
/// not represented here: both are ordinary return values, not failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("epic not found: {0}")]
    EpicNotFound(Uuid),

    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("worktree not found for epic: {0}")]
    WorktreeNotFound(Uuid),

    #[error("dependency cycle detected, involving task: {0}")]
    CycleDetected(Uuid),

    #[error("task {task} references dangling dependency {missing}")]
    DanglingDependency { task: Uuid, missing: Uuid },

    #[error("empty execution plan: no tasks to schedule")]
    EmptyPlan,

    #[error("vcs command `{command}` failed with exit code {exit_code:?}: {stderr}")]
    VcsCommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("vcs command `{command}` timed out after {timeout_secs}s")]
    VcsTimeout { command: String, timeout_secs: u64 },

    #[error("merge conflict on branch {branch}: {conflicted_files:?}")]
    VcsConflict {
        branch: String,
        conflicted_files: Vec<String>,
    },

    #[error("agent run failed for task {task_id}: {message}")]
    AgentFailed { task_id: Uuid, message: String },

    #[error("test command failed: {0}")]
    TestFailed(String),

    #[error("test command timed out after {0}s")]
    TestTimeout(u64),

    #[error("stale session {session_id} reaped: {reason}")]
    StaleSession { session_id: Uuid, reason: String },

    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}
