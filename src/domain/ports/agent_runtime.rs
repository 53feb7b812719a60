//! Agent runtime port: the boundary between the engine and whatever runs
//! the actual code-generation call for a task.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::errors::DomainResult;

/// Coarse model tier a task is routed to by the Model Selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Cheap,
    Mid,
    Premium,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheap => "cheap",
            Self::Mid => "mid",
            Self::Premium => "premium",
        }
    }
}

/// Result of running one task through an agent.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub success: bool,
    pub summary: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_cents: i64,
    /// Modified file paths, for expertise learning and conflict feedback.
    pub touched_files: Vec<String>,
    /// Raw tool-use log, input to the expertise learner.
    pub tool_log: Vec<String>,
}

#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn run(
        &self,
        working_dir: PathBuf,
        task_id: Uuid,
        task_text: String,
        prompt_context: String,
        model_tier: ModelTier,
        cancel: CancellationToken,
    ) -> DomainResult<AgentOutcome>;
}
