//! Deterministic in-memory agent runtime, grounded on
//! `adapters::substrates::mock::MockSubstrate` — same per-task response
//! override table, generalized from a substrate session lifecycle to the
//! engine's single-shot [`AgentOutcome`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::ports::agent_runtime::{AgentOutcome, AgentRuntime, ModelTier};

/// A canned response the mock runtime returns for a task.
#[derive(Debug, Clone)]
pub struct MockOutcome {
    pub success: bool,
    pub summary: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub touched_files: Vec<String>,
}

impl MockOutcome {
    pub fn success(summary: impl Into<String>, touched_files: Vec<String>) -> Self {
        Self { success: true, summary: summary.into(), input_tokens: 500, output_tokens: 200, touched_files }
    }

    pub fn failure(summary: impl Into<String>) -> Self {
        Self { success: false, summary: summary.into(), input_tokens: 200, output_tokens: 50, touched_files: Vec::new() }
    }
}

impl Default for MockOutcome {
    fn default() -> Self {
        Self::success("mock task completed", Vec::new())
    }
}

/// Deterministic runtime for tests and demos: returns a configured outcome
/// per task id, or a default, without shelling out to any real agent.
pub struct MockAgentRuntime {
    default_outcome: MockOutcome,
    overrides: Arc<RwLock<HashMap<Uuid, MockOutcome>>>,
}

impl MockAgentRuntime {
    pub fn new() -> Self {
        Self { default_outcome: MockOutcome::default(), overrides: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn with_default(outcome: MockOutcome) -> Self {
        Self { default_outcome: outcome, overrides: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn set_outcome_for_task(&self, task_id: Uuid, outcome: MockOutcome) {
        self.overrides.write().await.insert(task_id, outcome);
    }
}

impl Default for MockAgentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentRuntime for MockAgentRuntime {
    async fn run(
        &self,
        _working_dir: PathBuf,
        task_id: Uuid,
        _task_text: String,
        _prompt_context: String,
        model_tier: ModelTier,
        cancel: CancellationToken,
    ) -> DomainResult<AgentOutcome> {
        if cancel.is_cancelled() {
            return Ok(AgentOutcome {
                success: false,
                summary: "cancelled before dispatch".to_string(),
                input_tokens: 0,
                output_tokens: 0,
                cost_cents: 0,
                touched_files: Vec::new(),
                tool_log: Vec::new(),
            });
        }

        let outcome = self.overrides.read().await.get(&task_id).cloned().unwrap_or_else(|| self.default_outcome.clone());

        Ok(AgentOutcome {
            success: outcome.success,
            summary: outcome.summary,
            input_tokens: outcome.input_tokens,
            output_tokens: outcome.output_tokens,
            cost_cents: 0,
            touched_files: outcome.touched_files,
            tool_log: vec![format!("ran on tier {}", model_tier.as_str())],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_outcome_succeeds() {
        let runtime = MockAgentRuntime::new();
        let outcome = runtime
            .run(PathBuf::from("/tmp"), Uuid::new_v4(), "do thing".to_string(), String::new(), ModelTier::Cheap, CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn task_specific_override_is_honored() {
        let runtime = MockAgentRuntime::new();
        let task_id = Uuid::new_v4();
        runtime.set_outcome_for_task(task_id, MockOutcome::failure("simulated failure")).await;

        let outcome = runtime
            .run(PathBuf::from("/tmp"), task_id, "do thing".to_string(), String::new(), ModelTier::Mid, CancellationToken::new())
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.summary, "simulated failure");
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let runtime = MockAgentRuntime::new();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = runtime
            .run(PathBuf::from("/tmp"), Uuid::new_v4(), "do thing".to_string(), String::new(), ModelTier::Premium, token)
            .await
            .unwrap();
        assert!(!outcome.success);
    }
}
