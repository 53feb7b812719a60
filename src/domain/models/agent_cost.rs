//! Agent cost ledger model: an append-only row tying a project (and
//! optionally a session/task) to a model invocation's token counts and
//! cost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCost {
    pub id: Uuid,
    pub project_id: Uuid,
    pub session_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_cents: i64,
    pub recorded_at: DateTime<Utc>,
}

impl AgentCost {
    pub fn new(
        project_id: Uuid,
        session_id: Option<Uuid>,
        task_id: Option<Uuid>,
        model: impl Into<String>,
        input_tokens: i64,
        output_tokens: i64,
        cost_cents: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            session_id,
            task_id,
            model: model.into(),
            input_tokens,
            output_tokens,
            cost_cents,
            recorded_at: Utc::now(),
        }
    }
}
