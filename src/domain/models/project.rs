//! Project domain model.
//!
//! A project owns every epic, task, session, worktree and cost row beneath
//! it; deleting a project cascades to all of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::execution_plan::ExecutionPlan;

/// Per-project execution style, derived from the plan by
/// [`crate::services::mode::select_mode`] and persisted explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sequential" => Some(Self::Sequential),
            "parallel" => Some(Self::Parallel),
            _ => None,
        }
    }
}

/// A project: the root of ownership for epics, tasks, sessions, worktrees
/// and costs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub working_dir: PathBuf,
    /// Free-form metadata. Stores the persisted execution plan under key
    /// `execution_plan` and the stop-request hint under
    /// `parallel_stop_requested`, per the wire format in the external
    /// interfaces contract.
    pub metadata: serde_json::Value,
    pub execution_mode: Option<ExecutionMode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            working_dir: working_dir.into(),
            metadata: serde_json::json!({}),
            execution_mode: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Read the persisted execution plan out of metadata, if any.
    pub fn execution_plan(&self) -> Option<ExecutionPlan> {
        self.metadata
            .get("execution_plan")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Persist an execution plan into metadata and stamp `updated_at`.
    pub fn set_execution_plan(&mut self, plan: &ExecutionPlan) {
        let value = serde_json::to_value(plan).expect("ExecutionPlan is always serializable");
        match self.metadata.as_object_mut() {
            Some(map) => {
                map.insert("execution_plan".to_string(), value);
            }
            None => {
                self.metadata = serde_json::json!({ "execution_plan": value });
            }
        }
        self.updated_at = Utc::now();
    }

    pub fn stop_requested(&self) -> bool {
        self.metadata
            .get("parallel_stop_requested")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn set_stop_requested(&mut self, requested: bool) {
        match self.metadata.as_object_mut() {
            Some(map) => {
                map.insert(
                    "parallel_stop_requested".to_string(),
                    serde_json::Value::Bool(requested),
                );
            }
            None => {
                self.metadata = serde_json::json!({ "parallel_stop_requested": requested });
            }
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::execution_plan::{Batch, ExecutionPlan};

    #[test]
    fn plan_round_trips_through_project_metadata() {
        let mut project = Project::new("demo", "/tmp/demo");
        let plan = ExecutionPlan::new(
            project.id,
            vec![Batch::new(0, vec![Uuid::new_v4()], false, vec![])],
            Default::default(),
            vec![],
        );

        project.set_execution_plan(&plan);
        let round_tripped = project.execution_plan().expect("plan persisted");
        assert_eq!(round_tripped.project_id, plan.project_id);
        assert_eq!(round_tripped.batches.len(), 1);
    }

    #[test]
    fn stop_request_defaults_to_false() {
        let project = Project::new("demo", "/tmp/demo");
        assert!(!project.stop_requested());
    }
}
