//! Task domain model.
//!
//! A task belongs to exactly one epic and is the unit the Dependency
//! Resolver batches and the Parallel Executor dispatches to an agent.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `Hard` edges block scheduling; `Soft` edges are informational only and
/// never contribute to in-degree in the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Hard,
    Soft,
}

/// A single task dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub task_id: Uuid,
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn hard(task_id: Uuid) -> Self {
        Self { task_id, kind: DependencyKind::Hard }
    }

    pub fn soft(task_id: Uuid) -> Self {
        Self { task_id, kind: DependencyKind::Soft }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub epic_id: Uuid,
    pub description: String,
    /// Instructions handed to the agent; concatenated with `description`
    /// for conflict prediction and complexity scoring.
    pub action: String,
    pub priority: i32,
    pub done: bool,
    pub depends_on: Vec<Dependency>,
    /// Predicted-file list and optional model override, keyed under
    /// `predicted_files` / `model_override`.
    pub metadata: serde_json::Value,
}

impl Task {
    pub fn new(epic_id: Uuid, description: impl Into<String>, action: impl Into<String>, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            epic_id,
            description: description.into(),
            action: action.into(),
            priority,
            done: false,
            depends_on: Vec::new(),
            metadata: serde_json::json!({}),
        }
    }

    pub fn with_dependency(mut self, task_id: Uuid, kind: DependencyKind) -> Self {
        self.depends_on.push(Dependency { task_id, kind });
        self
    }

    /// Text used for conflict prediction and complexity scoring.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.description, self.action)
    }

    pub fn hard_dependencies(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.depends_on
            .iter()
            .filter(|d| d.kind == DependencyKind::Hard)
            .map(|d| d.task_id)
    }

    pub fn predicted_files(&self) -> Vec<String> {
        self.metadata
            .get("predicted_files")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn set_predicted_files(&mut self, files: Vec<String>) {
        match self.metadata.as_object_mut() {
            Some(map) => {
                map.insert(
                    "predicted_files".to_string(),
                    serde_json::Value::from(files),
                );
            }
            None => {
                self.metadata = serde_json::json!({ "predicted_files": files });
            }
        }
    }

    pub fn model_override(&self) -> Option<String> {
        self.metadata
            .get("model_override")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    pub fn mark_done(&mut self) {
        self.done = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_dependencies_excludes_soft() {
        let epic = Uuid::new_v4();
        let hard_dep = Uuid::new_v4();
        let soft_dep = Uuid::new_v4();
        let task = Task::new(epic, "d", "a", 0)
            .with_dependency(hard_dep, DependencyKind::Hard)
            .with_dependency(soft_dep, DependencyKind::Soft);

        let hard: Vec<_> = task.hard_dependencies().collect();
        assert_eq!(hard, vec![hard_dep]);
    }

    #[test]
    fn predicted_files_round_trip() {
        let mut task = Task::new(Uuid::new_v4(), "d", "a", 0);
        task.set_predicted_files(vec!["src/main.rs".to_string()]);
        assert_eq!(task.predicted_files(), vec!["src/main.rs".to_string()]);
    }
}
