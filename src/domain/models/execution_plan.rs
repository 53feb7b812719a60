//! Execution plan domain model: the immutable output of the Plan Builder.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// A set of tasks that may run concurrently (if `can_parallel`);
/// consecutive batches are strictly sequenced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: u32,
    pub task_ids: Vec<Uuid>,
    pub can_parallel: bool,
    pub depends_on: Vec<u32>,
    #[serde(default)]
    pub status: BatchStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for BatchStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl Batch {
    pub fn new(batch_id: u32, task_ids: Vec<Uuid>, can_parallel: bool, depends_on: Vec<u32>) -> Self {
        Self {
            batch_id,
            task_ids,
            can_parallel,
            depends_on,
            status: BatchStatus::Pending,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self) {
        self.status = BatchStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn complete(&mut self, status: BatchStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    SameFile,
    SameDirectory,
    Potential,
}

/// A static, text-based suspicion that two or more tasks will touch the
/// same path. Downgrades parallelism; never a correctness mechanism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictedConflict {
    pub task_ids: Vec<Uuid>,
    pub predicted_files: Vec<String>,
    pub conflict_type: ConflictKind,
}

impl PredictedConflict {
    /// Whether every task in `batch` participates in this conflict — the
    /// condition that forces a batch to run sequentially.
    pub fn is_subset_of(&self, batch_task_ids: &[Uuid]) -> bool {
        self.task_ids.iter().all(|id| batch_task_ids.contains(id))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub total_tasks: usize,
    pub parallel_possible: usize,
    pub conflicts_detected: usize,
}

/// Immutable per computation. Stored inside project metadata under key
/// `execution_plan`, in the JSON shape fixed by the external interfaces
/// contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub project_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub batches: Vec<Batch>,
    pub worktree_assignments: HashMap<Uuid, String>,
    pub predicted_conflicts: Vec<PredictedConflict>,
    pub metadata: PlanMetadata,
}

impl ExecutionPlan {
    pub fn new(
        project_id: Uuid,
        batches: Vec<Batch>,
        worktree_assignments: HashMap<Uuid, String>,
        predicted_conflicts: Vec<PredictedConflict>,
    ) -> Self {
        let total_tasks = batches.iter().map(|b| b.task_ids.len()).sum();
        let parallel_possible = batches.iter().filter(|b| b.can_parallel).count();
        let conflicts_detected = predicted_conflicts.len();
        Self {
            project_id,
            created_at: Utc::now(),
            batches,
            worktree_assignments,
            predicted_conflicts,
            metadata: PlanMetadata {
                total_tasks,
                parallel_possible,
                conflicts_detected,
            },
        }
    }

    /// Flattened task order across all batches, in batch order.
    pub fn flat_order(&self) -> Vec<Uuid> {
        self.batches.iter().flat_map(|b| b.task_ids.clone()).collect()
    }

    /// The batch index a task belongs to, if any.
    pub fn batch_index_of(&self, task_id: Uuid) -> Option<u32> {
        self.batches
            .iter()
            .find(|b| b.task_ids.contains(&task_id))
            .map(|b| b.batch_id)
    }

    /// Empty batches, tasks missing from `worktree_assignments`, and a
    /// conflict-rate warning, per the plan validator of spec §4.2.
    pub fn validate(&self) -> PlanValidation {
        let mut errors = Vec::new();
        for batch in &self.batches {
            if batch.task_ids.is_empty() {
                errors.push(format!("batch {} is empty", batch.batch_id));
            }
            for task_id in &batch.task_ids {
                if !self.worktree_assignments.contains_key(task_id) {
                    errors.push(format!("task {task_id} missing worktree assignment"));
                }
            }
        }

        let total = self.metadata.total_tasks.max(1);
        let conflict_rate = self.metadata.conflicts_detected as f64 / total as f64;
        let high_conflict_rate_warning = conflict_rate > 0.5;

        PlanValidation {
            errors,
            high_conflict_rate_warning,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanValidation {
    pub errors: Vec<String>,
    pub high_conflict_rate_warning: bool,
}

impl PlanValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_round_trips_through_json() {
        let mut assignments = HashMap::new();
        let task = Uuid::new_v4();
        assignments.insert(task, "worktree-default".to_string());

        let plan = ExecutionPlan::new(
            Uuid::new_v4(),
            vec![Batch::new(0, vec![task], false, vec![])],
            assignments,
            vec![],
        );

        let json = serde_json::to_string(&plan).unwrap();
        let round_tripped: ExecutionPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(round_tripped.project_id, plan.project_id);
        assert_eq!(round_tripped.batches.len(), plan.batches.len());
        assert_eq!(round_tripped.worktree_assignments, plan.worktree_assignments);
    }

    #[test]
    fn validate_flags_missing_worktree_assignment() {
        let task = Uuid::new_v4();
        let plan = ExecutionPlan::new(
            Uuid::new_v4(),
            vec![Batch::new(0, vec![task], false, vec![])],
            HashMap::new(),
            vec![],
        );
        let validation = plan.validate();
        assert!(!validation.is_valid());
    }

    #[test]
    fn predicted_conflict_subset_check() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let conflict = PredictedConflict {
            task_ids: vec![a, b],
            predicted_files: vec!["api/main.py".to_string()],
            conflict_type: ConflictKind::SameFile,
        };
        assert!(conflict.is_subset_of(&[a, b]));
        assert!(!conflict.is_subset_of(&[a]));
    }
}
