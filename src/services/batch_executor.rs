//! Batch Executor: the top-level loop that walks a plan batch by batch,
//! delegating to the Parallel Executor or a sequential inline-merge path,
//! running the Merge Validator between batches, and emitting progress
//! events. No single teacher file matches this shape; grounded on
//! `swarm_orchestrator.rs`'s plan-walking/progress-event/stop-flag
//! structure and on the batch/stop-request event naming in
//! `original_source/core/parallel/batch_executor.py`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Batch, BatchStatus, ExecutionPlan, Project};
use crate::domain::ports::{EpicRepository, PlanRepository, ProjectRepository, TaskRepository};
use crate::services::merge_validator::{MergeOutcome, MergeValidator};
use crate::services::parallel_executor::{ExecutionResult, ParallelExecutor};
use crate::services::worktree_manager::WorktreeManager;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub event_type: &'static str,
    pub project_id: Uuid,
    pub batch_id: u32,
    pub timestamp: DateTime<Utc>,
    pub detail: serde_json::Value,
}

impl ProgressEvent {
    fn new(event_type: &'static str, project_id: Uuid, batch_id: u32, detail: serde_json::Value) -> Self {
        Self { event_type, project_id, batch_id, timestamp: Utc::now(), detail }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub batch_id: u32,
    pub task_results: Vec<ExecutionResult>,
    pub merge_status: Option<MergeOutcome>,
}

#[derive(Debug, Clone)]
pub struct PlanExecutionReport {
    pub success: bool,
    pub batch_results: Vec<BatchOutcome>,
    pub total_duration: Duration,
    pub total_cost_cents: i64,
    pub batches_completed: usize,
    pub batches_total: usize,
    pub stopped_early: bool,
}

pub struct BatchExecutor {
    plan_repo: Arc<dyn PlanRepository>,
    project_repo: Arc<dyn ProjectRepository>,
    epic_repo: Arc<dyn EpicRepository>,
    task_repo: Arc<dyn TaskRepository>,
    parallel_executor: Arc<ParallelExecutor>,
    merge_validator: Arc<MergeValidator>,
    worktree_manager: Arc<WorktreeManager>,
}

impl BatchExecutor {
    pub fn new(
        plan_repo: Arc<dyn PlanRepository>,
        project_repo: Arc<dyn ProjectRepository>,
        epic_repo: Arc<dyn EpicRepository>,
        task_repo: Arc<dyn TaskRepository>,
        parallel_executor: Arc<ParallelExecutor>,
        merge_validator: Arc<MergeValidator>,
        worktree_manager: Arc<WorktreeManager>,
    ) -> Self {
        Self { plan_repo, project_repo, epic_repo, task_repo, parallel_executor, merge_validator, worktree_manager }
    }

    pub async fn execute_plan(
        &self,
        project: &mut Project,
        plan: &ExecutionPlan,
        progress: Sender<ProgressEvent>,
        cancel: CancellationToken,
        budget_total_cents: i64,
    ) -> DomainResult<PlanExecutionReport> {
        let started = Instant::now();
        let mut batch_results = Vec::with_capacity(plan.batches.len());
        let mut total_cost_cents = 0i64;
        let mut stopped_early = false;
        let mut batches_completed = 0usize;

        for batch in &plan.batches {
            if cancel.is_cancelled() || self.stop_requested(project.id).await? {
                warn!(project_id = %project.id, batch_id = batch.batch_id, "stop requested, halting plan execution");
                stopped_early = true;
                break;
            }

            let _ = progress
                .send(ProgressEvent::new(
                    "batch_started",
                    project.id,
                    batch.batch_id,
                    serde_json::json!({ "task_count": batch.task_ids.len(), "can_parallel": batch.can_parallel }),
                ))
                .await;
            self.plan_repo.set_batch_status(project.id, batch.batch_id, BatchStatus::Running).await?;

            let outcome = self.run_batch(project.id, batch, budget_total_cents, cancel.clone()).await?;

            let batch_failed = outcome.task_results.iter().any(|r| !r.success);
            let merge_failed = matches!(outcome.merge_status, Some(MergeOutcome::Conflicts) | Some(MergeOutcome::TestFailed));
            let final_status = if batch_failed || merge_failed { BatchStatus::Failed } else { BatchStatus::Completed };
            self.plan_repo.set_batch_status(project.id, batch.batch_id, final_status).await?;

            total_cost_cents += outcome.task_results.iter().map(|r| r.cost_cents).sum::<i64>();
            batches_completed += 1;

            let _ = progress
                .send(ProgressEvent::new(
                    "batch_completed",
                    project.id,
                    batch.batch_id,
                    serde_json::json!({
                        "status": format!("{final_status:?}"),
                        "succeeded": outcome.task_results.iter().filter(|r| r.success).count(),
                        "failed": outcome.task_results.iter().filter(|r| !r.success).count(),
                    }),
                ))
                .await;

            let halt = batch_failed || merge_failed;
            batch_results.push(outcome);

            if halt {
                info!(project_id = %project.id, batch_id = batch.batch_id, "batch failed or merge unsuccessful, stopping plan");
                break;
            }
        }

        Ok(PlanExecutionReport {
            success: !stopped_early && batches_completed == plan.batches.len() && batch_results.iter().all(|b| {
                b.task_results.iter().all(|r| r.success) && !matches!(b.merge_status, Some(MergeOutcome::Conflicts) | Some(MergeOutcome::TestFailed))
            }),
            batch_results,
            total_duration: started.elapsed(),
            total_cost_cents,
            batches_completed,
            batches_total: plan.batches.len(),
            stopped_early,
        })
    }

    async fn stop_requested(&self, project_id: Uuid) -> DomainResult<bool> {
        Ok(self.project_repo.get(project_id).await?.map(|p| p.stop_requested()).unwrap_or(false))
    }

    async fn run_batch(
        &self,
        project_id: Uuid,
        batch: &Batch,
        budget_total_cents: i64,
        cancel: CancellationToken,
    ) -> DomainResult<BatchOutcome> {
        let mut tasks_by_epic: HashMap<Uuid, Vec<_>> = HashMap::new();
        for &task_id in &batch.task_ids {
            if let Some(task) = self.task_repo.get(task_id).await? {
                tasks_by_epic.entry(task.epic_id).or_default().push(task);
            }
        }

        let budget_remaining_cents = budget_total_cents;
        let mut epic_futures = Vec::with_capacity(tasks_by_epic.len());
        let mut touched_epic_ids = Vec::with_capacity(tasks_by_epic.len());

        for (epic_id, tasks) in tasks_by_epic {
            touched_epic_ids.push(epic_id);
            let epic_repo = self.epic_repo.clone();
            let executor = self.parallel_executor.clone();
            let cancel = cancel.clone();
            epic_futures.push(async move {
                match epic_repo.get(epic_id).await {
                    Ok(Some(epic)) => {
                        executor
                            .execute_batch(project_id, &epic, tasks, budget_remaining_cents, budget_total_cents, cancel)
                            .await
                    }
                    Ok(None) => Ok(vec![]),
                    Err(err) => Err(err),
                }
            });
        }

        let results: Vec<ExecutionResult> = join_all(epic_futures)
            .await
            .into_iter()
            .collect::<DomainResult<Vec<Vec<ExecutionResult>>>>()?
            .into_iter()
            .flatten()
            .collect();

        let batch_failed = results.iter().any(|r| !r.success);

        // Sequential batches skip merge validation entirely (the agent
        // committed directly; a single-worktree batch merges inline here).
        let merge_status = if !batch_failed && batch.can_parallel {
            let report = self.merge_validator.validate(&touched_epic_ids, project_id).await?;
            Some(report.status)
        } else if !batch_failed {
            let mut inline_conflict = false;
            for epic_id in &touched_epic_ids {
                if let Err(err) = self.worktree_manager.merge(project_id, *epic_id, false).await {
                    warn!(project_id = %project_id, epic_id = %epic_id, error = %err, "inline merge failed for sequential batch");
                    inline_conflict = true;
                }
            }
            if inline_conflict { Some(MergeOutcome::Conflicts) } else { None }
        } else {
            None
        };

        Ok(BatchOutcome { batch_id: batch.batch_id, task_results: results, merge_status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_event_carries_batch_id() {
        let event = ProgressEvent::new("batch_started", Uuid::new_v4(), 3, serde_json::json!({}));
        assert_eq!(event.batch_id, 3);
        assert_eq!(event.event_type, "batch_started");
    }
}
