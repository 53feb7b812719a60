//! Parallel Executor: dispatches a batch's tasks across a bounded worker
//! pool, each task isolated to its epic's worktree. Grounded on
//! `dag_executor.rs`'s `execute_wave` — `Arc<Semaphore>`, `acquire_owned`,
//! one `tokio::spawn` per task, ordered `JoinHandle` collection — but makes
//! the spec's four-point cancellation enumeration explicit rather than a
//! single flag flip.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Epic, Session, SessionKind, Task};
use crate::domain::ports::{AgentRuntime, CostRepository, SessionRepository, TaskRepository, TestRepository};
use crate::services::cost_ledger::estimate_cost_cents;
use crate::services::expertise_store::ExpertiseStore;
use crate::services::model_selector::ModelSelector;
use crate::services::worktree_manager::WorktreeManager;

/// Outcome of one task's execution, the unit the Merge Validator and Batch
/// Executor aggregate over.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub task_id: Uuid,
    pub success: bool,
    pub duration: Duration,
    pub error: Option<String>,
    pub cost_cents: i64,
}

pub struct ParallelExecutor {
    task_repo: Arc<dyn TaskRepository>,
    session_repo: Arc<dyn SessionRepository>,
    cost_repo: Arc<dyn CostRepository>,
    test_repo: Arc<dyn TestRepository>,
    worktrees: Arc<WorktreeManager>,
    model_selector: Arc<ModelSelector>,
    expertise: Arc<ExpertiseStore>,
    agent: Arc<dyn AgentRuntime>,
    max_concurrency: usize,
}

impl ParallelExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        session_repo: Arc<dyn SessionRepository>,
        cost_repo: Arc<dyn CostRepository>,
        test_repo: Arc<dyn TestRepository>,
        worktrees: Arc<WorktreeManager>,
        model_selector: Arc<ModelSelector>,
        expertise: Arc<ExpertiseStore>,
        agent: Arc<dyn AgentRuntime>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            task_repo,
            session_repo,
            cost_repo,
            test_repo,
            worktrees,
            model_selector,
            expertise,
            agent,
            max_concurrency,
        }
    }

    /// Run every task in `tasks` (already resolved from a batch's task ids)
    /// under a shared concurrency permit; one session per task. Peers are
    /// never cancelled by a sibling's failure — the batch-level decision of
    /// whether to proceed belongs to the Batch Executor.
    #[instrument(skip(self, tasks, epic, cancel))]
    pub async fn execute_batch(
        &self,
        project_id: Uuid,
        epic: &Epic,
        tasks: Vec<Task>,
        budget_remaining_cents: i64,
        budget_total_cents: i64,
        cancel: CancellationToken,
    ) -> DomainResult<Vec<ExecutionResult>> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency.max(1)));
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            if cancel.is_cancelled() {
                break;
            }

            // Suspension point (a): semaphore acquire.
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            if cancel.is_cancelled() {
                drop(permit);
                break;
            }

            let project_id = project_id;
            let epic = epic.clone();
            let task_repo = self.task_repo.clone();
            let session_repo = self.session_repo.clone();
            let cost_repo = self.cost_repo.clone();
            let test_repo = self.test_repo.clone();
            let worktrees = self.worktrees.clone();
            let model_selector = self.model_selector.clone();
            let expertise = self.expertise.clone();
            let agent = self.agent.clone();
            let cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                run_one_task(
                    project_id,
                    &epic,
                    task,
                    task_repo,
                    session_repo,
                    cost_repo,
                    test_repo,
                    worktrees,
                    model_selector,
                    expertise,
                    agent,
                    budget_remaining_cents,
                    budget_total_cents,
                    cancel,
                )
                .await
            });

            handles.push(handle);
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(join_err) => {
                    warn!(error = %join_err, "task worker panicked");
                }
            }
        }
        Ok(results)
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_one_task(
    project_id: Uuid,
    epic: &Epic,
    task: Task,
    task_repo: Arc<dyn TaskRepository>,
    session_repo: Arc<dyn SessionRepository>,
    cost_repo: Arc<dyn CostRepository>,
    test_repo: Arc<dyn TestRepository>,
    worktrees: Arc<WorktreeManager>,
    model_selector: Arc<ModelSelector>,
    expertise: Arc<ExpertiseStore>,
    agent: Arc<dyn AgentRuntime>,
    budget_remaining_cents: i64,
    budget_total_cents: i64,
    cancel: CancellationToken,
) -> ExecutionResult {
    let started = Instant::now();
    let task_id = task.id;

    match run_one_task_inner(
        project_id,
        epic,
        &task,
        task_repo,
        session_repo,
        cost_repo,
        test_repo,
        worktrees,
        model_selector,
        expertise,
        agent,
        budget_remaining_cents,
        budget_total_cents,
        cancel,
    )
    .await
    {
        Ok(cost_cents) => ExecutionResult {
            task_id,
            success: true,
            duration: started.elapsed(),
            error: None,
            cost_cents,
        },
        Err(err) => ExecutionResult {
            task_id,
            success: false,
            duration: started.elapsed(),
            error: Some(err.to_string()),
            cost_cents: 0,
        },
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_one_task_inner(
    project_id: Uuid,
    epic: &Epic,
    task: &Task,
    task_repo: Arc<dyn TaskRepository>,
    session_repo: Arc<dyn SessionRepository>,
    cost_repo: Arc<dyn CostRepository>,
    test_repo: Arc<dyn TestRepository>,
    worktrees: Arc<WorktreeManager>,
    model_selector: Arc<ModelSelector>,
    expertise: Arc<ExpertiseStore>,
    agent: Arc<dyn AgentRuntime>,
    budget_remaining_cents: i64,
    budget_total_cents: i64,
    cancel: CancellationToken,
) -> DomainResult<i64> {
    if cancel.is_cancelled() {
        return Err(crate::domain::errors::DomainError::ValidationFailed(
            "cancelled before dispatch".to_string(),
        ));
    }

    let worktree = worktrees.create(project_id, epic.id, &epic.name).await?;
    let worktree_path = PathBuf::from(&worktree.path);

    let selection = model_selector
        .recommend(task, budget_remaining_cents, budget_total_cents)
        .await;

    let sequence = session_repo.next_sequence(project_id).await?;
    let mut session = Session::new(project_id, sequence, SessionKind::Coding, selection.tier.as_str());
    session_repo.create(&session).await?;
    session.start();
    session_repo.update(&session).await?;

    // Suspension point (b)/(c): agent callable observes cancellation itself.
    if cancel.is_cancelled() {
        session.interrupt("cancelled before agent dispatch".to_string());
        session_repo.update(&session).await?;
        return Err(crate::domain::errors::DomainError::ValidationFailed(
            "cancelled before agent dispatch".to_string(),
        ));
    }

    let prompt_context = expertise.get(project_id, task).await?;

    let outcome = agent
        .run(
            worktree_path,
            task.id,
            task.combined_text(),
            prompt_context,
            selection.tier,
            cancel.clone(),
        )
        .await;

    // Suspension point (d): after the agent returns, before recording state.
    let outcome = outcome?;

    session.heartbeat();
    let estimated = estimate_cost_cents(selection.tier, outcome.input_tokens, outcome.output_tokens);
    let cost_cents = if outcome.cost_cents > 0 { outcome.cost_cents } else { estimated };

    let cost = crate::domain::models::AgentCost::new(
        project_id,
        Some(session.id),
        Some(task.id),
        selection.tier.as_str(),
        outcome.input_tokens,
        outcome.output_tokens,
        cost_cents,
    );
    cost_repo.record(&cost).await?;

    expertise
        .observe(project_id, task, &outcome.touched_files, &outcome.tool_log, outcome.success)
        .await?;

    // The agent callable is a black box (no per-test granularity crosses
    // that boundary), so every test attached to this task inherits the
    // task-level outcome rather than an individually observed result.
    for test in test_repo.list_for_task(task.id).await? {
        test_repo
            .record_result(test.id, outcome.success, serde_json::json!({ "session_id": session.id, "summary": &outcome.summary }))
            .await?;
    }

    if outcome.success {
        let mut updated_task = task.clone();
        updated_task.mark_done();
        task_repo.update(&updated_task).await?;
        session.complete();
        session_repo.update(&session).await?;
        info!(task_id = %task.id, cost_cents, "task completed");
        Ok(cost_cents)
    } else {
        session.fail(outcome.summary.clone());
        session_repo.update(&session).await?;
        Err(crate::domain::errors::DomainError::AgentFailed {
            task_id: task.id,
            message: outcome.summary,
        })
    }
}
