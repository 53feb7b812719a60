//! Wires the concrete adapters and application services together into one
//! handle the CLI commands operate against. Grounded on
//! `cli::command_dispatcher::CliCommandDispatcher`'s role of owning a pool
//! and building services from it, generalized from a single command bus to
//! the engine's full service graph.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::adapters::agent::MockAgentRuntime;
use crate::adapters::sqlite::{
    initialize_database, SqliteCostRepository, SqliteEpicRepository, SqliteExpertiseRepository,
    SqlitePlanRepository, SqliteProjectRepository, SqliteSessionRepository, SqliteTaskRepository,
    SqliteTestRepository, SqliteWorktreeRepository,
};
use crate::domain::errors::DomainResult;
use crate::domain::ports::{
    AgentRuntime, CostRepository, EpicRepository, PlanRepository, ProjectRepository,
    SessionRepository, TaskRepository, TestRepository, VcsInvoker, WorktreeRepository,
};
use crate::infrastructure::config::Config;
use crate::infrastructure::vcs::GitInvoker;
use crate::services::{
    BudgetTracker, BudgetTrackerConfig, CostLedger, DependencyResolver, ExecutionPlanBuilder,
    ExpertiseStore, HeartbeatReaper, MergeValidator, MergeValidatorConfig, ModelSelector,
    ModelSelectorConfig, ParallelExecutor, WorktreeManager,
};

/// Owns the database pool and every repository/service built on top of it.
/// One instance per CLI invocation.
pub struct ForgeApp {
    pub config: Config,
    pub project_repo: Arc<dyn ProjectRepository>,
    pub epic_repo: Arc<dyn EpicRepository>,
    pub task_repo: Arc<dyn TaskRepository>,
    pub test_repo: Arc<dyn TestRepository>,
    pub session_repo: Arc<dyn SessionRepository>,
    pub worktree_repo: Arc<dyn WorktreeRepository>,
    pub cost_repo: Arc<dyn CostRepository>,
    pub plan_repo: Arc<dyn PlanRepository>,
    pub vcs: Arc<dyn VcsInvoker>,
    pub agent: Arc<dyn AgentRuntime>,
    pub resolver: DependencyResolver,
    pub plan_builder: ExecutionPlanBuilder,
    pub worktree_manager: Arc<WorktreeManager>,
    pub model_selector: Arc<ModelSelector>,
    pub expertise: Arc<ExpertiseStore>,
    pub cost_ledger: Arc<CostLedger>,
    pub budget_tracker: Arc<BudgetTracker>,
    pub parallel_executor: Arc<ParallelExecutor>,
    pub merge_validator: Arc<MergeValidator>,
    pub heartbeat_reaper: Arc<HeartbeatReaper>,
}

impl ForgeApp {
    pub async fn new(config: Config, repo_root: PathBuf) -> DomainResult<Self> {
        let database_url = format!("sqlite:{}", config.database.path);
        let pool = initialize_database(&database_url)
            .await
            .map_err(|e| crate::domain::errors::DomainError::Database(e.to_string()))?;

        Ok(Self::from_pool(config, repo_root, pool))
    }

    /// Build an app over an already-migrated pool (used by tests).
    pub fn from_pool(config: Config, repo_root: PathBuf, pool: SqlitePool) -> Self {
        let project_repo: Arc<dyn ProjectRepository> = Arc::new(SqliteProjectRepository::new(pool.clone()));
        let epic_repo: Arc<dyn EpicRepository> = Arc::new(SqliteEpicRepository::new(pool.clone()));
        let task_repo: Arc<dyn TaskRepository> = Arc::new(SqliteTaskRepository::new(pool.clone()));
        let test_repo: Arc<dyn TestRepository> = Arc::new(SqliteTestRepository::new(pool.clone()));
        let session_repo: Arc<dyn SessionRepository> = Arc::new(SqliteSessionRepository::new(pool.clone()));
        let worktree_repo: Arc<dyn WorktreeRepository> = Arc::new(SqliteWorktreeRepository::new(pool.clone()));
        let cost_repo: Arc<dyn CostRepository> = Arc::new(SqliteCostRepository::new(pool.clone()));
        let expertise_repo = Arc::new(SqliteExpertiseRepository::new(pool.clone()));
        let plan_repo: Arc<dyn PlanRepository> = Arc::new(SqlitePlanRepository::new(pool));

        let vcs: Arc<dyn VcsInvoker> = Arc::new(GitInvoker::new(Duration::from_secs(config.vcs.command_timeout_secs)));
        let agent: Arc<dyn AgentRuntime> = Arc::new(MockAgentRuntime::new());

        let worktree_manager = Arc::new(WorktreeManager::new(worktree_repo.clone(), vcs.clone(), repo_root.clone()));
        let model_selector = Arc::new(ModelSelector::new(ModelSelectorConfig::default()));
        let expertise = Arc::new(ExpertiseStore::new(expertise_repo));
        let cost_ledger = Arc::new(CostLedger::new(cost_repo.clone()));

        let budget_config = BudgetTrackerConfig {
            total_budget_cents: config.budget.total_budget_cents,
            caution_threshold_pct: config.budget.caution_threshold_pct,
            warning_threshold_pct: config.budget.warning_threshold_pct,
            critical_threshold_pct: config.budget.critical_threshold_pct,
            max_concurrency_normal: config.budget.max_concurrency_normal,
            max_concurrency_caution: config.budget.max_concurrency_caution,
            max_concurrency_warning: config.budget.max_concurrency_warning,
            max_concurrency_critical: config.budget.max_concurrency_critical,
        };
        let budget_tracker = Arc::new(BudgetTracker::new(budget_config, cost_repo.clone()));

        let parallel_executor = Arc::new(ParallelExecutor::new(
            task_repo.clone(),
            session_repo.clone(),
            cost_repo.clone(),
            test_repo.clone(),
            worktree_manager.clone(),
            model_selector.clone(),
            expertise.clone(),
            agent.clone(),
            config.max_agents,
        ));

        let merge_validator_config = MergeValidatorConfig {
            main_branch: config.vcs.main_branch.clone(),
            test_command: config.vcs.test_command.clone(),
            test_timeout: Duration::from_secs(config.vcs.test_timeout_secs),
        };
        let merge_validator = Arc::new(MergeValidator::new(vcs.clone(), worktree_repo.clone(), repo_root, merge_validator_config));

        let heartbeat_reaper = Arc::new(HeartbeatReaper::new(session_repo.clone()));

        Self {
            config,
            project_repo,
            epic_repo,
            task_repo,
            test_repo,
            session_repo,
            worktree_repo,
            cost_repo,
            plan_repo,
            vcs,
            agent,
            resolver: DependencyResolver::new(),
            plan_builder: ExecutionPlanBuilder::new(),
            worktree_manager,
            model_selector,
            expertise,
            cost_ledger,
            budget_tracker,
            parallel_executor,
            merge_validator,
            heartbeat_reaper,
        }
    }

    pub fn batch_executor(&self) -> crate::services::BatchExecutor {
        crate::services::BatchExecutor::new(
            self.plan_repo.clone(),
            self.project_repo.clone(),
            self.epic_repo.clone(),
            self.task_repo.clone(),
            self.parallel_executor.clone(),
            self.merge_validator.clone(),
            self.worktree_manager.clone(),
        )
    }
}
