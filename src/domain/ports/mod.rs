//! Domain ports (interfaces) for the parallel execution engine.
//!
//! Services depend on these traits, never on concrete adapters.

pub mod agent_runtime;
pub mod batch_repository;
pub mod cost_repository;
pub mod epic_repository;
pub mod expertise_repository;
pub mod project_repository;
pub mod session_repository;
pub mod task_repository;
pub mod test_repository;
pub mod vcs_invoker;
pub mod worktree_repository;

pub use agent_runtime::{AgentOutcome, AgentRuntime, ModelTier};
pub use batch_repository::PlanRepository;
pub use cost_repository::CostRepository;
pub use epic_repository::EpicRepository;
pub use expertise_repository::ExpertiseRepository;
pub use project_repository::ProjectRepository;
pub use session_repository::SessionRepository;
pub use task_repository::{TaskFilter, TaskRepository};
pub use test_repository::TestRepository;
pub use vcs_invoker::{MergeMode, VcsInvoker, VcsOutput};
pub use worktree_repository::WorktreeRepository;
