//! Domain models.
//!
//! Pure entities for the parallel execution engine, framework-agnostic and
//! free of infrastructure concerns.

pub mod agent_cost;
pub mod epic;
pub mod execution_plan;
pub mod expertise;
pub mod project;
pub mod session;
pub mod task;
pub mod test_case;
pub mod worktree;

pub use agent_cost::AgentCost;
pub use epic::Epic;
pub use execution_plan::{Batch, BatchStatus, ConflictKind, ExecutionPlan, PlanValidation, PredictedConflict};
pub use expertise::{ExpertiseDomain, ExpertiseRecord};
pub use project::{ExecutionMode, Project};
pub use session::{Session, SessionKind, SessionStatus};
pub use task::{Dependency, DependencyKind, Task};
pub use test_case::TestCase;
pub use worktree::{Worktree, WorktreeStatus};
