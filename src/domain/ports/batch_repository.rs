//! Execution plan / batch persistence port.
//!
//! A plan is stored as a single JSON blob inside `projects.metadata` (see
//! [`crate::domain::models::Project::set_execution_plan`]); this port covers
//! the per-batch status transitions the Parallel Executor writes back as a
//! batch starts and finishes, without requiring a read-modify-write of the
//! whole plan on every caller.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{BatchStatus, ExecutionPlan};

#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn save_plan(&self, project_id: Uuid, plan: &ExecutionPlan) -> DomainResult<()>;
    async fn load_plan(&self, project_id: Uuid) -> DomainResult<Option<ExecutionPlan>>;
    async fn set_batch_status(
        &self,
        project_id: Uuid,
        batch_id: u32,
        status: BatchStatus,
    ) -> DomainResult<()>;
}
