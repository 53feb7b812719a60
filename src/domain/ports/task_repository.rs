//! Task repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Task;

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub epic_id: Option<Uuid>,
    pub done: Option<bool>,
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: &Task) -> DomainResult<()>;
    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>>;
    async fn update(&self, task: &Task) -> DomainResult<()>;
    async fn delete(&self, id: Uuid) -> DomainResult<()>;
    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>>;
    /// All pending (not-`done`) tasks for a project, across every epic —
    /// the input to the Dependency Resolver and Plan Builder.
    async fn list_pending_for_project(&self, project_id: Uuid) -> DomainResult<Vec<Task>>;
}
