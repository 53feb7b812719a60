//! Worktree repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Worktree, WorktreeStatus};

#[async_trait]
pub trait WorktreeRepository: Send + Sync {
    async fn create(&self, worktree: &Worktree) -> DomainResult<()>;
    async fn get(&self, id: Uuid) -> DomainResult<Option<Worktree>>;
    /// Lookup by the (project, epic) key a worktree is assigned under.
    async fn get_by_epic(&self, project_id: Uuid, epic_id: Uuid) -> DomainResult<Option<Worktree>>;
    async fn update(&self, worktree: &Worktree) -> DomainResult<()>;
    async fn delete(&self, id: Uuid) -> DomainResult<()>;
    async fn list_by_status(&self, status: WorktreeStatus) -> DomainResult<Vec<Worktree>>;
    async fn list_for_project(&self, project_id: Uuid) -> DomainResult<Vec<Worktree>>;
    /// Worktrees in `Merged`/`Conflict` whose cleanup grace period has
    /// elapsed, the input to the worktree reaper sweep.
    async fn list_for_cleanup(&self) -> DomainResult<Vec<Worktree>>;
}
