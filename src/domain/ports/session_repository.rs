//! Session repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Session;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> DomainResult<()>;
    async fn get(&self, id: Uuid) -> DomainResult<Option<Session>>;
    async fn update(&self, session: &Session) -> DomainResult<()>;
    /// The single `running` session for a project, if any — at most one
    /// may exist at a time.
    async fn get_running_for_project(&self, project_id: Uuid) -> DomainResult<Option<Session>>;
    /// Every `running` session across all projects, input to the
    /// heartbeat reaper sweep.
    async fn list_running(&self) -> DomainResult<Vec<Session>>;
    /// Next sequence number for a new session in this project.
    async fn next_sequence(&self, project_id: Uuid) -> DomainResult<i64>;
}
