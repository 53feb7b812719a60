//! Epic repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Epic;

#[async_trait]
pub trait EpicRepository: Send + Sync {
    async fn create(&self, epic: &Epic) -> DomainResult<()>;
    async fn get(&self, id: Uuid) -> DomainResult<Option<Epic>>;
    async fn update(&self, epic: &Epic) -> DomainResult<()>;
    async fn delete(&self, id: Uuid) -> DomainResult<()>;
    async fn list_for_project(&self, project_id: Uuid) -> DomainResult<Vec<Epic>>;
}
