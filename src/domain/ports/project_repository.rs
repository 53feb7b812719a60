//! Project repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Project;

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, project: &Project) -> DomainResult<()>;
    async fn get(&self, id: Uuid) -> DomainResult<Option<Project>>;
    async fn update(&self, project: &Project) -> DomainResult<()>;
    async fn delete(&self, id: Uuid) -> DomainResult<()>;
    async fn list(&self) -> DomainResult<Vec<Project>>;
    async fn get_by_name(&self, name: &str) -> DomainResult<Option<Project>>;
}
