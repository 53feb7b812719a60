//! Expertise store persistence port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ExpertiseDomain, ExpertiseRecord};

#[async_trait]
pub trait ExpertiseRepository: Send + Sync {
    async fn get(&self, project_id: Uuid, domain: ExpertiseDomain) -> DomainResult<Option<ExpertiseRecord>>;
    async fn upsert(&self, record: &ExpertiseRecord) -> DomainResult<()>;
    async fn list_for_project(&self, project_id: Uuid) -> DomainResult<Vec<ExpertiseRecord>>;
}
