//! Agent cost ledger port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::AgentCost;

#[async_trait]
pub trait CostRepository: Send + Sync {
    /// Append a cost row. The ledger is append-only; rows are never updated.
    async fn record(&self, cost: &AgentCost) -> DomainResult<()>;
    /// Sum of `cost_cents` recorded for a project so far, the figure the
    /// budget tracker compares against a project's configured cap.
    async fn total_cost_cents(&self, project_id: Uuid) -> DomainResult<i64>;
    async fn list_for_project(&self, project_id: Uuid) -> DomainResult<Vec<AgentCost>>;
}
