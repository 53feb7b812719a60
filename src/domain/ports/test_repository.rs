//! Per-task Test ("TestCase") persistence port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::TestCase;

#[async_trait]
pub trait TestRepository: Send + Sync {
    async fn create(&self, test: &TestCase) -> DomainResult<()>;
    /// All tests belonging to a task, ordered by category then id, matching
    /// how a task's tests are fetched alongside its execution context.
    async fn list_for_task(&self, task_id: Uuid) -> DomainResult<Vec<TestCase>>;
    /// Record a pass/fail outcome and result blob for one test.
    async fn record_result(&self, test_id: Uuid, passed: bool, result: serde_json::Value) -> DomainResult<()>;
}
