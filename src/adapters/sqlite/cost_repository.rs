//! SQLite implementation of the CostRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::AgentCost;
use crate::domain::ports::CostRepository;

#[derive(Clone)]
pub struct SqliteCostRepository {
    pool: SqlitePool,
}

impl SqliteCostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CostRepository for SqliteCostRepository {
    async fn record(&self, cost: &AgentCost) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO agent_costs (id, project_id, session_id, task_id, model, input_tokens, output_tokens, cost_cents, recorded_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(cost.id.to_string())
        .bind(cost.project_id.to_string())
        .bind(cost.session_id.map(|id| id.to_string()))
        .bind(cost.task_id.map(|id| id.to_string()))
        .bind(&cost.model)
        .bind(cost.input_tokens)
        .bind(cost.output_tokens)
        .bind(cost.cost_cents)
        .bind(cost.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn total_cost_cents(&self, project_id: Uuid) -> DomainResult<i64> {
        let row: (Option<i64>,) =
            sqlx::query_as("SELECT SUM(cost_cents) FROM agent_costs WHERE project_id = ?")
                .bind(project_id.to_string())
                .fetch_one(&self.pool)
                .await?;

        Ok(row.0.unwrap_or(0))
    }

    async fn list_for_project(&self, project_id: Uuid) -> DomainResult<Vec<AgentCost>> {
        let rows: Vec<AgentCostRow> = sqlx::query_as(
            "SELECT id, project_id, session_id, task_id, model, input_tokens, output_tokens, cost_cents, recorded_at
             FROM agent_costs WHERE project_id = ? ORDER BY recorded_at",
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[derive(sqlx::FromRow)]
struct AgentCostRow {
    id: String,
    project_id: String,
    session_id: Option<String>,
    task_id: Option<String>,
    model: String,
    input_tokens: i64,
    output_tokens: i64,
    cost_cents: i64,
    recorded_at: String,
}

impl TryFrom<AgentCostRow> for AgentCost {
    type Error = DomainError;

    fn try_from(row: AgentCostRow) -> Result<Self, Self::Error> {
        let id = super::parse_uuid(&row.id)?;
        let project_id = super::parse_uuid(&row.project_id)?;
        let session_id = super::parse_optional_uuid(row.session_id)?;
        let task_id = super::parse_optional_uuid(row.task_id)?;
        let recorded_at = super::parse_datetime(&row.recorded_at)?;

        Ok(AgentCost {
            id,
            project_id,
            session_id,
            task_id,
            model: row.model,
            input_tokens: row.input_tokens,
            output_tokens: row.output_tokens,
            cost_cents: row.cost_cents,
            recorded_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::adapters::sqlite::project_repository::SqliteProjectRepository;
    use crate::domain::models::Project;
    use crate::domain::ports::ProjectRepository;
    use std::path::PathBuf;

    async fn seed_project(pool: &SqlitePool) -> Uuid {
        let repo = SqliteProjectRepository::new(pool.clone());
        let project = Project::new("demo", PathBuf::from("/work/demo"));
        repo.create(&project).await.unwrap();
        project.id
    }

    #[tokio::test]
    async fn record_and_total_roundtrip() {
        let pool = create_migrated_test_pool().await.unwrap();
        let project_id = seed_project(&pool).await;
        let repo = SqliteCostRepository::new(pool);

        repo.record(&AgentCost::new(project_id, None, None, "claude-cheap".to_string(), 1000, 500, 42)).await.unwrap();
        repo.record(&AgentCost::new(project_id, None, None, "claude-premium".to_string(), 2000, 800, 300)).await.unwrap();

        assert_eq!(repo.total_cost_cents(project_id).await.unwrap(), 342);
        assert_eq!(repo.list_for_project(project_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn total_cost_for_unknown_project_is_zero() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteCostRepository::new(pool);
        assert_eq!(repo.total_cost_cents(Uuid::new_v4()).await.unwrap(), 0);
    }
}
