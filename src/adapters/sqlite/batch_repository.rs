//! SQLite implementation of the PlanRepository.
//!
//! Plans live inside `projects.metadata["execution_plan"]`, not a table of
//! their own; `save_plan`/`set_batch_status` read-modify-write that blob for
//! the full plan shape, and additionally mirror each batch's status into the
//! `parallel_batches` table, which exists purely for live status queries
//! that shouldn't have to deserialize the whole plan.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Batch, BatchStatus, ExecutionPlan, Project};
use crate::domain::ports::PlanRepository;

#[derive(Clone)]
pub struct SqlitePlanRepository {
    pool: SqlitePool,
}

impl SqlitePlanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_project(&self, project_id: Uuid) -> DomainResult<Project> {
        let row: Option<ProjectMetadataRow> =
            sqlx::query_as("SELECT id, name, working_dir, metadata, execution_mode, created_at, updated_at FROM projects WHERE id = ?")
                .bind(project_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        let row = row.ok_or(DomainError::ProjectNotFound(project_id))?;
        row.try_into()
    }

    async fn persist_metadata(&self, project: &Project) -> DomainResult<()> {
        let metadata_json = serde_json::to_string(&project.metadata)?;
        sqlx::query("UPDATE projects SET metadata = ?, updated_at = ? WHERE id = ?")
            .bind(&metadata_json)
            .bind(project.updated_at.to_rfc3339())
            .bind(project.id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_batch_row(&self, project_id: Uuid, batch: &Batch) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO parallel_batches (project_id, batch_id, status, started_at, completed_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(project_id, batch_id) DO UPDATE SET
                   status = excluded.status,
                   started_at = excluded.started_at,
                   completed_at = excluded.completed_at"#,
        )
        .bind(project_id.to_string())
        .bind(batch.batch_id)
        .bind(batch_status_str(batch.status))
        .bind(batch.started_at.map(|t| t.to_rfc3339()))
        .bind(batch.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn batch_status_str(status: BatchStatus) -> &'static str {
    match status {
        BatchStatus::Pending => "pending",
        BatchStatus::Running => "running",
        BatchStatus::Completed => "completed",
        BatchStatus::Failed => "failed",
        BatchStatus::Cancelled => "cancelled",
    }
}

#[async_trait]
impl PlanRepository for SqlitePlanRepository {
    async fn save_plan(&self, project_id: Uuid, plan: &ExecutionPlan) -> DomainResult<()> {
        let mut project = self.load_project(project_id).await?;
        project.set_execution_plan(plan);
        project.updated_at = chrono::Utc::now();
        self.persist_metadata(&project).await?;

        for batch in &plan.batches {
            self.upsert_batch_row(project_id, batch).await?;
        }
        Ok(())
    }

    async fn load_plan(&self, project_id: Uuid) -> DomainResult<Option<ExecutionPlan>> {
        let project = self.load_project(project_id).await?;
        Ok(project.execution_plan())
    }

    async fn set_batch_status(&self, project_id: Uuid, batch_id: u32, status: BatchStatus) -> DomainResult<()> {
        let mut project = self.load_project(project_id).await?;
        let mut plan = project
            .execution_plan()
            .ok_or(DomainError::EmptyPlan)?;

        let batch = plan
            .batches
            .iter_mut()
            .find(|b| b.batch_id == batch_id)
            .ok_or_else(|| DomainError::ValidationFailed(format!("batch {batch_id} not found in plan")))?;

        match status {
            BatchStatus::Running => batch.start(),
            other => batch.complete(other),
        }
        let updated_batch = batch.clone();

        project.set_execution_plan(&plan);
        project.updated_at = chrono::Utc::now();
        self.persist_metadata(&project).await?;
        self.upsert_batch_row(project_id, &updated_batch).await
    }
}

#[derive(sqlx::FromRow)]
struct ProjectMetadataRow {
    id: String,
    name: String,
    working_dir: String,
    metadata: String,
    execution_mode: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ProjectMetadataRow> for Project {
    type Error = DomainError;

    fn try_from(row: ProjectMetadataRow) -> Result<Self, Self::Error> {
        use crate::domain::models::ExecutionMode;
        use std::path::PathBuf;

        let id = super::parse_uuid(&row.id)?;
        let metadata = super::parse_json_value(&row.metadata)?;
        let execution_mode = row
            .execution_mode
            .map(|m| ExecutionMode::from_str(&m).ok_or_else(|| DomainError::Serialization(format!("invalid execution mode: {m}"))))
            .transpose()?;
        let created_at = super::parse_datetime(&row.created_at)?;
        let updated_at = super::parse_datetime(&row.updated_at)?;

        Ok(Project {
            id,
            name: row.name,
            working_dir: PathBuf::from(row.working_dir),
            metadata,
            execution_mode,
            created_at,
            updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::adapters::sqlite::project_repository::SqliteProjectRepository;
    use crate::domain::models::Batch;
    use crate::domain::ports::ProjectRepository;
    use std::collections::HashMap;
    use std::path::PathBuf;

    async fn seed_project(pool: &SqlitePool) -> Uuid {
        let repo = SqliteProjectRepository::new(pool.clone());
        let project = Project::new("demo", PathBuf::from("/work/demo"));
        repo.create(&project).await.unwrap();
        project.id
    }

    fn sample_plan(project_id: Uuid, task_id: Uuid) -> ExecutionPlan {
        let mut assignments = HashMap::new();
        assignments.insert(task_id, "worktree-a".to_string());
        ExecutionPlan::new(project_id, vec![Batch::new(0, vec![task_id], false, vec![])], assignments, vec![])
    }

    #[tokio::test]
    async fn save_and_load_plan_roundtrip() {
        let pool = create_migrated_test_pool().await.unwrap();
        let project_id = seed_project(&pool).await;
        let repo = SqlitePlanRepository::new(pool);

        let task_id = Uuid::new_v4();
        let plan = sample_plan(project_id, task_id);
        repo.save_plan(project_id, &plan).await.unwrap();

        let loaded = repo.load_plan(project_id).await.unwrap().unwrap();
        assert_eq!(loaded.batches.len(), 1);
        assert_eq!(loaded.worktree_assignments.get(&task_id), Some(&"worktree-a".to_string()));
    }

    #[tokio::test]
    async fn load_plan_returns_none_when_unset() {
        let pool = create_migrated_test_pool().await.unwrap();
        let project_id = seed_project(&pool).await;
        let repo = SqlitePlanRepository::new(pool);
        assert!(repo.load_plan(project_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_batch_status_updates_single_batch() {
        let pool = create_migrated_test_pool().await.unwrap();
        let project_id = seed_project(&pool).await;
        let repo = SqlitePlanRepository::new(pool);

        let task_id = Uuid::new_v4();
        let plan = sample_plan(project_id, task_id);
        repo.save_plan(project_id, &plan).await.unwrap();

        repo.set_batch_status(project_id, 0, BatchStatus::Running).await.unwrap();
        let loaded = repo.load_plan(project_id).await.unwrap().unwrap();
        assert_eq!(loaded.batches[0].status, BatchStatus::Running);
        assert!(loaded.batches[0].started_at.is_some());
    }

    #[tokio::test]
    async fn set_batch_status_on_missing_plan_errors() {
        let pool = create_migrated_test_pool().await.unwrap();
        let project_id = seed_project(&pool).await;
        let repo = SqlitePlanRepository::new(pool);

        let result = repo.set_batch_status(project_id, 0, BatchStatus::Running).await;
        assert!(matches!(result, Err(DomainError::EmptyPlan)));
    }

    #[tokio::test]
    async fn save_plan_and_set_batch_status_populate_parallel_batches_table() {
        let pool = create_migrated_test_pool().await.unwrap();
        let project_id = seed_project(&pool).await;
        let repo = SqlitePlanRepository::new(pool.clone());

        let task_id = Uuid::new_v4();
        let plan = sample_plan(project_id, task_id);
        repo.save_plan(project_id, &plan).await.unwrap();

        let (status, started_at): (String, Option<String>) = sqlx::query_as(
            "SELECT status, started_at FROM parallel_batches WHERE project_id = ? AND batch_id = ?",
        )
        .bind(project_id.to_string())
        .bind(0)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(status, "pending");
        assert!(started_at.is_none());

        repo.set_batch_status(project_id, 0, BatchStatus::Running).await.unwrap();

        let (status, started_at): (String, Option<String>) = sqlx::query_as(
            "SELECT status, started_at FROM parallel_batches WHERE project_id = ? AND batch_id = ?",
        )
        .bind(project_id.to_string())
        .bind(0)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(status, "running");
        assert!(started_at.is_some());
    }
}
