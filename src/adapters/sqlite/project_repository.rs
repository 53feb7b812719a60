//! SQLite implementation of the ProjectRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ExecutionMode, Project};
use crate::domain::ports::ProjectRepository;

#[derive(Clone)]
pub struct SqliteProjectRepository {
    pool: SqlitePool,
}

impl SqliteProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn create(&self, project: &Project) -> DomainResult<()> {
        let metadata_json = serde_json::to_string(&project.metadata)?;

        sqlx::query(
            r#"INSERT INTO projects (id, name, working_dir, metadata, execution_mode, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(project.id.to_string())
        .bind(&project.name)
        .bind(project.working_dir.to_string_lossy().to_string())
        .bind(&metadata_json)
        .bind(project.execution_mode.map(|m| m.as_str().to_string()))
        .bind(project.created_at.to_rfc3339())
        .bind(project.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as(
            "SELECT id, name, working_dir, metadata, execution_mode, created_at, updated_at FROM projects WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn update(&self, project: &Project) -> DomainResult<()> {
        let metadata_json = serde_json::to_string(&project.metadata)?;

        let result = sqlx::query(
            r#"UPDATE projects SET name = ?, working_dir = ?, metadata = ?, execution_mode = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&project.name)
        .bind(project.working_dir.to_string_lossy().to_string())
        .bind(&metadata_json)
        .bind(project.execution_mode.map(|m| m.as_str().to_string()))
        .bind(project.updated_at.to_rfc3339())
        .bind(project.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ProjectNotFound(project.id));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ProjectNotFound(id));
        }

        Ok(())
    }

    async fn list(&self) -> DomainResult<Vec<Project>> {
        let rows: Vec<ProjectRow> = sqlx::query_as(
            "SELECT id, name, working_dir, metadata, execution_mode, created_at, updated_at FROM projects ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn get_by_name(&self, name: &str) -> DomainResult<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as(
            "SELECT id, name, working_dir, metadata, execution_mode, created_at, updated_at FROM projects WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    working_dir: String,
    metadata: String,
    execution_mode: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ProjectRow> for Project {
    type Error = DomainError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
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

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteProjectRepository::new(pool);

        let project = Project::new("demo", PathBuf::from("/work/demo"));
        repo.create(&project).await.unwrap();

        let loaded = repo.get(project.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "demo");
        assert_eq!(loaded.working_dir, PathBuf::from("/work/demo"));
    }

    #[tokio::test]
    async fn get_by_name_finds_project() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteProjectRepository::new(pool);

        let project = Project::new("named", PathBuf::from("/work/named"));
        repo.create(&project).await.unwrap();

        let found = repo.get_by_name("named").await.unwrap();
        assert!(found.is_some());
        assert!(repo.get_by_name("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_project_errors() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteProjectRepository::new(pool);

        let project = Project::new("ghost", PathBuf::from("/work/ghost"));
        let result = repo.update(&project).await;
        assert!(matches!(result, Err(DomainError::ProjectNotFound(_))));
    }

    #[tokio::test]
    async fn delete_removes_project() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteProjectRepository::new(pool);

        let project = Project::new("temp", PathBuf::from("/work/temp"));
        repo.create(&project).await.unwrap();
        repo.delete(project.id).await.unwrap();

        assert!(repo.get(project.id).await.unwrap().is_none());
    }
}
