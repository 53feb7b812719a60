//! SQLite implementation of the WorktreeRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Worktree, WorktreeStatus};
use crate::domain::ports::WorktreeRepository;

#[derive(Clone)]
pub struct SqliteWorktreeRepository {
    pool: SqlitePool,
}

impl SqliteWorktreeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, project_id, epic_id, path, branch, status, created_at, merge_commit, merged_at FROM worktrees";

#[async_trait]
impl WorktreeRepository for SqliteWorktreeRepository {
    async fn create(&self, worktree: &Worktree) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO worktrees (id, project_id, epic_id, path, branch, status, created_at, merge_commit, merged_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(worktree.id.to_string())
        .bind(worktree.project_id.to_string())
        .bind(worktree.epic_id.to_string())
        .bind(&worktree.path)
        .bind(&worktree.branch)
        .bind(worktree.status.as_str())
        .bind(worktree.created_at.to_rfc3339())
        .bind(&worktree.merge_commit)
        .bind(worktree.merged_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Worktree>> {
        let row: Option<WorktreeRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn get_by_epic(&self, project_id: Uuid, epic_id: Uuid) -> DomainResult<Option<Worktree>> {
        let row: Option<WorktreeRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE project_id = ? AND epic_id = ?"))
                .bind(project_id.to_string())
                .bind(epic_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn update(&self, worktree: &Worktree) -> DomainResult<()> {
        let result = sqlx::query(
            r#"UPDATE worktrees SET path = ?, branch = ?, status = ?, merge_commit = ?, merged_at = ? WHERE id = ?"#,
        )
        .bind(&worktree.path)
        .bind(&worktree.branch)
        .bind(worktree.status.as_str())
        .bind(&worktree.merge_commit)
        .bind(worktree.merged_at.map(|t| t.to_rfc3339()))
        .bind(worktree.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::WorktreeNotFound(worktree.epic_id));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM worktrees WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::WorktreeNotFound(id));
        }

        Ok(())
    }

    async fn list_by_status(&self, status: WorktreeStatus) -> DomainResult<Vec<Worktree>> {
        let rows: Vec<WorktreeRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE status = ? ORDER BY created_at"))
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn list_for_project(&self, project_id: Uuid) -> DomainResult<Vec<Worktree>> {
        let rows: Vec<WorktreeRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE project_id = ? ORDER BY created_at"))
                .bind(project_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn list_for_cleanup(&self) -> DomainResult<Vec<Worktree>> {
        let rows: Vec<WorktreeRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE status IN ('merged', 'cleanup', 'abandoned') ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[derive(sqlx::FromRow)]
struct WorktreeRow {
    id: String,
    project_id: String,
    epic_id: String,
    path: String,
    branch: String,
    status: String,
    created_at: String,
    merge_commit: Option<String>,
    merged_at: Option<String>,
}

impl TryFrom<WorktreeRow> for Worktree {
    type Error = DomainError;

    fn try_from(row: WorktreeRow) -> Result<Self, Self::Error> {
        let id = super::parse_uuid(&row.id)?;
        let project_id = super::parse_uuid(&row.project_id)?;
        let epic_id = super::parse_uuid(&row.epic_id)?;
        let status = WorktreeStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::Serialization(format!("invalid worktree status: {}", row.status)))?;
        let created_at = super::parse_datetime(&row.created_at)?;
        let merged_at = super::parse_optional_datetime(row.merged_at)?;

        Ok(Worktree {
            id,
            project_id,
            epic_id,
            path: row.path,
            branch: row.branch,
            status,
            created_at,
            merge_commit: row.merge_commit,
            merged_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::adapters::sqlite::epic_repository::SqliteEpicRepository;
    use crate::adapters::sqlite::project_repository::SqliteProjectRepository;
    use crate::domain::models::{Epic, Project};
    use crate::domain::ports::{EpicRepository, ProjectRepository};
    use std::path::PathBuf;

    async fn seed_epic(pool: &SqlitePool) -> (Uuid, Uuid) {
        let projects = SqliteProjectRepository::new(pool.clone());
        let project = Project::new("demo", PathBuf::from("/work/demo"));
        projects.create(&project).await.unwrap();

        let epics = SqliteEpicRepository::new(pool.clone());
        let epic = Epic::new(project.id, "api", 1);
        epics.create(&epic).await.unwrap();

        (project.id, epic.id)
    }

    #[tokio::test]
    async fn create_and_get_by_epic_roundtrip() {
        let pool = create_migrated_test_pool().await.unwrap();
        let (project_id, epic_id) = seed_epic(&pool).await;
        let repo = SqliteWorktreeRepository::new(pool);

        let worktree = Worktree::new(project_id, epic_id, "/work/demo/.worktrees/api".to_string(), "epic/api".to_string());
        repo.create(&worktree).await.unwrap();

        let loaded = repo.get_by_epic(project_id, epic_id).await.unwrap().unwrap();
        assert_eq!(loaded.branch, "epic/api");
        assert_eq!(loaded.status, WorktreeStatus::Active);
    }

    #[tokio::test]
    async fn list_for_cleanup_includes_terminal_statuses() {
        let pool = create_migrated_test_pool().await.unwrap();
        let (project_id, epic_id) = seed_epic(&pool).await;
        let repo = SqliteWorktreeRepository::new(pool);

        let mut worktree =
            Worktree::new(project_id, epic_id, "/work/demo/.worktrees/api".to_string(), "epic/api".to_string());
        repo.create(&worktree).await.unwrap();
        worktree.mark_merged("deadbeef".to_string());
        repo.update(&worktree).await.unwrap();

        let cleanup = repo.list_for_cleanup().await.unwrap();
        assert_eq!(cleanup.len(), 1);
        assert_eq!(cleanup[0].merge_commit.as_deref(), Some("deadbeef"));
    }

    #[tokio::test]
    async fn delete_missing_worktree_errors() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteWorktreeRepository::new(pool);
        let result = repo.delete(Uuid::new_v4()).await;
        assert!(matches!(result, Err(DomainError::WorktreeNotFound(_))));
    }
}
