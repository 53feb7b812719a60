//! SQLite implementation of the EpicRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Epic;
use crate::domain::ports::EpicRepository;

#[derive(Clone)]
pub struct SqliteEpicRepository {
    pool: SqlitePool,
}

impl SqliteEpicRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EpicRepository for SqliteEpicRepository {
    async fn create(&self, epic: &Epic) -> DomainResult<()> {
        let depends_on_json = serde_json::to_string(&epic.depends_on)?;

        sqlx::query(
            r#"INSERT INTO epics (id, project_id, name, priority, depends_on) VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(epic.id.to_string())
        .bind(epic.project_id.to_string())
        .bind(&epic.name)
        .bind(epic.priority)
        .bind(&depends_on_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Epic>> {
        let row: Option<EpicRow> =
            sqlx::query_as("SELECT id, project_id, name, priority, depends_on FROM epics WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn update(&self, epic: &Epic) -> DomainResult<()> {
        let depends_on_json = serde_json::to_string(&epic.depends_on)?;

        let result = sqlx::query("UPDATE epics SET name = ?, priority = ?, depends_on = ? WHERE id = ?")
            .bind(&epic.name)
            .bind(epic.priority)
            .bind(&depends_on_json)
            .bind(epic.id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EpicNotFound(epic.id));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM epics WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EpicNotFound(id));
        }

        Ok(())
    }

    async fn list_for_project(&self, project_id: Uuid) -> DomainResult<Vec<Epic>> {
        let rows: Vec<EpicRow> = sqlx::query_as(
            "SELECT id, project_id, name, priority, depends_on FROM epics WHERE project_id = ? ORDER BY priority DESC",
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[derive(sqlx::FromRow)]
struct EpicRow {
    id: String,
    project_id: String,
    name: String,
    priority: i32,
    depends_on: String,
}

impl TryFrom<EpicRow> for Epic {
    type Error = DomainError;

    fn try_from(row: EpicRow) -> Result<Self, Self::Error> {
        let id = super::parse_uuid(&row.id)?;
        let project_id = super::parse_uuid(&row.project_id)?;
        let depends_on: Vec<Uuid> = super::parse_json_or_default(Some(row.depends_on))?;

        Ok(Epic { id, project_id, name: row.name, priority: row.priority, depends_on })
    }
}
