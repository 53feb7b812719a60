//! SQLite implementation of the SessionRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Session, SessionKind, SessionStatus};
use crate::domain::ports::SessionRepository;

#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: &Session) -> DomainResult<()> {
        let metrics_json = serde_json::to_string(&session.metrics)?;

        sqlx::query(
            r#"INSERT INTO sessions (id, project_id, sequence, kind, model, status, created_at, started_at, last_heartbeat, ended_at, metrics, interruption_reason)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(session.id.to_string())
        .bind(session.project_id.to_string())
        .bind(session.sequence)
        .bind(session.kind.as_str())
        .bind(&session.model)
        .bind(session.status.as_str())
        .bind(session.created_at.to_rfc3339())
        .bind(session.started_at.map(|t| t.to_rfc3339()))
        .bind(session.last_heartbeat.map(|t| t.to_rfc3339()))
        .bind(session.ended_at.map(|t| t.to_rfc3339()))
        .bind(&metrics_json)
        .bind(&session.interruption_reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(SELECT_COLUMNS_WHERE_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn update(&self, session: &Session) -> DomainResult<()> {
        let metrics_json = serde_json::to_string(&session.metrics)?;

        let result = sqlx::query(
            r#"UPDATE sessions SET status = ?, started_at = ?, last_heartbeat = ?, ended_at = ?, metrics = ?, interruption_reason = ?
               WHERE id = ?"#,
        )
        .bind(session.status.as_str())
        .bind(session.started_at.map(|t| t.to_rfc3339()))
        .bind(session.last_heartbeat.map(|t| t.to_rfc3339()))
        .bind(session.ended_at.map(|t| t.to_rfc3339()))
        .bind(&metrics_json)
        .bind(&session.interruption_reason)
        .bind(session.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::SessionNotFound(session.id));
        }

        Ok(())
    }

    async fn get_running_for_project(&self, project_id: Uuid) -> DomainResult<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE project_id = ? AND status = 'running' ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(project_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn list_running(&self) -> DomainResult<Vec<Session>> {
        let rows: Vec<SessionRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE status = 'running' ORDER BY created_at"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn next_sequence(&self, project_id: Uuid) -> DomainResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(sequence), 0) + 1 FROM sessions WHERE project_id = ?")
            .bind(project_id.to_string())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }
}

const SELECT_COLUMNS: &str = "SELECT id, project_id, sequence, kind, model, status, created_at, started_at, last_heartbeat, ended_at, metrics, interruption_reason FROM sessions";
const SELECT_COLUMNS_WHERE_ID: &str = "SELECT id, project_id, sequence, kind, model, status, created_at, started_at, last_heartbeat, ended_at, metrics, interruption_reason FROM sessions WHERE id = ?";

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    project_id: String,
    sequence: i64,
    kind: String,
    model: String,
    status: String,
    created_at: String,
    started_at: Option<String>,
    last_heartbeat: Option<String>,
    ended_at: Option<String>,
    metrics: String,
    interruption_reason: Option<String>,
}

impl TryFrom<SessionRow> for Session {
    type Error = DomainError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let id = super::parse_uuid(&row.id)?;
        let project_id = super::parse_uuid(&row.project_id)?;
        let kind = SessionKind::from_str(&row.kind)
            .ok_or_else(|| DomainError::Serialization(format!("invalid session kind: {}", row.kind)))?;
        let status = SessionStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::Serialization(format!("invalid session status: {}", row.status)))?;
        let created_at = super::parse_datetime(&row.created_at)?;
        let started_at = super::parse_optional_datetime(row.started_at)?;
        let last_heartbeat = super::parse_optional_datetime(row.last_heartbeat)?;
        let ended_at = super::parse_optional_datetime(row.ended_at)?;
        let metrics = super::parse_json_value(&row.metrics)?;

        Ok(Session {
            id,
            project_id,
            sequence: row.sequence,
            kind,
            model: row.model,
            status,
            created_at,
            started_at,
            last_heartbeat,
            ended_at,
            metrics,
            interruption_reason: row.interruption_reason,
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
    async fn create_and_get_roundtrip() {
        let pool = create_migrated_test_pool().await.unwrap();
        let project_id = seed_project(&pool).await;
        let repo = SqliteSessionRepository::new(pool);

        let session = Session::new(project_id, 1, SessionKind::Coding, "claude-cheap".to_string());
        repo.create(&session).await.unwrap();

        let loaded = repo.get(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SessionStatus::Pending);
    }

    #[tokio::test]
    async fn next_sequence_increments() {
        let pool = create_migrated_test_pool().await.unwrap();
        let project_id = seed_project(&pool).await;
        let repo = SqliteSessionRepository::new(pool);

        assert_eq!(repo.next_sequence(project_id).await.unwrap(), 1);

        let session = Session::new(project_id, 1, SessionKind::Coding, "claude-cheap".to_string());
        repo.create(&session).await.unwrap();

        assert_eq!(repo.next_sequence(project_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn get_running_for_project_filters_status() {
        let pool = create_migrated_test_pool().await.unwrap();
        let project_id = seed_project(&pool).await;
        let repo = SqliteSessionRepository::new(pool);

        let mut session = Session::new(project_id, 1, SessionKind::Coding, "claude-cheap".to_string());
        repo.create(&session).await.unwrap();
        assert!(repo.get_running_for_project(project_id).await.unwrap().is_none());

        session.start();
        repo.update(&session).await.unwrap();
        let running = repo.get_running_for_project(project_id).await.unwrap();
        assert!(running.is_some());
    }
}
