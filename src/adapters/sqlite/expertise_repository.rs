//! SQLite implementation of the ExpertiseRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ExpertiseDomain, ExpertiseRecord};
use crate::domain::ports::ExpertiseRepository;

#[derive(Clone)]
pub struct SqliteExpertiseRepository {
    pool: SqlitePool,
}

impl SqliteExpertiseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT project_id, domain, version, patterns, techniques, hot_files, learnings, updated_at FROM expertise_records";

#[async_trait]
impl ExpertiseRepository for SqliteExpertiseRepository {
    async fn get(&self, project_id: Uuid, domain: ExpertiseDomain) -> DomainResult<Option<ExpertiseRecord>> {
        let row: Option<ExpertiseRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE project_id = ? AND domain = ?"))
                .bind(project_id.to_string())
                .bind(domain.as_str())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn upsert(&self, record: &ExpertiseRecord) -> DomainResult<()> {
        let patterns_json = serde_json::to_string(&record.patterns)?;
        let techniques_json = serde_json::to_string(&record.techniques)?;
        let hot_files_json = serde_json::to_string(&record.hot_files)?;
        let learnings_json = serde_json::to_string(&record.learnings)?;

        sqlx::query(
            r#"INSERT INTO expertise_records (project_id, domain, version, patterns, techniques, hot_files, learnings, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(project_id, domain) DO UPDATE SET
                   version = excluded.version,
                   patterns = excluded.patterns,
                   techniques = excluded.techniques,
                   hot_files = excluded.hot_files,
                   learnings = excluded.learnings,
                   updated_at = excluded.updated_at"#,
        )
        .bind(record.project_id.to_string())
        .bind(record.domain.as_str())
        .bind(record.version)
        .bind(&patterns_json)
        .bind(&techniques_json)
        .bind(&hot_files_json)
        .bind(&learnings_json)
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_project(&self, project_id: Uuid) -> DomainResult<Vec<ExpertiseRecord>> {
        let rows: Vec<ExpertiseRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE project_id = ? ORDER BY domain"))
            .bind(project_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ExpertiseRow {
    project_id: String,
    domain: String,
    version: i64,
    patterns: String,
    techniques: String,
    hot_files: String,
    learnings: String,
    updated_at: String,
}

fn domain_from_str(s: &str) -> Option<ExpertiseDomain> {
    ExpertiseDomain::all().into_iter().find(|d| d.as_str() == s)
}

impl TryFrom<ExpertiseRow> for ExpertiseRecord {
    type Error = DomainError;

    fn try_from(row: ExpertiseRow) -> Result<Self, Self::Error> {
        let project_id = super::parse_uuid(&row.project_id)?;
        let domain = domain_from_str(&row.domain)
            .ok_or_else(|| DomainError::Serialization(format!("invalid expertise domain: {}", row.domain)))?;
        let patterns: Vec<String> = super::parse_json_or_default(Some(row.patterns))?;
        let techniques: Vec<String> = super::parse_json_or_default(Some(row.techniques))?;
        let hot_files: Vec<String> = super::parse_json_or_default(Some(row.hot_files))?;
        let learnings: Vec<String> = super::parse_json_or_default(Some(row.learnings))?;
        let updated_at = super::parse_datetime(&row.updated_at)?;

        Ok(ExpertiseRecord { project_id, domain, version: row.version, patterns, techniques, hot_files, learnings, updated_at })
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
    async fn upsert_then_get_roundtrip() {
        let pool = create_migrated_test_pool().await.unwrap();
        let project_id = seed_project(&pool).await;
        let repo = SqliteExpertiseRepository::new(pool);

        let mut record = ExpertiseRecord::new(project_id, ExpertiseDomain::Database);
        record.patterns.push("use sqlx query_as".to_string());
        repo.upsert(&record).await.unwrap();

        let loaded = repo.get(project_id, ExpertiseDomain::Database).await.unwrap().unwrap();
        assert_eq!(loaded.patterns, vec!["use sqlx query_as".to_string()]);
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_record() {
        let pool = create_migrated_test_pool().await.unwrap();
        let project_id = seed_project(&pool).await;
        let repo = SqliteExpertiseRepository::new(pool);

        let mut record = ExpertiseRecord::new(project_id, ExpertiseDomain::Api);
        repo.upsert(&record).await.unwrap();

        record.bump_version();
        record.learnings.push("retry on 429".to_string());
        repo.upsert(&record).await.unwrap();

        let loaded = repo.get(project_id, ExpertiseDomain::Api).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.learnings, vec!["retry on 429".to_string()]);
    }

    #[tokio::test]
    async fn list_for_project_returns_empty_when_none_recorded() {
        let pool = create_migrated_test_pool().await.unwrap();
        let project_id = seed_project(&pool).await;
        let repo = SqliteExpertiseRepository::new(pool);
        assert!(repo.list_for_project(project_id).await.unwrap().is_empty());
    }
}
