//! SQLite implementation of the TestRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::TestCase;
use crate::domain::ports::TestRepository;

#[derive(Clone)]
pub struct SqliteTestRepository {
    pool: SqlitePool,
}

impl SqliteTestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TestRepository for SqliteTestRepository {
    async fn create(&self, test: &TestCase) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO tests (id, task_id, category, description, steps, passed, result)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(test.id.to_string())
        .bind(test.task_id.to_string())
        .bind(&test.category)
        .bind(&test.description)
        .bind(serde_json::to_string(&test.steps)?)
        .bind(test.passed)
        .bind(serde_json::to_string(&test.result)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_task(&self, task_id: Uuid) -> DomainResult<Vec<TestCase>> {
        let rows: Vec<TestRow> = sqlx::query_as(
            "SELECT id, task_id, category, description, steps, passed, result
             FROM tests WHERE task_id = ? ORDER BY category, id",
        )
        .bind(task_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn record_result(&self, test_id: Uuid, passed: bool, result: serde_json::Value) -> DomainResult<()> {
        let rows_affected = sqlx::query("UPDATE tests SET passed = ?, result = ? WHERE id = ?")
            .bind(passed)
            .bind(serde_json::to_string(&result)?)
            .bind(test_id.to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(DomainError::ValidationFailed(format!("test {test_id} not found")));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct TestRow {
    id: String,
    task_id: String,
    category: String,
    description: String,
    steps: String,
    passed: Option<bool>,
    result: String,
}

impl TryFrom<TestRow> for TestCase {
    type Error = DomainError;

    fn try_from(row: TestRow) -> Result<Self, Self::Error> {
        let id = super::parse_uuid(&row.id)?;
        let task_id = super::parse_uuid(&row.task_id)?;
        let steps = super::parse_json_or_default(Some(row.steps))?;
        let result = super::parse_json_value(&row.result)?;

        Ok(TestCase {
            id,
            task_id,
            category: row.category,
            description: row.description,
            steps,
            passed: row.passed,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::adapters::sqlite::epic_repository::SqliteEpicRepository;
    use crate::adapters::sqlite::project_repository::SqliteProjectRepository;
    use crate::adapters::sqlite::task_repository::SqliteTaskRepository;
    use crate::domain::models::{Epic, Project, Task};
    use crate::domain::ports::{EpicRepository, ProjectRepository, TaskRepository};
    use std::path::PathBuf;

    async fn seed_task(pool: &SqlitePool) -> Uuid {
        let project = Project::new("demo", PathBuf::from("/work/demo"));
        SqliteProjectRepository::new(pool.clone()).create(&project).await.unwrap();
        let epic = Epic::new(project.id, "epic-a", 0);
        SqliteEpicRepository::new(pool.clone()).create(&epic).await.unwrap();
        let task = Task::new(epic.id, "do it", "edit file.rs", 0);
        SqliteTaskRepository::new(pool.clone()).create(&task).await.unwrap();
        task.id
    }

    #[tokio::test]
    async fn create_and_list_for_task_roundtrip() {
        let pool = create_migrated_test_pool().await.unwrap();
        let task_id = seed_task(&pool).await;
        let repo = SqliteTestRepository::new(pool);

        let mut test = TestCase::new(task_id, "unit", "endpoint returns 200");
        test.steps = vec!["send request".to_string(), "assert status".to_string()];
        repo.create(&test).await.unwrap();

        let tests = repo.list_for_task(task_id).await.unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].category, "unit");
        assert_eq!(tests[0].steps.len(), 2);
        assert_eq!(tests[0].passed, None);
    }

    #[tokio::test]
    async fn record_result_updates_pass_flag_and_blob() {
        let pool = create_migrated_test_pool().await.unwrap();
        let task_id = seed_task(&pool).await;
        let repo = SqliteTestRepository::new(pool);

        let test = TestCase::new(task_id, "unit", "endpoint returns 200");
        repo.create(&test).await.unwrap();

        repo.record_result(test.id, true, serde_json::json!({"summary": "task completed"})).await.unwrap();

        let tests = repo.list_for_task(task_id).await.unwrap();
        assert_eq!(tests[0].passed, Some(true));
        assert_eq!(tests[0].result, serde_json::json!({"summary": "task completed"}));
    }

    #[tokio::test]
    async fn record_result_on_unknown_test_errors() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteTestRepository::new(pool);
        let result = repo.record_result(Uuid::new_v4(), true, serde_json::json!({})).await;
        assert!(result.is_err());
    }
}
