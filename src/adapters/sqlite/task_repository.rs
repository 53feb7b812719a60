//! SQLite implementation of the TaskRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Dependency, Task};
use crate::domain::ports::{TaskFilter, TaskRepository};

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, epic_id, description, action, priority, done, depends_on, metadata FROM tasks";

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &Task) -> DomainResult<()> {
        let depends_on_json = serde_json::to_string(&task.depends_on)?;
        let metadata_json = serde_json::to_string(&task.metadata)?;

        sqlx::query(
            r#"INSERT INTO tasks (id, epic_id, description, action, priority, done, depends_on, metadata)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(task.id.to_string())
        .bind(task.epic_id.to_string())
        .bind(&task.description)
        .bind(&task.action)
        .bind(task.priority)
        .bind(task.done)
        .bind(&depends_on_json)
        .bind(&metadata_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn update(&self, task: &Task) -> DomainResult<()> {
        let depends_on_json = serde_json::to_string(&task.depends_on)?;
        let metadata_json = serde_json::to_string(&task.metadata)?;

        let result = sqlx::query(
            r#"UPDATE tasks SET description = ?, action = ?, priority = ?, done = ?, depends_on = ?, metadata = ?
               WHERE id = ?"#,
        )
        .bind(&task.description)
        .bind(&task.action)
        .bind(task.priority)
        .bind(task.done)
        .bind(&depends_on_json)
        .bind(&metadata_json)
        .bind(task.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::TaskNotFound(task.id));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::TaskNotFound(id));
        }

        Ok(())
    }

    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>> {
        let mut query = String::from(SELECT_COLUMNS);
        query.push_str(" WHERE 1=1");

        if filter.epic_id.is_some() {
            query.push_str(" AND epic_id = ?");
        }
        if filter.done.is_some() {
            query.push_str(" AND done = ?");
        }
        query.push_str(" ORDER BY priority DESC");

        let mut q = sqlx::query_as::<_, TaskRow>(&query);
        if let Some(epic_id) = filter.epic_id {
            q = q.bind(epic_id.to_string());
        }
        if let Some(done) = filter.done {
            q = q.bind(done);
        }

        let rows: Vec<TaskRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn list_pending_for_project(&self, project_id: Uuid) -> DomainResult<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            r#"SELECT t.id, t.epic_id, t.description, t.action, t.priority, t.done, t.depends_on, t.metadata
               FROM tasks t
               JOIN epics e ON e.id = t.epic_id
               WHERE e.project_id = ? AND t.done = 0
               ORDER BY t.priority DESC"#,
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    epic_id: String,
    description: String,
    action: String,
    priority: i32,
    done: bool,
    depends_on: String,
    metadata: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = DomainError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let id = super::parse_uuid(&row.id)?;
        let epic_id = super::parse_uuid(&row.epic_id)?;
        let depends_on: Vec<Dependency> = super::parse_json_or_default(Some(row.depends_on))?;
        let metadata = super::parse_json_value(&row.metadata)?;

        Ok(Task {
            id,
            epic_id,
            description: row.description,
            action: row.action,
            priority: row.priority,
            done: row.done,
            depends_on,
            metadata,
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

    async fn seed_epic(pool: &SqlitePool) -> Uuid {
        let projects = SqliteProjectRepository::new(pool.clone());
        let project = Project::new("demo", PathBuf::from("/work/demo"));
        projects.create(&project).await.unwrap();

        let epics = SqliteEpicRepository::new(pool.clone());
        let epic = Epic::new(project.id, "api", 1);
        epics.create(&epic).await.unwrap();

        epic.id
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let pool = create_migrated_test_pool().await.unwrap();
        let epic_id = seed_epic(&pool).await;
        let repo = SqliteTaskRepository::new(pool);

        let task = Task::new(epic_id, "wire up router", "edit src/router.rs", 3);
        repo.create(&task).await.unwrap();

        let loaded = repo.get(task.id).await.unwrap().unwrap();
        assert_eq!(loaded.description, "wire up router");
        assert!(!loaded.done);
    }

    #[tokio::test]
    async fn list_filters_by_done() {
        let pool = create_migrated_test_pool().await.unwrap();
        let epic_id = seed_epic(&pool).await;
        let repo = SqliteTaskRepository::new(pool);

        let mut done_task = Task::new(epic_id, "finished", "edit a", 1);
        done_task.mark_done();
        let pending_task = Task::new(epic_id, "pending", "edit b", 1);
        repo.create(&done_task).await.unwrap();
        repo.create(&pending_task).await.unwrap();

        let pending = repo.list(TaskFilter { epic_id: Some(epic_id), done: Some(false) }).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].description, "pending");
    }

    #[tokio::test]
    async fn list_pending_for_project_joins_through_epic() {
        let pool = create_migrated_test_pool().await.unwrap();
        let epic_id = seed_epic(&pool).await;
        let repo = SqliteTaskRepository::new(pool.clone());

        let task = Task::new(epic_id, "wire up router", "edit src/router.rs", 3);
        repo.create(&task).await.unwrap();

        let epics = SqliteEpicRepository::new(pool.clone());
        let epic = epics.get(epic_id).await.unwrap().unwrap();

        let pending = repo.list_pending_for_project(epic.project_id).await.unwrap();
        assert_eq!(pending.len(), 1);
    }
}
