//! Task persistence: the `TaskStore` trait and its PostgreSQL implementation.
//!
//! The engine only talks to this trait. All row mutations for one task come
//! from that task's single executor, so the store does not need row-level
//! locking beyond ordinary transactional updates.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::task::{ItemStatusCounts, Task, TaskItem, TaskItemStatus, TaskStatus};

/// Persistence operations the task engine needs.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_task(&self, id: Uuid) -> Result<Option<Task>>;

    async fn tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>>;

    async fn update_status(&self, id: Uuid, status: TaskStatus) -> Result<()>;

    async fn update_status_message(&self, id: Uuid, status: TaskStatus, message: &str)
        -> Result<()>;

    async fn mark_started(&self, id: Uuid) -> Result<()>;

    async fn mark_completed(&self, id: Uuid) -> Result<()>;

    async fn update_progress(
        &self,
        id: Uuid,
        progress: f64,
        processed: i32,
        success: i32,
        failed: i32,
    ) -> Result<()>;

    /// Items of one task in a stable order (creation order).
    async fn items_by_status(&self, task_id: Uuid, status: TaskItemStatus)
        -> Result<Vec<TaskItem>>;

    async fn mark_item_processing(&self, item_id: Uuid) -> Result<()>;

    async fn complete_item(&self, item_id: Uuid, output: serde_json::Value) -> Result<()>;

    async fn fail_item(&self, item_id: Uuid, error: &str) -> Result<()>;

    /// Crash recovery: force any `processing` items of this task back to
    /// `pending`. Returns how many rows were reset.
    async fn reset_processing_items(&self, task_id: Uuid) -> Result<u64>;

    async fn item_status_counts(&self, task_id: Uuid) -> Result<ItemStatusCounts>;
}

/// PostgreSQL-backed task store.
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn find_task(&self, id: Uuid) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, title, status, total_items, processed_items, success_items,
                   failed_items, progress, message, config, started_at, completed_at,
                   created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, title, status, total_items, processed_items, success_items,
                   failed_items, progress, message, config, started_at, completed_at,
                   created_at, updated_at
            FROM tasks
            WHERE status = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    async fn update_status(&self, id: Uuid, status: TaskStatus) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET status = $1,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(status)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_status_message(
        &self,
        id: Uuid,
        status: TaskStatus,
        message: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET status = $1,
                message = $2,
                updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(status)
        .bind(message)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_started(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET started_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_completed(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_progress(
        &self,
        id: Uuid,
        progress: f64,
        processed: i32,
        success: i32,
        failed: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET progress = $1,
                processed_items = $2,
                success_items = $3,
                failed_items = $4,
                updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(progress)
        .bind(processed)
        .bind(success)
        .bind(failed)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn items_by_status(
        &self,
        task_id: Uuid,
        status: TaskItemStatus,
    ) -> Result<Vec<TaskItem>> {
        let items = sqlx::query_as::<_, TaskItem>(
            r#"
            SELECT id, task_id, status, input, output, error_message, processed_at, created_at
            FROM task_items
            WHERE task_id = $1 AND status = $2
            ORDER BY created_at, id
            "#,
        )
        .bind(task_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn mark_item_processing(&self, item_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE task_items
            SET status = $1
            WHERE id = $2
            "#,
        )
        .bind(TaskItemStatus::Processing)
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn complete_item(&self, item_id: Uuid, output: serde_json::Value) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE task_items
            SET status = $1,
                output = $2,
                error_message = NULL,
                processed_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(TaskItemStatus::Success)
        .bind(output)
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fail_item(&self, item_id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE task_items
            SET status = $1,
                error_message = $2,
                processed_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(TaskItemStatus::Failed)
        .bind(error)
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn reset_processing_items(&self, task_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE task_items
            SET status = $1
            WHERE task_id = $2 AND status = $3
            "#,
        )
        .bind(TaskItemStatus::Pending)
        .bind(task_id)
        .bind(TaskItemStatus::Processing)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn item_status_counts(&self, task_id: Uuid) -> Result<ItemStatusCounts> {
        let counts = sqlx::query_as::<_, ItemStatusCounts>(
            r#"
            SELECT COUNT(*)                                        AS total,
                   COUNT(*) FILTER (WHERE status = 'pending')      AS pending,
                   COUNT(*) FILTER (WHERE status = 'processing')   AS processing,
                   COUNT(*) FILTER (WHERE status = 'success')      AS success,
                   COUNT(*) FILTER (WHERE status = 'failed')       AS failed
            FROM task_items
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}
