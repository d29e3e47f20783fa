use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use super::task_models::{NewTask, Task, TaskChanges, TaskStatus};
use super::task_store::{CandidateWindow, TaskStore};

/// PostgreSQL-backed [`TaskStore`].
#[derive(Clone)]
pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskRepository {
    async fn find_reminder_candidates(
        &self,
        now: DateTime<Utc>,
        window: CandidateWindow,
    ) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks
             WHERE status = 'pending'
               AND reminded_at IS NULL
               AND notification_count < 1
               AND deadline > $1
               AND deadline <= $2
             ORDER BY deadline ASC"
        )
        .bind(now - window.lookback)
        .bind(now + window.horizon)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    async fn claim_reminder(&self, task_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE tasks SET
                reminded_at = $2,
                notification_count = notification_count + 1
             WHERE id = $1
               AND status = 'pending'
               AND reminded_at IS NULL
               AND notification_count < 1"
        )
        .bind(task_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_task(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn list_tasks(&self, owner_id: Uuid, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        let mut query = "SELECT * FROM tasks WHERE owner_id = $1".to_string();
        if status.is_some() {
            query.push_str(" AND status = $2");
        }
        query.push_str(" ORDER BY deadline ASC");

        let mut db_query = sqlx::query_as::<_, Task>(&query).bind(owner_id);
        if let Some(status) = status {
            db_query = db_query.bind(status);
        }

        let tasks = db_query.fetch_all(&self.pool).await?;
        Ok(tasks)
    }

    async fn create_task(&self, task: NewTask) -> Result<Task> {
        let task = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (owner_id, title, description, color, deadline, reminder_lead_minutes, status, notification_count)
             VALUES ($1, $2, $3, $4, $5, $6, 'pending', 0)
             RETURNING *"
        )
        .bind(task.owner_id)
        .bind(task.title)
        .bind(task.description)
        .bind(task.color)
        .bind(task.deadline)
        .bind(task.reminder_lead_minutes)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    async fn update_task(&self, id: Uuid, owner_id: Uuid, changes: TaskChanges) -> Result<Option<Task>> {
        // Edits never re-arm: reminded_at and notification_count are left alone.
        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                color = COALESCE($3, color),
                deadline = COALESCE($4, deadline),
                reminder_lead_minutes = COALESCE($5, reminder_lead_minutes),
                status = CASE WHEN status = 'completed' THEN status ELSE COALESCE($6, status) END,
                updated_at = NOW()
             WHERE id = $7 AND owner_id = $8
             RETURNING *"
        )
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.color)
        .bind(changes.deadline)
        .bind(changes.reminder_lead_minutes)
        .bind(changes.status)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn complete_task(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET status = 'completed', updated_at = NOW()
             WHERE id = $1 AND owner_id = $2
             RETURNING *"
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn delete_task(&self, id: Uuid, owner_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
