use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::notification::NotificationDispatcher;
use crate::reminder::{evaluate, Clock, ReminderState};
use super::task_dto::{CreateTaskRequest, UpdateTaskRequest};
use super::task_models::{NewTask, Task, TaskChanges, TaskStatus, DEFAULT_COLOR};
use super::task_store::TaskStore;

/// Service layer for task-related business logic.
///
/// Create and update run the reminder evaluator inline and go through the same
/// claim as the sweep, so a near-deadline task is reminded exactly once no
/// matter which side gets there first.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    default_lead_minutes: i32,
}

impl TaskService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        default_lead_minutes: i32,
    ) -> Self {
        Self {
            store,
            dispatcher,
            clock,
            default_lead_minutes,
        }
    }

    pub async fn list_tasks(&self, owner_id: Uuid, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        self.store.list_tasks(owner_id, status).await
    }

    pub async fn get_task(&self, owner_id: Uuid, task_id: Uuid) -> Result<Task> {
        self.store
            .get_task(task_id, owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".into()))
    }

    pub async fn create_task(&self, owner_id: Uuid, payload: CreateTaskRequest) -> Result<Task> {
        let task = self
            .store
            .create_task(NewTask {
                owner_id,
                title: payload.title,
                description: payload.description,
                color: payload.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
                deadline: payload.deadline,
                reminder_lead_minutes: payload.reminder_lead_minutes.unwrap_or(self.default_lead_minutes),
            })
            .await?;

        self.dispatcher.announce_created(&task);
        Ok(self.remind_if_due(task).await)
    }

    pub async fn update_task(
        &self,
        owner_id: Uuid,
        task_id: Uuid,
        payload: UpdateTaskRequest,
    ) -> Result<Task> {
        if payload.status == Some(TaskStatus::Pending) {
            self.ensure_not_completed(owner_id, task_id).await?;
        }

        let changes = TaskChanges {
            title: payload.title,
            description: payload.description,
            color: payload.color,
            deadline: payload.deadline,
            reminder_lead_minutes: payload.reminder_lead_minutes,
            status: payload.status,
        };

        let task = self
            .store
            .update_task(task_id, owner_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

        self.dispatcher.announce_updated(&task);
        Ok(self.remind_if_due(task).await)
    }

    pub async fn update_status(&self, owner_id: Uuid, task_id: Uuid, status: TaskStatus) -> Result<Task> {
        match status {
            TaskStatus::Completed => {
                let task = self
                    .store
                    .complete_task(task_id, owner_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
                self.dispatcher.announce_updated(&task);
                Ok(task)
            }
            TaskStatus::Pending => {
                // pending -> pending is a no-op; completed -> pending is refused
                self.ensure_not_completed(owner_id, task_id).await?;
                self.get_task(owner_id, task_id).await
            }
        }
    }

    pub async fn delete_task(&self, owner_id: Uuid, task_id: Uuid) -> Result<u64> {
        let rows_affected = self.store.delete_task(task_id, owner_id).await?;
        if rows_affected > 0 {
            self.dispatcher.announce_deleted(task_id, owner_id);
        }
        Ok(rows_affected)
    }

    async fn ensure_not_completed(&self, owner_id: Uuid, task_id: Uuid) -> Result<()> {
        let current = self.get_task(owner_id, task_id).await?;
        if current.status == TaskStatus::Completed {
            return Err(AppError::BadRequest("Completed tasks cannot be reopened".into()));
        }
        Ok(())
    }

    /// Claims and dispatches the reminder when `task` is already inside its
    /// window. Store errors are logged, not returned: the task was saved and
    /// the next sweep tick picks it up.
    async fn remind_if_due(&self, mut task: Task) -> Task {
        let now = self.clock.now();
        if evaluate(&task, now) != ReminderState::Eligible {
            return task;
        }

        match self.store.claim_reminder(task.id, now).await {
            Ok(true) => {
                task.reminded_at = Some(now);
                task.notification_count += 1;
                // delivery failures are logged by the dispatcher; the claim stands
                let _ = self.dispatcher.dispatch_due_soon(&task);
            }
            Ok(false) => {
                debug!(task_id = %task.id, "Reminder already claimed by the sweep");
                if let Ok(Some(current)) = self.store.get_task(task.id, task.owner_id).await {
                    task = current;
                }
            }
            Err(e) => {
                warn!(task_id = %task.id, "Inline reminder claim failed, leaving it to the sweep: {:?}", e);
            }
        }

        task
    }
}
