use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::Result;
use super::task_models::{NewTask, Task, TaskChanges, TaskStatus};

/// Bounds of the cheap pre-filter the sweep asks the store for.
///
/// A candidate has `now - lookback < deadline <= now + horizon`. The horizon
/// must be at least the largest lead time in use or windows would open before
/// the task is ever looked at.
#[derive(Debug, Clone, Copy)]
pub struct CandidateWindow {
    pub horizon: Duration,
    pub lookback: Duration,
}

impl CandidateWindow {
    pub fn contains(&self, deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        deadline > now - self.lookback && deadline <= now + self.horizon
    }
}

/// Durable record of tasks and their reminder state.
///
/// Reminder state (`reminded_at`, `notification_count`) is only ever written
/// by [`TaskStore::claim_reminder`]; CRUD methods leave it alone.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Pending, un-reminded tasks whose deadline falls in `window` around `now`.
    async fn find_reminder_candidates(
        &self,
        now: DateTime<Utc>,
        window: CandidateWindow,
    ) -> Result<Vec<Task>>;

    /// Atomically flips a task from un-reminded to reminded.
    ///
    /// Returns `true` for exactly one caller per task; every other caller,
    /// concurrent or later, gets `false` and must not dispatch.
    async fn claim_reminder(&self, task_id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    async fn get_task(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Task>>;

    async fn list_tasks(&self, owner_id: Uuid, status: Option<TaskStatus>) -> Result<Vec<Task>>;

    async fn create_task(&self, task: NewTask) -> Result<Task>;

    /// Applies `changes`; a completed task is never moved back to pending.
    async fn update_task(&self, id: Uuid, owner_id: Uuid, changes: TaskChanges) -> Result<Option<Task>>;

    async fn complete_task(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Task>>;

    async fn delete_task(&self, id: Uuid, owner_id: Uuid) -> Result<u64>;
}
