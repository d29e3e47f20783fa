use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, Result};
use super::task_models::{NewTask, Task, TaskChanges, TaskStatus, DEFAULT_COLOR};
use super::task_store::{CandidateWindow, TaskStore};

/// In-process [`TaskStore`] for tests, with hooks to simulate an unavailable
/// store and slow claims.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<Uuid, Task>>,
    fail_candidate_queries: AtomicBool,
    failing_claims: Mutex<HashSet<Uuid>>,
    claim_delay: Option<std::time::Duration>,
    claim_attempts: AtomicUsize,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every claim sleeps for `delay` before touching the row.
    pub fn with_claim_delay(mut self, delay: std::time::Duration) -> Self {
        self.claim_delay = Some(delay);
        self
    }

    pub fn insert(&self, task: Task) {
        self.tasks.lock().unwrap().insert(task.id, task);
    }

    pub fn snapshot(&self, id: Uuid) -> Option<Task> {
        self.tasks.lock().unwrap().get(&id).cloned()
    }

    pub fn set_candidate_queries_failing(&self, failing: bool) {
        self.fail_candidate_queries.store(failing, Ordering::SeqCst);
    }

    pub fn fail_claims_for(&self, id: Uuid) {
        self.failing_claims.lock().unwrap().insert(id);
    }

    pub fn claim_attempts(&self) -> usize {
        self.claim_attempts.load(Ordering::SeqCst)
    }
}

/// A pending, un-reminded task owned by `owner_id`.
pub fn sample_task(owner_id: Uuid, deadline: DateTime<Utc>, reminder_lead_minutes: i32) -> Task {
    let now = Utc::now();
    Task {
        id: Uuid::new_v4(),
        owner_id,
        title: "Write report".to_string(),
        description: None,
        color: DEFAULT_COLOR.to_string(),
        deadline,
        reminder_lead_minutes,
        status: TaskStatus::Pending,
        reminded_at: None,
        notification_count: 0,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find_reminder_candidates(
        &self,
        now: DateTime<Utc>,
        window: CandidateWindow,
    ) -> Result<Vec<Task>> {
        if self.fail_candidate_queries.load(Ordering::SeqCst) {
            return Err(AppError::InternalError);
        }

        let mut candidates: Vec<Task> = self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| {
                t.status == TaskStatus::Pending
                    && t.reminded_at.is_none()
                    && t.notification_count < 1
                    && window.contains(t.deadline, now)
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|t| t.deadline);
        Ok(candidates)
    }

    async fn claim_reminder(&self, task_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        self.claim_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.claim_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_claims.lock().unwrap().contains(&task_id) {
            return Err(AppError::InternalError);
        }

        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get_mut(&task_id) {
            Some(task)
                if task.status == TaskStatus::Pending
                    && task.reminded_at.is_none()
                    && task.notification_count < 1 =>
            {
                task.reminded_at = Some(now);
                task.notification_count += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_task(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .get(&id)
            .filter(|t| t.owner_id == owner_id)
            .cloned())
    }

    async fn list_tasks(&self, owner_id: Uuid, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.owner_id == owner_id && status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.deadline);
        Ok(tasks)
    }

    async fn create_task(&self, task: NewTask) -> Result<Task> {
        let mut created = sample_task(task.owner_id, task.deadline, task.reminder_lead_minutes);
        created.title = task.title;
        created.description = task.description;
        created.color = task.color;
        self.insert(created.clone());
        Ok(created)
    }

    async fn update_task(&self, id: Uuid, owner_id: Uuid, changes: TaskChanges) -> Result<Option<Task>> {
        let mut tasks = self.tasks.lock().unwrap();
        let Some(task) = tasks.get_mut(&id).filter(|t| t.owner_id == owner_id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = Some(description);
        }
        if let Some(color) = changes.color {
            task.color = color;
        }
        if let Some(deadline) = changes.deadline {
            task.deadline = deadline;
        }
        if let Some(lead) = changes.reminder_lead_minutes {
            task.reminder_lead_minutes = lead;
        }
        if let Some(status) = changes.status {
            if task.status != TaskStatus::Completed {
                task.status = status;
            }
        }
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn complete_task(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Task>> {
        let mut tasks = self.tasks.lock().unwrap();
        Ok(tasks.get_mut(&id).filter(|t| t.owner_id == owner_id).map(|task| {
            task.status = TaskStatus::Completed;
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn delete_task(&self, id: Uuid, owner_id: Uuid) -> Result<u64> {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get(&id) {
            Some(task) if task.owner_id == owner_id => {
                tasks.remove(&id);
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exactly_one_concurrent_claim_wins() {
        let store = Arc::new(InMemoryTaskStore::new());
        let now = Utc::now();
        let task = sample_task(Uuid::new_v4(), now + Duration::minutes(5), 15);
        let task_id = task.id;
        store.insert(task);

        let attempts: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.claim_reminder(task_id, now).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for attempt in attempts {
            if attempt.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        let stored = store.snapshot(task_id).unwrap();
        assert_eq!(stored.notification_count, 1);
        assert_eq!(stored.reminded_at, Some(now));
    }

    #[tokio::test]
    async fn test_claim_refuses_completed_task() {
        let store = InMemoryTaskStore::new();
        let now = Utc::now();
        let mut task = sample_task(Uuid::new_v4(), now + Duration::minutes(5), 15);
        task.status = TaskStatus::Completed;
        let task_id = task.id;
        store.insert(task);

        assert!(!store.claim_reminder(task_id, now).await.unwrap());
        assert_eq!(store.snapshot(task_id).unwrap().notification_count, 0);
    }

    #[tokio::test]
    async fn test_candidates_respect_window_and_reminder_state() {
        let store = InMemoryTaskStore::new();
        let now = Utc::now();
        let owner = Uuid::new_v4();
        let window = CandidateWindow {
            horizon: Duration::minutes(60),
            lookback: Duration::minutes(1),
        };

        let inside = sample_task(owner, now + Duration::minutes(30), 15);
        let beyond_horizon = sample_task(owner, now + Duration::minutes(90), 60);
        let long_gone = sample_task(owner, now - Duration::minutes(10), 15);
        let mut reminded = sample_task(owner, now + Duration::minutes(5), 15);
        reminded.reminded_at = Some(now);
        reminded.notification_count = 1;

        let inside_id = inside.id;
        for task in [inside, beyond_horizon, long_gone, reminded] {
            store.insert(task);
        }

        let candidates = store.find_reminder_candidates(now, window).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, inside_id);
    }
}
