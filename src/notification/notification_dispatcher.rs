use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::reminder::Clock;
use crate::task::Task;
use super::notification_hub::{Broadcaster, DispatchError};
use super::notification_models::{Notification, NotificationKind};

/// Turns claimed tasks and task lifecycle changes into notifications.
#[derive(Clone)]
pub struct NotificationDispatcher {
    broadcaster: Arc<dyn Broadcaster>,
    clock: Arc<dyn Clock>,
}

impl NotificationDispatcher {
    pub fn new(broadcaster: Arc<dyn Broadcaster>, clock: Arc<dyn Clock>) -> Self {
        Self { broadcaster, clock }
    }

    /// Sweep-triggered reminder. The minute count is taken now, at dispatch.
    pub fn dispatch_reminder(&self, task: &Task) -> Result<usize, DispatchError> {
        let now = self.clock.now();
        let message = reminder_message(task, now);
        self.publish(NotificationKind::Reminder, task.id, task.owner_id, message, now)
    }

    /// Reminder fired inline when a create or edit lands inside the window.
    pub fn dispatch_due_soon(&self, task: &Task) -> Result<usize, DispatchError> {
        let message = due_soon_message(task);
        self.publish(NotificationKind::DueSoon, task.id, task.owner_id, message, self.clock.now())
    }

    pub fn announce_created(&self, task: &Task) {
        let message = format!("New task added: {}", task.title);
        self.announce(NotificationKind::TaskCreated, task.id, task.owner_id, message);
    }

    pub fn announce_updated(&self, task: &Task) {
        let message = format!("Task \"{}\" updated successfully", task.title);
        self.announce(NotificationKind::TaskUpdated, task.id, task.owner_id, message);
    }

    pub fn announce_deleted(&self, task_id: Uuid, owner_id: Uuid) {
        let message = format!("Task {} deleted", task_id);
        self.announce(NotificationKind::TaskDeleted, task_id, owner_id, message);
    }

    fn announce(&self, kind: NotificationKind, task_id: Uuid, owner_id: Uuid, message: String) {
        if let Err(e) = self.publish(kind, task_id, owner_id, message, self.clock.now()) {
            debug!(%task_id, kind = kind.as_str(), "Task notice not delivered: {}", e);
        }
    }

    fn publish(
        &self,
        kind: NotificationKind,
        task_id: Uuid,
        owner_id: Uuid,
        message: String,
        now: DateTime<Utc>,
    ) -> Result<usize, DispatchError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            task_id,
            owner_id,
            message,
            created_at: now,
        };

        match self.broadcaster.publish(notification) {
            Ok(receivers) => {
                if kind.is_reminder() {
                    info!(%task_id, kind = kind.as_str(), receivers, "Reminder dispatched");
                }
                Ok(receivers)
            }
            Err(e) => {
                if kind.is_reminder() {
                    warn!(%task_id, kind = kind.as_str(), "Reminder claimed but not delivered: {}", e);
                }
                Err(e)
            }
        }
    }
}

/// `ceil((deadline - now) / 1 min)`, never negative.
pub fn minutes_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (deadline - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis + 59_999) / 60_000
    }
}

fn format_deadline(deadline: DateTime<Utc>) -> String {
    deadline.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn reminder_message(task: &Task, now: DateTime<Utc>) -> String {
    format!(
        "Reminder: Task \"{}\" is due in {} minutes! Deadline: {}",
        task.title,
        minutes_until(task.deadline, now),
        format_deadline(task.deadline)
    )
}

pub fn due_soon_message(task: &Task) -> String {
    format!(
        "Reminder: Task \"{}\" is due soon! Deadline: {}",
        task.title,
        format_deadline(task.deadline)
    )
}
