use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Sweep-triggered reminder.
    Reminder,
    /// Reminder fired inline by a create or update.
    DueSoon,
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Reminder => "reminder",
            NotificationKind::DueSoon => "due_soon",
            NotificationKind::TaskCreated => "task_created",
            NotificationKind::TaskUpdated => "task_updated",
            NotificationKind::TaskDeleted => "task_deleted",
        }
    }

    pub fn is_reminder(&self) -> bool {
        matches!(self, NotificationKind::Reminder | NotificationKind::DueSoon)
    }
}

/// Event fanned out to every connected subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub task_id: Uuid,
    pub owner_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
