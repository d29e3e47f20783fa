use chrono::{DateTime, Duration, Utc};

use crate::task::{Task, TaskStatus};

/// Where a task stands relative to its single reminder at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    /// Window `[deadline - lead, deadline)` has not opened yet.
    NotYet,
    /// Inside the window and never reminded: may be claimed.
    Eligible,
    /// Deadline passed without the reminder firing. Never acted on.
    Expired,
    /// Reminder already claimed; edits do not re-arm it.
    AlreadyReminded,
    /// Completed tasks never fire.
    Inactive,
}

/// Start of the reminder window. Negative leads are treated as zero.
pub fn window_start(task: &Task) -> DateTime<Utc> {
    task.deadline - Duration::minutes(i64::from(task.reminder_lead_minutes.max(0)))
}

pub fn evaluate(task: &Task, now: DateTime<Utc>) -> ReminderState {
    if task.status != TaskStatus::Pending {
        return ReminderState::Inactive;
    }
    if task.reminded_at.is_some() || task.notification_count >= 1 {
        return ReminderState::AlreadyReminded;
    }
    if now >= task.deadline {
        return ReminderState::Expired;
    }
    if now >= window_start(task) {
        ReminderState::Eligible
    } else {
        ReminderState::NotYet
    }
}
