use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, Result};
use super::task_models::TaskStatus;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub deadline: DateTime<Utc>,
    pub reminder_lead_minutes: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub reminder_lead_minutes: Option<i32>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    /// Filter by status (pending, completed)
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeadOptionsResponse {
    pub options: Vec<i32>,
    pub default: i32,
}

/// Checks the fields the derive can't express: the lead time must be one of
/// the offered options and colors are `#rrggbb`.
pub fn validate_reminder_fields(
    reminder_lead_minutes: Option<i32>,
    color: Option<&str>,
    lead_options: &[i32],
) -> Result<()> {
    if let Some(lead) = reminder_lead_minutes {
        if !lead_options.contains(&lead) {
            return Err(AppError::Validation(format!(
                "reminder_lead_minutes must be one of {:?}",
                lead_options
            )));
        }
    }

    if let Some(color) = color {
        let is_hex = color.len() == 7
            && color.starts_with('#')
            && color[1..].chars().all(|c| c.is_ascii_hexdigit());
        if !is_hex {
            return Err(AppError::Validation(format!(
                "color must be a #rrggbb hex value, got {:?}",
                color
            )));
        }
    }

    Ok(())
}
