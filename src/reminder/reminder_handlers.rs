use axum::{extract::State, Json};

use crate::{state::AppState, task::LeadOptionsResponse};

/// Reminder lead times a task may be created with
#[utoipa::path(
    get,
    path = "/api/reminders/lead-options",
    responses(
        (status = 200, description = "Allowed reminder lead minutes", body = LeadOptionsResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "reminders",
    security(("bearer_auth" = []))
)]
pub async fn get_lead_options(State(state): State<AppState>) -> Json<LeadOptionsResponse> {
    Json(LeadOptionsResponse {
        options: state.config.reminder_lead_options.clone(),
        default: state.config.default_lead_minutes(),
    })
}
