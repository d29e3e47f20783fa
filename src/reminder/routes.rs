use axum::{routing::get, Router};

use crate::state::AppState;
use super::reminder_handlers;

pub fn reminder_routes() -> Router<AppState> {
    Router::new().route("/lead-options", get(reminder_handlers::get_lead_options))
}
