use axum::{routing::get, Router};

use crate::{state::AppState, websocket};
use super::notification_handlers;

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/stream", get(notification_handlers::notification_stream))
        .route("/ws", get(websocket::ws_handler))
}
