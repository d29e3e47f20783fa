use axum::{
    routing::{get, patch},
    Router,
};

use crate::state::AppState;
use super::task_handlers;

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(task_handlers::get_tasks).post(task_handlers::create_task))
        .route(
            "/:id",
            get(task_handlers::get_task)
                .put(task_handlers::update_task)
                .delete(task_handlers::delete_task),
        )
        .route("/:id/status", patch(task_handlers::update_task_status))
}
