use crate::{
    middleware::auth_middleware,
    notification::{self, Notification, NotificationKind},
    reminder,
    state::AppState,
    task::{self, CreateTaskRequest, LeadOptionsResponse, Task, TaskStatus, UpdateTaskRequest, UpdateTaskStatusRequest},
    websocket,
};
use axum::{middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        task::task_handlers::get_tasks,
        task::task_handlers::get_task,
        task::task_handlers::create_task,
        task::task_handlers::update_task,
        task::task_handlers::delete_task,
        task::task_handlers::update_task_status,
        notification::notification_handlers::notification_stream,
        websocket::handler::ws_handler,
        reminder::reminder_handlers::get_lead_options,
    ),
    components(
        schemas(
            CreateTaskRequest,
            UpdateTaskRequest,
            UpdateTaskStatusRequest,
            LeadOptionsResponse,
            Task,
            TaskStatus,
            Notification,
            NotificationKind,
        )
    ),
    tags(
        (name = "tasks", description = "Task management endpoints"),
        (name = "notifications", description = "Real-time notification subscriptions"),
        (name = "reminders", description = "Reminder settings")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            )
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Everything under /api requires a bearer token
    let api_routes = Router::new()
        .nest("/tasks", task::routes::task_routes())
        .nest("/notifications", notification::routes::notification_routes())
        .nest("/reminders", reminder::routes::reminder_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::create_access_token;
    use crate::notification::{NotificationDispatcher, NotificationHub};
    use crate::reminder::ManualClock;
    use crate::state::Config;
    use crate::task::task_memory_store::InMemoryTaskStore;
    use crate::task::TaskService;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "test-secret";

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-14T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn test_state() -> AppState {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://unused".to_string()),
            "JWT_SECRET" => Some(SECRET.to_string()),
            _ => None,
        })
        .unwrap();

        let store = Arc::new(InMemoryTaskStore::new());
        let clock = Arc::new(ManualClock::new(start()));
        let hub = NotificationHub::new(32);
        let dispatcher = NotificationDispatcher::new(Arc::new(hub.clone()), clock.clone());
        let task_service = TaskService::new(store, dispatcher, clock, config.default_lead_minutes());

        AppState {
            config: Arc::new(config),
            notification_hub: hub,
            task_service,
        }
    }

    fn bearer(owner: Uuid) -> String {
        format!("Bearer {}", create_access_token(owner, SECRET, Duration::minutes(15)))
    }

    fn json_request(method: &str, uri: &str, owner: Uuid, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, bearer(owner))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_requires_bearer_token() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/api/tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_near_deadline_task_reminds_subscribers_once() {
        let state = test_state();
        let mut rx = state.notification_hub.subscribe();
        let app = create_router(state);
        let owner = Uuid::new_v4();

        let deadline = start() + Duration::minutes(10);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/tasks",
                owner,
                json!({ "title": "Call the bank", "deadline": deadline, "reminder_lead_minutes": 15 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let task = body_json(response).await;
        assert_eq!(task["notification_count"], 1);
        assert_eq!(task["status"], "pending");
        assert_eq!(task["owner_id"], owner.to_string());

        let mut kinds = Vec::new();
        while let Ok(n) = rx.try_recv() {
            kinds.push(n.kind);
        }
        assert_eq!(kinds, vec![NotificationKind::TaskCreated, NotificationKind::DueSoon]);
    }

    #[tokio::test]
    async fn test_create_rejects_unoffered_lead() {
        let app = create_router(test_state());
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/tasks",
                Uuid::new_v4(),
                json!({ "title": "Call the bank", "deadline": start(), "reminder_lead_minutes": 20 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_task_lifecycle_over_http() {
        let app = create_router(test_state());
        let owner = Uuid::new_v4();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/tasks",
                owner,
                json!({ "title": "Renew passport", "deadline": start() + Duration::days(3), "color": "#ccffcc" }),
            ))
            .await
            .unwrap();
        let created = body_json(response).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["reminder_lead_minutes"], 60);

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/api/tasks/{}/status", id),
                owner,
                json!({ "status": "completed" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/tasks/{}", id),
                owner,
                json!({ "status": "pending" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/tasks?status=completed")
                    .header(header::AUTHORIZATION, bearer(owner))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/tasks/{}", id))
                    .header(header::AUTHORIZATION, bearer(owner))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/tasks/{}", id))
                    .header(header::AUTHORIZATION, bearer(owner))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_status_filter_is_bad_request() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/tasks?status=archived")
                    .header(header::AUTHORIZATION, bearer(Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_lead_options() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/reminders/lead-options")
                    .header(header::AUTHORIZATION, bearer(Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, json!({ "options": [15, 30, 45, 60], "default": 60 }));
    }
}
