use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::stream::Stream;
use std::convert::Infallible;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use uuid::Uuid;

use crate::state::AppState;

/// Subscribe to real-time notifications via Server-Sent Events.
///
/// Every subscriber receives every notification published while it is
/// connected; nothing is replayed on reconnect.
#[utoipa::path(
    get,
    path = "/api/notifications/stream",
    responses(
        (status = 200, description = "SSE stream of notifications"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn notification_stream(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.notification_hub.subscribe();
    tracing::info!(
        %user_id,
        subscribers = state.notification_hub.subscriber_count(),
        "Notification stream opened"
    );

    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(notification) => {
            let json = serde_json::to_string(&notification).ok()?;
            Some(Ok(Event::default().event(notification.kind.as_str()).data(json)))
        }
        Err(e) => {
            tracing::warn!(%user_id, "Notification stream lagging: {}", e);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
