use anyhow::Context;
use deadline_reminder::{
    db::{create_pool, run_migrations},
    notification::{Broadcaster, NotificationDispatcher, NotificationHub},
    reminder::{ReminderScheduler, Sweeper, SystemClock},
    routes::create_router,
    state::{AppState, Config},
    task::{PgTaskRepository, TaskService},
};
use std::future::IntoFuture;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,deadline_reminder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    tracing::info!("Connecting to database...");
    let db = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to the database")?;

    tracing::info!("Running migrations...");
    run_migrations(&db).await.context("failed to run migrations")?;

    // Shared collaborators
    let clock = Arc::new(SystemClock);
    let notification_hub = NotificationHub::new(config.notification_channel_capacity);
    let task_store = Arc::new(PgTaskRepository::new(db.clone()));
    let broadcaster: Arc<dyn Broadcaster> = Arc::new(notification_hub.clone());
    let dispatcher = NotificationDispatcher::new(broadcaster, clock.clone());

    let task_service = TaskService::new(
        task_store.clone(),
        dispatcher.clone(),
        clock.clone(),
        config.default_lead_minutes(),
    );

    // Start reminder sweep
    let scheduler = ReminderScheduler::new(Sweeper::new(
        task_store,
        dispatcher,
        clock,
        config.sweep_settings(),
    ));
    scheduler.start().await.context("failed to start reminder scheduler")?;

    let state = AppState {
        config: config.clone(),
        notification_hub,
        task_service,
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    // Notification streams never end on their own, so in-flight connections
    // are not drained on shutdown.
    tokio::select! {
        result = axum::serve(listener, app).into_future() => result?,
        _ = shutdown_signal() => {}
    }

    scheduler.stop().await?;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
