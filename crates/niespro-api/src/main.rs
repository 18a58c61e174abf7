//! NiesPro order API server entry point.

use std::sync::Arc;

use niespro_api::config::AppConfig;
use niespro_api::error::AppError;
use niespro_api::state::AppState;
use niespro_api::telemetry;
use niespro_core::clock::{Clock, SystemClock};
use niespro_core::dispatch::{EventDispatcher, LoggingSubscriber};
use niespro_core::repository::EventRepository;
use niespro_core::store::EventStore;
use niespro_event_store::in_memory::InMemoryEventRepository;
use niespro_event_store::pg_event_repository::PgEventRepository;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let _telemetry = telemetry::init(&config)?;

    tracing::info!(service = telemetry::SERVICE_NAME, "starting NiesPro order API server");

    let event_repository: Arc<dyn EventRepository> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(database_url)
                .await?;
            let repository = PgEventRepository::new(pool);
            repository.migrate().await?;
            tracing::info!(
                max_connections = config.max_connections,
                "using PostgreSQL event store"
            );
            Arc::new(repository)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, events are kept in memory only");
            Arc::new(InMemoryEventRepository::new())
        }
    };

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(SystemClock);
    let dispatcher = EventDispatcher::new().with_subscriber(Arc::new(LoggingSubscriber));
    let app_state = AppState::new(clock, EventStore::new(event_repository), dispatcher);

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = niespro_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
