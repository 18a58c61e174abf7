//! Read-only routes over the raw event log.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use niespro_core::error::DomainError;
use niespro_core::repository::StoredEvent;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Query string for GET /{aggregate_id}.
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    /// Only events with a version strictly greater than this are returned.
    #[serde(default)]
    pub from_version: i64,
}

/// Query string for GET /by-type/{event_type}.
#[derive(Debug, Default, Deserialize)]
pub struct ByTypeQuery {
    /// Only events that occurred at or after this instant are returned.
    pub from: Option<DateTime<Utc>>,
}

/// Response body for GET /{aggregate_id}/version.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    /// The aggregate queried.
    pub aggregate_id: Uuid,
    /// Highest stored version, 0 when the aggregate has no events.
    pub version: i64,
    /// Whether any event exists for the aggregate.
    pub exists: bool,
}

/// GET /{aggregate_id}
#[instrument(skip(state))]
async fn events_for(
    State(state): State<AppState>,
    Path(aggregate_id): Path<Uuid>,
    Query(query): Query<StreamQuery>,
) -> Result<Json<Vec<StoredEvent>>, ApiError> {
    if query.from_version < 0 {
        return Err(DomainError::Validation(format!(
            "from_version must not be negative, got {}",
            query.from_version
        ))
        .into());
    }
    let events = state
        .event_store
        .events_for(aggregate_id, query.from_version)
        .await?;
    Ok(Json(events))
}

/// GET /{aggregate_id}/version
#[instrument(skip(state))]
async fn current_version(
    State(state): State<AppState>,
    Path(aggregate_id): Path<Uuid>,
) -> Result<Json<VersionResponse>, ApiError> {
    let version = state.event_store.current_version(aggregate_id).await?;
    Ok(Json(VersionResponse {
        aggregate_id,
        version,
        exists: version > 0,
    }))
}

/// GET /by-type/{event_type}
#[instrument(skip(state))]
async fn events_by_type(
    State(state): State<AppState>,
    Path(event_type): Path<String>,
    Query(query): Query<ByTypeQuery>,
) -> Result<Json<Vec<StoredEvent>>, ApiError> {
    let events = state
        .event_store
        .events_by_type(&event_type, query.from)
        .await?;
    Ok(Json(events))
}

/// Returns the router for event-log reads.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/by-type/{event_type}", get(events_by_type))
        .route("/{aggregate_id}", get(events_for))
        .route("/{aggregate_id}/version", get(current_version))
}
