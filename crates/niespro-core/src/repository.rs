//! Event repository abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEvent {
    /// Unique record identifier, generated at write time.
    pub id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Type tag of the owning aggregate (e.g. `"Order"`).
    pub aggregate_type: String,
    /// Type tag of the concrete event kind.
    pub event_type: String,
    /// Serialized event payload.
    pub event_data: serde_json::Value,
    /// Serialized `EventMetadata`.
    pub metadata: Option<serde_json::Value>,
    /// Position within the aggregate stream, starting at 1.
    pub version: i64,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
}

/// Storage seam for the event log.
///
/// Implementations must make `append_events` all-or-nothing and must reject a
/// batch with `DomainError::ConcurrencyConflict` when the stored version for
/// the aggregate differs from `expected_version` at write time. A
/// uniqueness guarantee on (`aggregate_id`, `version`) is required; the
/// version read is only a fast-fail.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Append a batch of events to an aggregate stream.
    ///
    /// `events` carry their versions already assigned as
    /// `expected_version + 1, +2, …`.
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;

    /// Load events for an aggregate with `version > from_version`, ascending
    /// by version.
    async fn load_events(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Load events of one type across all aggregates, ascending by timestamp
    /// (ties broken by aggregate ID, then version), optionally restricted to
    /// `timestamp >= from`.
    async fn load_events_by_type(
        &self,
        event_type: &str,
        from: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Highest stored version for the aggregate, or 0 if it has none.
    async fn current_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError>;

    /// Whether at least one event is stored for the aggregate.
    async fn exists(&self, aggregate_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.current_version(aggregate_id).await? > 0)
    }
}
