//! The event store: optimistic-concurrency appends and ordered reads over an
//! `EventRepository`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::repository::{EventRepository, StoredEvent};
use crate::serialization::serialize_event;

/// Append-only event log keyed by aggregate and version.
#[derive(Clone)]
pub struct EventStore {
    repository: Arc<dyn EventRepository>,
}

impl fmt::Debug for EventStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStore").finish_non_exhaustive()
    }
}

impl EventStore {
    /// Creates an event store over the given repository.
    #[must_use]
    pub fn new(repository: Arc<dyn EventRepository>) -> Self {
        Self { repository }
    }

    /// Appends `events` to the aggregate stream if its current version equals
    /// `expected_version`.
    ///
    /// Versions are assigned as `expected_version + 1, +2, …` in input order
    /// and the batch is written atomically. An empty batch still performs the
    /// version check. The store never retries.
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation` if `expected_version` is negative.
    /// - `DomainError::ConcurrencyConflict` if the stored version differs,
    ///   either at the pre-check or at write time.
    /// - `DomainError::Serialization` if any event fails to serialize; nothing
    ///   is written.
    /// - `DomainError::StorageUnavailable` if the repository fails.
    #[instrument(skip(self, events), fields(events_len = events.len()))]
    pub async fn append<E: DomainEvent>(
        &self,
        aggregate_id: Uuid,
        aggregate_type: &str,
        events: &[E],
        expected_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        if expected_version < 0 {
            return Err(DomainError::Validation(format!(
                "expected version must not be negative, got {expected_version}"
            )));
        }

        let current_version = self.repository.current_version(aggregate_id).await?;
        if current_version != expected_version {
            warn!(current_version, "rejecting append with stale expected version");
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual: current_version,
            });
        }

        if events.is_empty() {
            return Ok(Vec::new());
        }

        let stored = events
            .iter()
            .zip(1..)
            .map(|(event, offset)| {
                serialize_event(aggregate_id, aggregate_type, event, expected_version + offset)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.repository
            .append_events(aggregate_id, expected_version, &stored)
            .await?;

        debug!(
            new_version = expected_version + i64::try_from(stored.len()).unwrap_or(i64::MAX),
            "events appended"
        );
        Ok(stored)
    }

    /// Returns the events of an aggregate with `version > from_version`,
    /// ascending by version.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StorageUnavailable` if the repository fails.
    #[instrument(skip(self))]
    pub async fn events_for(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.repository.load_events(aggregate_id, from_version).await
    }

    /// Returns events of one type across all aggregates, ascending by
    /// timestamp, optionally restricted to `timestamp >= from`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StorageUnavailable` if the repository fails.
    #[instrument(skip(self))]
    pub async fn events_by_type(
        &self,
        event_type: &str,
        from: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.repository.load_events_by_type(event_type, from).await
    }

    /// Highest stored version for the aggregate, or 0.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StorageUnavailable` if the repository fails.
    pub async fn current_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        self.repository.current_version(aggregate_id).await
    }

    /// Whether the aggregate has any stored events.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StorageUnavailable` if the repository fails.
    pub async fn exists(&self, aggregate_id: Uuid) -> Result<bool, DomainError> {
        self.repository.exists(aggregate_id).await
    }
}
