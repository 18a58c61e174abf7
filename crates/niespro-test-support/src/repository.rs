//! Test repositories: mock `EventRepository` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use niespro_core::error::DomainError;
use niespro_core::repository::{EventRepository, StoredEvent};
use uuid::Uuid;

/// An event repository that returns a configured history from every load and
/// records all `append_events` calls. Appends always succeed and do not
/// change what later loads return.
#[derive(Debug)]
pub struct RecordingEventRepository {
    history: Vec<StoredEvent>,
    appended: Mutex<Vec<(Uuid, i64, Vec<StoredEvent>)>>,
}

impl RecordingEventRepository {
    /// Create a new recording repository whose loads return `history`.
    #[must_use]
    pub fn new(history: Vec<StoredEvent>) -> Self {
        Self {
            history,
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all `(aggregate_id, expected_version, events)`
    /// appends.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<(Uuid, i64, Vec<StoredEvent>)> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventRepository for RecordingEventRepository {
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        self.appended
            .lock()
            .unwrap()
            .push((aggregate_id, expected_version, events.to_vec()));
        Ok(())
    }

    async fn load_events(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .history
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id && e.version > from_version)
            .cloned()
            .collect())
    }

    async fn load_events_by_type(
        &self,
        event_type: &str,
        from: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .history
            .iter()
            .filter(|e| e.event_type == event_type)
            .filter(|e| from.is_none_or(|from| e.timestamp >= from))
            .cloned()
            .collect())
    }

    async fn current_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        Ok(self
            .history
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(0))
    }
}

/// An event repository that always returns an empty event list and silently
/// accepts appends. Useful for testing "aggregate not found" scenarios and
/// creation commands.
#[derive(Debug)]
pub struct EmptyEventRepository;

#[async_trait]
impl EventRepository for EmptyEventRepository {
    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Ok(())
    }

    async fn load_events(
        &self,
        _aggregate_id: Uuid,
        _from_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn load_events_by_type(
        &self,
        _event_type: &str,
        _from: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn current_version(&self, _aggregate_id: Uuid) -> Result<i64, DomainError> {
        Ok(0)
    }
}

/// An event repository whose every operation reports the store as
/// unavailable. Useful for testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventRepository;

fn connection_refused() -> DomainError {
    DomainError::StorageUnavailable("connection refused".into())
}

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Err(connection_refused())
    }

    async fn load_events(
        &self,
        _aggregate_id: Uuid,
        _from_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(connection_refused())
    }

    async fn load_events_by_type(
        &self,
        _event_type: &str,
        _from: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(connection_refused())
    }

    async fn current_version(&self, _aggregate_id: Uuid) -> Result<i64, DomainError> {
        Err(connection_refused())
    }
}
