//! In-memory implementation of the `EventRepository` trait.
//!
//! Holds the whole log in a single `RwLock`. The version check, the
//! (`aggregate_id`, `version`) uniqueness check and the write all happen
//! under one write lock, and a batch is staged in full before any of it
//! becomes visible.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use niespro_core::error::DomainError;
use niespro_core::repository::{EventRepository, StoredEvent};

/// Process-local event repository.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Every stored event, in commit order.
    log: Vec<StoredEvent>,
    /// Highest version per aggregate.
    versions: HashMap<Uuid, i64>,
    /// Unique index over (`aggregate_id`, `version`).
    keys: HashSet<(Uuid, i64)>,
    /// When set, the next append fails after staging this many events.
    fail_after: Option<usize>,
}

fn poisoned() -> DomainError {
    DomainError::StorageUnavailable("in-memory event log lock poisoned".into())
}

impl InMemoryEventRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `append_events` call fail with
    /// `DomainError::StorageUnavailable` after `staged` events of its batch
    /// have been staged. When `staged` is at least the batch length the
    /// whole batch is staged and the failure happens at commit. Nothing from
    /// that batch is kept.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StorageUnavailable` if the lock is poisoned.
    pub fn fail_next_append_after(&self, staged: usize) -> Result<(), DomainError> {
        self.write()?.fail_after = Some(staged);
        Ok(())
    }

    /// Total number of stored events across all aggregates.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StorageUnavailable` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, DomainError> {
        Ok(self.read()?.log.len())
    }

    /// Whether the log is empty.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StorageUnavailable` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.read()?.log.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, DomainError> {
        self.inner.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, DomainError> {
        self.inner.write().map_err(|_| poisoned())
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    #[instrument(skip(self, events), fields(events_len = events.len()))]
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let mut inner = self.write()?;

        let actual = inner.versions.get(&aggregate_id).copied().unwrap_or(0);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        let fail_after = inner.fail_after.take();
        let mut staged: Vec<StoredEvent> = Vec::with_capacity(events.len());
        let mut next_version = expected_version;
        for (index, event) in events.iter().enumerate() {
            if fail_after == Some(index) {
                return Err(DomainError::StorageUnavailable(format!(
                    "simulated storage failure after {index} staged events"
                )));
            }
            if event.aggregate_id != aggregate_id {
                return Err(DomainError::Validation(format!(
                    "event {} belongs to aggregate {}, not {aggregate_id}",
                    event.id, event.aggregate_id
                )));
            }
            next_version += 1;
            if event.version != next_version {
                return Err(DomainError::Validation(format!(
                    "event {} has version {}, expected {next_version}",
                    event.id, event.version
                )));
            }
            if inner.keys.contains(&(aggregate_id, event.version)) {
                return Err(DomainError::ConcurrencyConflict {
                    aggregate_id,
                    expected: expected_version,
                    actual,
                });
            }
            staged.push(event.clone());
        }

        if fail_after.is_some() {
            return Err(DomainError::StorageUnavailable(format!(
                "simulated storage failure at commit after {} staged events",
                staged.len()
            )));
        }

        if staged.is_empty() {
            return Ok(());
        }

        for event in &staged {
            inner.keys.insert((aggregate_id, event.version));
        }
        inner.versions.insert(aggregate_id, next_version);
        inner.log.extend(staged);
        debug!(new_version = next_version, "batch committed");
        Ok(())
    }

    async fn load_events(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let inner = self.read()?;
        let mut events: Vec<StoredEvent> = inner
            .log
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id && e.version > from_version)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn load_events_by_type(
        &self,
        event_type: &str,
        from: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let inner = self.read()?;
        let mut events: Vec<StoredEvent> = inner
            .log
            .iter()
            .filter(|e| e.event_type == event_type)
            .filter(|e| from.is_none_or(|from| e.timestamp >= from))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.timestamp, e.aggregate_id, e.version));
        Ok(events)
    }

    async fn current_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        Ok(self
            .read()?
            .versions
            .get(&aggregate_id)
            .copied()
            .unwrap_or(0))
    }
}
