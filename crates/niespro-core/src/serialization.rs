//! Conversion between domain events and stored records.

use uuid::Uuid;

use crate::error::DomainError;
use crate::event::{CURRENT_SCHEMA_VERSION, DomainEvent, EventKind, EventMetadata};
use crate::repository::StoredEvent;

/// Builds the metadata stored alongside an event.
///
/// The correlation ID is taken from the event when its command supplied one
/// and is freshly generated otherwise. The causation ID is the event's own
/// identity.
#[must_use]
pub fn build_metadata<E: DomainEvent>(event: &E) -> EventMetadata {
    EventMetadata {
        correlation_id: event.correlation_id().unwrap_or_else(Uuid::new_v4),
        causation_id: event.event_id(),
        occurred_at: event.occurred_at(),
        schema_version: CURRENT_SCHEMA_VERSION,
    }
}

/// Converts a domain event into the record persisted at `version`.
///
/// # Errors
///
/// Returns `DomainError::Serialization` if the payload or metadata cannot be
/// encoded as JSON.
pub fn serialize_event<E: DomainEvent>(
    aggregate_id: Uuid,
    aggregate_type: &str,
    event: &E,
    version: i64,
) -> Result<StoredEvent, DomainError> {
    let event_data = event.to_payload().map_err(|e| {
        DomainError::Serialization(format!(
            "failed to serialize {} event: {e}",
            event.event_type()
        ))
    })?;
    let metadata = serde_json::to_value(build_metadata(event))?;

    Ok(StoredEvent {
        id: Uuid::new_v4(),
        aggregate_id,
        aggregate_type: aggregate_type.to_owned(),
        event_type: event.event_type().to_owned(),
        event_data,
        metadata: Some(metadata),
        version,
        timestamp: event.occurred_at(),
    })
}

/// Decodes a stored payload into its tagged event enum.
///
/// # Errors
///
/// Returns `DomainError::Serialization` if the payload does not deserialize
/// into `K`, or if the decoded variant disagrees with the stored
/// `event_type`.
pub fn decode_payload<K: EventKind>(stored: &StoredEvent) -> Result<K, DomainError> {
    let kind: K = serde_json::from_value(stored.event_data.clone()).map_err(|e| {
        DomainError::Serialization(format!(
            "event {} (version {}) failed to deserialize: {e}",
            stored.id, stored.version
        ))
    })?;

    if kind.kind() != stored.event_type {
        return Err(DomainError::Serialization(format!(
            "event {} is tagged {} but its payload decodes as {}",
            stored.id,
            stored.event_type,
            kind.kind()
        )));
    }

    Ok(kind)
}

/// Decodes the metadata of a stored event, if any was written.
///
/// # Errors
///
/// Returns `DomainError::Serialization` if the metadata is present but
/// malformed.
pub fn decode_metadata(stored: &StoredEvent) -> Result<Option<EventMetadata>, DomainError> {
    stored
        .metadata
        .as_ref()
        .map(|value| {
            serde_json::from_value(value.clone()).map_err(|e| {
                DomainError::Serialization(format!("event {} has invalid metadata: {e}", stored.id))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum TestKind {
        Opened { name: String },
        Closed,
    }

    impl EventKind for TestKind {
        fn kind(&self) -> &'static str {
            match self {
                Self::Opened { .. } => "test.opened",
                Self::Closed => "test.closed",
            }
        }
    }

    #[derive(Debug)]
    struct TestEvent {
        event_id: Uuid,
        correlation_id: Option<Uuid>,
        occurred_at: DateTime<Utc>,
        kind: TestKind,
    }

    impl DomainEvent for TestEvent {
        fn event_id(&self) -> Uuid {
            self.event_id
        }

        fn event_type(&self) -> &'static str {
            self.kind.kind()
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.occurred_at
        }

        fn correlation_id(&self) -> Option<Uuid> {
            self.correlation_id
        }

        fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
            serde_json::to_value(&self.kind)
        }
    }

    fn opened(correlation_id: Option<Uuid>) -> TestEvent {
        TestEvent {
            event_id: Uuid::new_v4(),
            correlation_id,
            occurred_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
            kind: TestKind::Opened {
                name: "first".to_owned(),
            },
        }
    }

    #[test]
    fn test_serialize_event_fills_record_fields() {
        let aggregate_id = Uuid::new_v4();
        let event = opened(None);

        let stored = serialize_event(aggregate_id, "Test", &event, 3).unwrap();

        assert_eq!(stored.aggregate_id, aggregate_id);
        assert_eq!(stored.aggregate_type, "Test");
        assert_eq!(stored.event_type, "test.opened");
        assert_eq!(stored.version, 3);
        assert_eq!(stored.timestamp, event.occurred_at);
        assert_ne!(stored.id, event.event_id);
        assert_eq!(stored.event_data, serde_json::json!({"Opened": {"name": "first"}}));
    }

    #[test]
    fn test_metadata_links_causation_to_event_identity() {
        let event = opened(None);

        let stored = serialize_event(Uuid::new_v4(), "Test", &event, 1).unwrap();
        let metadata = decode_metadata(&stored).unwrap().unwrap();

        assert_eq!(metadata.causation_id, event.event_id);
        assert_eq!(metadata.occurred_at, event.occurred_at);
        assert_eq!(metadata.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_metadata_keeps_supplied_correlation_id() {
        let correlation_id = Uuid::new_v4();
        let metadata = build_metadata(&opened(Some(correlation_id)));
        assert_eq!(metadata.correlation_id, correlation_id);
    }

    #[test]
    fn test_metadata_generates_fresh_correlation_id_when_absent() {
        let event = opened(None);
        let first = build_metadata(&event);
        let second = build_metadata(&event);
        assert_ne!(first.correlation_id, second.correlation_id);
    }

    #[test]
    fn test_decode_payload_returns_tagged_variant() {
        let stored = serialize_event(Uuid::new_v4(), "Test", &opened(None), 1).unwrap();

        let kind: TestKind = decode_payload(&stored).unwrap();

        assert_eq!(
            kind,
            TestKind::Opened {
                name: "first".to_owned()
            }
        );
    }

    #[test]
    fn test_decode_payload_rejects_mismatched_event_type() {
        let mut stored = serialize_event(Uuid::new_v4(), "Test", &opened(None), 1).unwrap();
        stored.event_type = "test.closed".to_owned();

        let result = decode_payload::<TestKind>(&stored);

        assert!(matches!(result, Err(DomainError::Serialization(_))));
    }

    #[test]
    fn test_decode_payload_rejects_unknown_payload() {
        let mut stored = serialize_event(Uuid::new_v4(), "Test", &opened(None), 1).unwrap();
        stored.event_data = serde_json::json!({"Renamed": {"to": "x"}});

        let result = decode_payload::<TestKind>(&stored);

        assert!(matches!(result, Err(DomainError::Serialization(_))));
    }

    #[test]
    fn test_decode_metadata_absent_is_none() {
        let mut stored = serialize_event(Uuid::new_v4(), "Test", &opened(None), 1).unwrap();
        stored.metadata = None;

        assert!(decode_metadata(&stored).unwrap().is_none());
    }
}
