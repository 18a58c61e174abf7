//! Domain event abstractions.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Schema version written into the metadata of newly stored events.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Side-channel data stored next to every event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Correlation ID for tracing a command through its effects.
    pub correlation_id: Uuid,
    /// Causation ID: the identity of the domain event itself.
    pub causation_id: Uuid,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// Payload schema version.
    pub schema_version: u32,
}

/// Trait that all domain events implement.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Identity of this event occurrence.
    fn event_id(&self) -> Uuid;

    /// Returns the event type tag (stored in the `event_type` column).
    fn event_type(&self) -> &'static str;

    /// When the event occurred.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Correlation ID of the command that produced the event, if known.
    fn correlation_id(&self) -> Option<Uuid> {
        None
    }

    /// Serializes the event payload to JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if the payload cannot be
    /// represented as JSON.
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error>;
}

/// A closed set of event payloads belonging to one aggregate type.
///
/// Implemented by a serde-tagged enum so that decoding a stored payload is an
/// exhaustive match rather than a lookup by type name.
pub trait EventKind: Serialize + DeserializeOwned + Send + Sync {
    /// The tag for this variant, matching the stored `event_type`.
    fn kind(&self) -> &'static str;
}
