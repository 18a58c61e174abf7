//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict. The caller should reload the
    /// aggregate, reapply its change and retry the append.
    #[error(
        "concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The version the caller expected.
        expected: i64,
        /// The version actually stored.
        actual: i64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An event could not be converted to or from its stored form.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The durable store could not be reached or the write did not commit.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl DomainError {
    /// Returns `true` when retrying the whole operation against fresh state
    /// may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_conflict_message_includes_both_versions() {
        let aggregate_id = Uuid::new_v4();
        let err = DomainError::ConcurrencyConflict {
            aggregate_id,
            expected: 0,
            actual: 2,
        };

        let msg = err.to_string();
        assert!(msg.contains(&aggregate_id.to_string()));
        assert!(msg.contains("expected version 0"));
        assert!(msg.contains("found 2"));
    }

    #[test]
    fn test_only_concurrency_conflict_is_retryable() {
        let conflict = DomainError::ConcurrencyConflict {
            aggregate_id: Uuid::new_v4(),
            expected: 1,
            actual: 2,
        };
        assert!(conflict.is_retryable());
        assert!(!DomainError::Validation("bad".into()).is_retryable());
        assert!(!DomainError::Serialization("bad".into()).is_retryable());
        assert!(!DomainError::StorageUnavailable("down".into()).is_retryable());
        assert!(!DomainError::AggregateNotFound(Uuid::new_v4()).is_retryable());
    }

    #[test]
    fn test_serde_json_error_converts_to_serialization() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let domain: DomainError = err.into();
        assert!(matches!(domain, DomainError::Serialization(_)));
    }
}
