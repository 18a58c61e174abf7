//! Event store database schema.
//!
//! Kept in sync with `migrations/20260301000000_create_stored_events.sql`.

/// SQL to create the stored events table and its indexes.
///
/// The unique constraint on (`aggregate_id`, `version`) is what makes
/// concurrent appends with the same expected version safe: at most one of
/// them can commit.
pub const CREATE_STORED_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS stored_events (
    id             UUID PRIMARY KEY,
    aggregate_id   UUID NOT NULL,
    aggregate_type VARCHAR(255) NOT NULL,
    event_type     VARCHAR(255) NOT NULL,
    event_data     JSONB NOT NULL,
    metadata       JSONB,
    version        BIGINT NOT NULL CHECK (version > 0),
    occurred_at    TIMESTAMPTZ NOT NULL,
    recorded_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_stored_events_aggregate_version UNIQUE (aggregate_id, version)
);

CREATE INDEX IF NOT EXISTS idx_stored_events_aggregate_id
    ON stored_events (aggregate_id, version);

CREATE INDEX IF NOT EXISTS idx_stored_events_type_occurred_at
    ON stored_events (event_type, occurred_at);
";

/// Name of the unique constraint guarding stream versions.
pub const AGGREGATE_VERSION_CONSTRAINT: &str = "uq_stored_events_aggregate_version";
