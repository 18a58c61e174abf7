//! `PostgreSQL` implementation of the `EventRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use niespro_core::error::DomainError;
use niespro_core::repository::{EventRepository, StoredEvent};

use crate::schema::{AGGREGATE_VERSION_CONSTRAINT, CREATE_STORED_EVENTS_TABLE};

/// PostgreSQL-backed event repository.
#[derive(Debug, Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

/// Row shape of `stored_events`.
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    aggregate_id: Uuid,
    aggregate_type: String,
    event_type: String,
    event_data: serde_json::Value,
    metadata: Option<serde_json::Value>,
    version: i64,
    occurred_at: DateTime<Utc>,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            aggregate_id: row.aggregate_id,
            aggregate_type: row.aggregate_type,
            event_type: row.event_type,
            event_data: row.event_data,
            metadata: row.metadata,
            version: row.version,
            timestamp: row.occurred_at,
        }
    }
}

fn storage_error(err: &sqlx::Error) -> DomainError {
    DomainError::StorageUnavailable(err.to_string())
}

/// Which unique constraint an insert tripped, if any.
enum UniqueViolation {
    /// (`aggregate_id`, `version`) already taken by a concurrent writer.
    Version,
    /// Any other key, e.g. a re-used event `id`.
    Other(String),
}

fn unique_violation(err: &sqlx::Error) -> Option<UniqueViolation> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(match db_err.constraint() {
                Some(AGGREGATE_VERSION_CONSTRAINT) => UniqueViolation::Version,
                other => UniqueViolation::Other(other.unwrap_or("unknown").to_owned()),
            })
        }
        _ => None,
    }
}

const SELECT_COLUMNS: &str = "SELECT id, aggregate_id, aggregate_type, event_type, event_data, \
     metadata, version, occurred_at FROM stored_events";

impl PgEventRepository {
    /// Creates a new `PgEventRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the stored events schema. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StorageUnavailable` if the DDL fails.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::raw_sql(CREATE_STORED_EVENTS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error(&e))?;
        Ok(())
    }

    async fn max_version<'e, X>(executor: X, aggregate_id: Uuid) -> Result<i64, sqlx::Error>
    where
        X: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0)::BIGINT FROM stored_events WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_one(executor)
        .await
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    #[instrument(skip(self, events), fields(events_len = events.len()))]
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| storage_error(&e))?;

        let actual = Self::max_version(&mut *tx, aggregate_id)
            .await
            .map_err(|e| storage_error(&e))?;
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO stored_events (id, aggregate_id, aggregate_type, event_type, \
             event_data, metadata, version, occurred_at) ",
        );
        qb.push_values(events, |mut b, event| {
            b.push_bind(event.id)
                .push_bind(event.aggregate_id)
                .push_bind(&event.aggregate_type)
                .push_bind(&event.event_type)
                .push_bind(&event.event_data)
                .push_bind(&event.metadata)
                .push_bind(event.version)
                .push_bind(event.timestamp);
        });

        if let Err(e) = qb.build().execute(&mut *tx).await {
            drop(tx);
            return Err(match unique_violation(&e) {
                Some(UniqueViolation::Version) => {
                    // A concurrent writer committed between our read and insert.
                    let actual = Self::max_version(&self.pool, aggregate_id)
                        .await
                        .map_err(|e| storage_error(&e))?;
                    warn!(actual, "unique constraint rejected concurrent append");
                    DomainError::ConcurrencyConflict {
                        aggregate_id,
                        expected: expected_version,
                        actual,
                    }
                }
                Some(UniqueViolation::Other(constraint)) => DomainError::Validation(format!(
                    "batch for aggregate {aggregate_id} violates unique constraint {constraint}"
                )),
                None => storage_error(&e),
            });
        }

        tx.commit().await.map_err(|e| storage_error(&e))?;

        debug!("batch committed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_events(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "{SELECT_COLUMNS} WHERE aggregate_id = $1 AND version > $2 ORDER BY version ASC"
        ))
        .bind(aggregate_id)
        .bind(from_version)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error(&e))?;

        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }

    #[instrument(skip(self))]
    async fn load_events_by_type(
        &self,
        event_type: &str,
        from: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "{SELECT_COLUMNS} WHERE event_type = $1 AND ($2::TIMESTAMPTZ IS NULL OR occurred_at >= $2) \
             ORDER BY occurred_at ASC, aggregate_id ASC, version ASC"
        ))
        .bind(event_type)
        .bind(from)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error(&e))?;

        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }

    async fn current_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        Self::max_version(&self.pool, aggregate_id)
            .await
            .map_err(|e| storage_error(&e))
    }

    async fn exists(&self, aggregate_id: Uuid) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM stored_events WHERE aggregate_id = $1)")
            .bind(aggregate_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error(&e))
    }
}
