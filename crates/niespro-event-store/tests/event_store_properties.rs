//! Behavioural properties of `EventStore` over the in-memory backend.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use niespro_core::error::DomainError;
use niespro_core::event::DomainEvent;
use niespro_core::store::EventStore;
use niespro_event_store::in_memory::InMemoryEventRepository;
use uuid::Uuid;

#[derive(Debug)]
struct StockReserved {
    event_id: Uuid,
    occurred_at: DateTime<Utc>,
    quantity: u32,
}

impl StockReserved {
    fn at(occurred_at: DateTime<Utc>, quantity: u32) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at,
            quantity,
        }
    }

    fn now(quantity: u32) -> Self {
        Self::at(base_time(), quantity)
    }
}

impl DomainEvent for StockReserved {
    fn event_id(&self) -> Uuid {
        self.event_id
    }

    fn event_type(&self) -> &'static str {
        "stock.reserved"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        Ok(serde_json::json!({ "quantity": self.quantity }))
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

fn new_store() -> (EventStore, Arc<InMemoryEventRepository>) {
    let repo = Arc::new(InMemoryEventRepository::new());
    (EventStore::new(repo.clone()), repo)
}

// --- monotonic versions ---

#[tokio::test]
async fn test_versions_are_contiguous_across_appends() {
    let (store, _repo) = new_store();
    let aggregate_id = Uuid::new_v4();
    let batches: [usize; 4] = [1, 3, 2, 4];

    let mut expected_version = 0;
    for size in batches {
        let events: Vec<StockReserved> = (0..size).map(|_| StockReserved::now(1)).collect();
        store
            .append(aggregate_id, "Stock", &events, expected_version)
            .await
            .unwrap();
        expected_version += i64::try_from(size).unwrap();
    }

    assert_eq!(store.current_version(aggregate_id).await.unwrap(), 10);
    let all = store.events_for(aggregate_id, 0).await.unwrap();
    let versions: Vec<i64> = all.iter().map(|e| e.version).collect();
    assert_eq!(versions, (1..=10).collect::<Vec<i64>>());
}

// --- atomicity ---

#[tokio::test]
async fn test_interrupted_batch_leaves_nothing_visible() {
    let (store, repo) = new_store();
    let aggregate_id = Uuid::new_v4();
    repo.fail_next_append_after(2).unwrap();

    let result = store
        .append(
            aggregate_id,
            "Stock",
            &[
                StockReserved::now(1),
                StockReserved::now(2),
                StockReserved::now(3),
            ],
            0,
        )
        .await;

    assert!(matches!(result, Err(DomainError::StorageUnavailable(_))));
    assert!(store.events_for(aggregate_id, 0).await.unwrap().is_empty());
    assert!(!store.exists(aggregate_id).await.unwrap());
}

// --- conflict detection ---

#[tokio::test]
async fn test_second_append_at_version_zero_conflicts() {
    let (store, _repo) = new_store();
    let aggregate_id = Uuid::new_v4();

    store
        .append(aggregate_id, "Stock", &[StockReserved::now(1)], 0)
        .await
        .unwrap();
    let result = store
        .append(aggregate_id, "Stock", &[StockReserved::now(1)], 0)
        .await;

    match result {
        Err(DomainError::ConcurrencyConflict {
            aggregate_id: conflict_id,
            expected,
            actual,
        }) => {
            assert_eq!(conflict_id, aggregate_id);
            assert_eq!(expected, 0);
            assert_eq!(actual, 1);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_conflict_then_retry_with_fresh_version() {
    let (store, _repo) = new_store();
    let aggregate_id = Uuid::new_v4();

    store
        .append(
            aggregate_id,
            "Stock",
            &[StockReserved::now(1), StockReserved::now(2)],
            0,
        )
        .await
        .unwrap();
    assert_eq!(store.current_version(aggregate_id).await.unwrap(), 2);

    let conflict = store
        .append(aggregate_id, "Stock", &[StockReserved::now(3)], 0)
        .await
        .unwrap_err();
    assert!(conflict.is_retryable());
    assert!(matches!(
        conflict,
        DomainError::ConcurrencyConflict {
            expected: 0,
            actual: 2,
            ..
        }
    ));

    store
        .append(aggregate_id, "Stock", &[StockReserved::now(3)], 2)
        .await
        .unwrap();
    assert_eq!(store.current_version(aggregate_id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_concurrent_appends_with_same_expected_version_only_one_wins() {
    let (store, _repo) = new_store();
    let aggregate_id = Uuid::new_v4();

    let mut handles = Vec::new();
    for quantity in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .append(aggregate_id, "Stock", &[StockReserved::now(quantity)], 0)
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(DomainError::ConcurrencyConflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(store.current_version(aggregate_id).await.unwrap(), 1);
}

// --- ordering by type ---

#[tokio::test]
async fn test_events_by_type_are_ordered_by_timestamp_across_aggregates() {
    let (store, _repo) = new_store();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    store
        .append(
            first,
            "Stock",
            &[
                StockReserved::at(base_time() + Duration::minutes(30), 1),
                StockReserved::at(base_time() + Duration::minutes(50), 2),
            ],
            0,
        )
        .await
        .unwrap();
    store
        .append(
            second,
            "Stock",
            &[
                StockReserved::at(base_time(), 3),
                StockReserved::at(base_time() + Duration::minutes(40), 4),
            ],
            0,
        )
        .await
        .unwrap();

    let all = store.events_by_type("stock.reserved", None).await.unwrap();
    let quantities: Vec<i64> = all
        .iter()
        .map(|e| e.event_data["quantity"].as_i64().unwrap())
        .collect();
    assert_eq!(quantities, vec![3, 1, 4, 2]);
    assert!(all.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let recent = store
        .events_by_type("stock.reserved", Some(base_time() + Duration::minutes(40)))
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);

    assert!(store.events_by_type("stock.released", None).await.unwrap().is_empty());
}

// --- idempotent read ---

#[tokio::test]
async fn test_repeated_reads_are_identical() {
    let (store, _repo) = new_store();
    let aggregate_id = Uuid::new_v4();
    store
        .append(
            aggregate_id,
            "Stock",
            &[StockReserved::now(1), StockReserved::now(2), StockReserved::now(3)],
            0,
        )
        .await
        .unwrap();

    let first = store.events_for(aggregate_id, 1).await.unwrap();
    let second = store.events_for(aggregate_id, 1).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn test_unknown_aggregate_has_version_zero() {
    let (store, _repo) = new_store();
    let aggregate_id = Uuid::new_v4();

    assert_eq!(store.current_version(aggregate_id).await.unwrap(), 0);
    assert!(!store.exists(aggregate_id).await.unwrap());
    assert!(store.events_for(aggregate_id, 0).await.unwrap().is_empty());
}
