//! Integration tests for the event-log read routes.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

async fn create_order(app: axum::Router, order_id: Uuid) {
    let (status, _) = common::post_json(
        app,
        "/api/v1/orders",
        &json!({
            "order_id": order_id,
            "customer_id": Uuid::new_v4(),
            "currency": "PLN",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_events_for_honours_from_version() {
    let repository = common::in_memory_repository();
    let order_id = Uuid::new_v4();
    create_order(common::build_test_app(repository.clone()), order_id).await;
    for _ in 0..2 {
        let (status, _) = common::post_json(
            common::build_test_app(repository.clone()),
            "/api/v1/orders/add-item",
            &json!({
                "order_id": order_id,
                "product_id": Uuid::new_v4(),
                "quantity": 1,
                "unit_price_cents": 999,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = common::get_json(
        common::build_test_app(repository),
        &format!("/api/v1/events/{order_id}?from_version=1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let events = json.as_array().unwrap();
    let versions: Vec<i64> = events.iter().map(|e| e["version"].as_i64().unwrap()).collect();
    assert_eq!(versions, vec![2, 3]);
    assert!(events.iter().all(|e| e["aggregate_type"] == "Order"));
    assert!(events.iter().all(|e| e["event_type"] == "order.item_added"));
    assert!(events[0]["metadata"]["correlation_id"].is_string());
}

#[tokio::test]
async fn test_version_endpoint_tracks_appends() {
    let repository = common::in_memory_repository();
    let order_id = Uuid::new_v4();

    let (status, json) = common::get_json(
        common::build_test_app(repository.clone()),
        &format!("/api/v1/events/{order_id}/version"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["version"], 0);
    assert_eq!(json["exists"], false);

    create_order(common::build_test_app(repository.clone()), order_id).await;

    let (status, json) = common::get_json(
        common::build_test_app(repository),
        &format!("/api/v1/events/{order_id}/version"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["version"], 1);
    assert_eq!(json["exists"], true);
}

#[tokio::test]
async fn test_events_by_type_spans_aggregates() {
    let repository = common::in_memory_repository();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    create_order(common::build_test_app(repository.clone()), first).await;
    create_order(common::build_test_app(repository.clone()), second).await;

    let (status, json) = common::get_json(
        common::build_test_app(repository.clone()),
        "/api/v1/events/by-type/order.created",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let mut ids: Vec<String> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["aggregate_id"].as_str().unwrap().to_owned())
        .collect();
    ids.sort();
    let mut expected = vec![first.to_string(), second.to_string()];
    expected.sort();
    assert_eq!(ids, expected);

    let (status, json) = common::get_json(
        common::build_test_app(repository),
        "/api/v1/events/by-type/order.shipped",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn test_events_by_type_filters_by_from() {
    let repository = common::in_memory_repository();
    create_order(common::build_test_app(repository.clone()), Uuid::new_v4()).await;

    // The fixed test clock stamps every event at 2026-01-15T10:00:00Z.
    let (status, json) = common::get_json(
        common::build_test_app(repository.clone()),
        "/api/v1/events/by-type/order.created?from=2026-01-15T10:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, json) = common::get_json(
        common::build_test_app(repository),
        "/api/v1/events/by-type/order.created?from=2026-01-15T10:00:01Z",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.as_array().unwrap().is_empty());
}
