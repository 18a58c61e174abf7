//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use niespro_core::clock::Clock;
use niespro_core::dispatch::{EventDispatcher, EventSubscriber};
use niespro_core::error::DomainError;
use niespro_core::repository::{EventRepository, StoredEvent};
use niespro_core::store::EventStore;
use niespro_event_store::in_memory::InMemoryEventRepository;
use niespro_test_support::{FixedClock, fixed_now};
use tokio::sync::Mutex;
use tower::ServiceExt;

use niespro_api::state::AppState;

fn fixed_clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(FixedClock(fixed_now()))
}

/// A shared in-memory event log. Clone the `Arc` to build several routers
/// over the same data.
pub fn in_memory_repository() -> Arc<InMemoryEventRepository> {
    Arc::new(InMemoryEventRepository::new())
}

/// Build the full app router over `repository` with a fixed clock and the
/// given dispatcher. Uses the same route structure as `main.rs`.
pub fn build_test_app_with(
    repository: Arc<dyn EventRepository>,
    dispatcher: EventDispatcher,
) -> Router {
    let app_state = AppState::new(fixed_clock(), EventStore::new(repository), dispatcher);
    niespro_api::app(app_state)
}

/// Build the full app router over `repository` with no subscribers.
pub fn build_test_app(repository: Arc<dyn EventRepository>) -> Router {
    build_test_app_with(repository, EventDispatcher::new())
}

/// Subscriber that remembers the event types it was handed.
#[derive(Debug, Default)]
pub struct CollectingSubscriber {
    seen: Mutex<Vec<String>>,
}

impl CollectingSubscriber {
    pub async fn seen(&self) -> Vec<String> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl EventSubscriber for CollectingSubscriber {
    fn name(&self) -> &'static str {
        "collecting"
    }

    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
        self.seen.lock().await.push(event.event_type.clone());
        Ok(())
    }
}

/// Subscriber that fails on every event.
#[derive(Debug)]
pub struct BrokenSubscriber;

#[async_trait]
impl EventSubscriber for BrokenSubscriber {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn handle(&self, _event: &StoredEvent) -> Result<(), DomainError> {
        Err(DomainError::StorageUnavailable("mail relay offline".into()))
    }
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}
