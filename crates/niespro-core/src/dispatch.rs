//! In-process publication of stored events.
//!
//! Publication happens after a successful append and is separate from
//! durable storage: a subscriber failure is logged and never reaches the
//! caller, so it cannot roll back what was already committed.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::DomainError;
use crate::repository::StoredEvent;

/// A consumer of events that have already been stored.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Handle one stored event.
    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError>;
}

/// Delivers stored events to every registered subscriber, in order.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.subscribers.iter().map(|s| s.name()).collect();
        f.debug_struct("EventDispatcher")
            .field("subscribers", &names)
            .finish()
    }
}

impl EventDispatcher {
    /// Creates a dispatcher with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber.
    #[must_use]
    pub fn with_subscriber(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Publishes each event to each subscriber. Returns the number of
    /// deliveries that failed.
    pub async fn publish(&self, events: &[StoredEvent]) -> usize {
        let mut failures = 0;
        for event in events {
            for subscriber in &self.subscribers {
                if let Err(e) = subscriber.handle(event).await {
                    failures += 1;
                    warn!(
                        subscriber = subscriber.name(),
                        event_id = %event.id,
                        event_type = %event.event_type,
                        error = %e,
                        "subscriber failed to handle event"
                    );
                }
            }
        }
        failures
    }
}

/// Subscriber that logs every stored event.
#[derive(Debug, Clone, Copy)]
pub struct LoggingSubscriber;

#[async_trait]
impl EventSubscriber for LoggingSubscriber {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
        info!(
            aggregate_id = %event.aggregate_id,
            aggregate_type = %event.aggregate_type,
            event_type = %event.event_type,
            version = event.version,
            "event stored"
        );
        Ok(())
    }
}
