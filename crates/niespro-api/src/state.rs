//! Shared application state.

use std::sync::Arc;

use niespro_core::clock::Clock;
use niespro_core::dispatch::EventDispatcher;
use niespro_core::store::EventStore;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock used to timestamp new events.
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// The event store.
    pub event_store: EventStore,
    /// Post-append publication to in-process subscribers.
    pub dispatcher: EventDispatcher,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("event_store", &self.event_store)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock + Send + Sync>,
        event_store: EventStore,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            clock,
            event_store,
            dispatcher,
        }
    }
}
