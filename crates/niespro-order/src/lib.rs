//! NiesPro: Order bounded context.
//!
//! The order aggregate is rebuilt by replaying its stored events and persists
//! new events through the optimistic-concurrency `EventStore`.

pub mod application;
pub mod domain;
