//! NiesPro Core: shared event-sourcing abstractions.
//!
//! This crate defines the event store contract, the serialization boundary
//! between domain events and stored records, and the in-process dispatch
//! layer. It contains no database code; storage backends live in
//! `niespro-event-store`.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod repository;
pub mod serialization;
pub mod store;
