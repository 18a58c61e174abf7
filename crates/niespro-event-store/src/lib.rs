//! NiesPro event store backends.
//!
//! `PgEventRepository` is the durable backend; `InMemoryEventRepository`
//! serves tests and database-less development runs. Both implement
//! `niespro_core::repository::EventRepository` with the same version and
//! atomicity guarantees.

pub mod in_memory;
pub mod pg_event_repository;
pub mod schema;
