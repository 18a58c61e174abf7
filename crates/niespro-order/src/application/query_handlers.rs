//! Query handlers for the Order context.
//!
//! This module contains query handlers that reconstitute orders from stored
//! events and return read-only view DTOs.

use niespro_core::error::DomainError;
use niespro_core::store::EventStore;
use serde::Serialize;
use uuid::Uuid;

use crate::application::command_handlers;
use crate::domain::aggregates::OrderStatus;

/// Read-only view of one order line.
#[derive(Debug, Serialize)]
pub struct OrderLineView {
    /// The product identifier.
    pub product_id: Uuid,
    /// Units ordered.
    pub quantity: u32,
    /// Price per unit in minor currency units.
    pub unit_price_cents: i64,
}

/// Read-only view of an order aggregate.
#[derive(Debug, Serialize)]
pub struct OrderView {
    /// The order identifier.
    pub order_id: Uuid,
    /// The customer who placed the order.
    pub customer_id: Option<Uuid>,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Lines sorted by product ID.
    pub lines: Vec<OrderLineView>,
    /// Order total in minor currency units.
    pub total_cents: i64,
    /// Current version (event count).
    pub version: i64,
}

/// Retrieves an order by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID,
/// `DomainError::Serialization` if a stored event cannot be decoded, and
/// propagates store errors.
pub async fn get_order_by_id(order_id: Uuid, store: &EventStore) -> Result<OrderView, DomainError> {
    let stored_events = store.events_for(order_id, 0).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(order_id));
    }
    let order = command_handlers::reconstitute(order_id, &stored_events)?;

    let lines = order
        .lines
        .iter()
        .map(|(product_id, line)| OrderLineView {
            product_id: *product_id,
            quantity: line.quantity,
            unit_price_cents: line.unit_price_cents,
        })
        .collect();

    Ok(OrderView {
        order_id,
        customer_id: order.customer_id,
        currency: order.currency.clone(),
        status: order.status,
        total_cents: order.total_cents(),
        lines,
        version: order.version,
    })
}
