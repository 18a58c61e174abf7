//! Command handlers for the Order context.
//!
//! Each handler loads the order by replaying its stored events, executes the
//! command, and appends the new events with the loaded version as the
//! expected version. A concurrent writer surfaces as
//! `DomainError::ConcurrencyConflict`; retrying is left to the caller.

use niespro_core::aggregate::AggregateRoot;
use niespro_core::clock::Clock;
use niespro_core::command::Command;
use niespro_core::error::DomainError;
use niespro_core::repository::StoredEvent;
use niespro_core::serialization::{decode_metadata, decode_payload};
use niespro_core::store::EventStore;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::aggregates::Order;
use crate::domain::commands::{
    AddItem, CancelOrder, ConfirmOrder, CreateOrder, RemoveItem, ShipOrder,
};
use crate::domain::events::{OrderEvent, OrderEventKind};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct OrderCommandResult {
    /// The aggregate ID affected by the command.
    pub aggregate_id: Uuid,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

/// Reconstitutes an `Order` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Serialization` if an event payload or its metadata
/// cannot be decoded.
pub(crate) fn reconstitute(
    order_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<Order, DomainError> {
    let mut order = Order::new(order_id);
    for stored in existing_events {
        let kind: OrderEventKind = decode_payload(stored)?;
        let metadata = decode_metadata(stored)?;
        let event = OrderEvent {
            event_id: metadata.as_ref().map_or(stored.id, |m| m.causation_id),
            correlation_id: metadata.map(|m| m.correlation_id),
            occurred_at: stored.timestamp,
            kind,
        };
        order.apply(&event);
    }
    Ok(order)
}

async fn load_order(order_id: Uuid, store: &EventStore) -> Result<Order, DomainError> {
    let existing_events = store.events_for(order_id, 0).await?;
    if existing_events.is_empty() {
        return Err(DomainError::AggregateNotFound(order_id));
    }
    reconstitute(order_id, &existing_events)
}

async fn persist(order: &mut Order, store: &EventStore) -> Result<OrderCommandResult, DomainError> {
    let stored_events = store
        .append(
            order.id,
            Order::AGGREGATE_TYPE,
            order.uncommitted_events(),
            order.version(),
        )
        .await?;
    order.clear_uncommitted_events();

    Ok(OrderCommandResult {
        aggregate_id: order.id,
        stored_events,
    })
}

/// Handles the `CreateOrder` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the order already exists or the input
/// is invalid, and propagates store errors.
#[instrument(skip(command, clock, store), fields(order_id = %command.order_id))]
pub async fn handle_create_order(
    command: &CreateOrder,
    clock: &dyn Clock,
    store: &EventStore,
) -> Result<OrderCommandResult, DomainError> {
    info!(command_type = command.command_type(), "handling command");
    if store.exists(command.order_id).await? {
        return Err(DomainError::Validation(format!(
            "order {} already exists",
            command.order_id
        )));
    }

    let mut order = Order::new(command.order_id);
    order.create(
        command.customer_id,
        &command.currency,
        command.correlation_id(),
        clock,
    )?;

    persist(&mut order, store).await
}

/// Handles the `AddItem` command.
///
/// # Errors
///
/// Returns `DomainError` if the order is missing, the command is invalid for
/// its state, or the store fails.
#[instrument(skip(command, clock, store), fields(order_id = %command.order_id))]
pub async fn handle_add_item(
    command: &AddItem,
    clock: &dyn Clock,
    store: &EventStore,
) -> Result<OrderCommandResult, DomainError> {
    info!(command_type = command.command_type(), "handling command");
    let mut order = load_order(command.order_id, store).await?;

    order.add_item(
        command.product_id,
        command.quantity,
        command.unit_price_cents,
        command.correlation_id(),
        clock,
    )?;

    persist(&mut order, store).await
}

/// Handles the `RemoveItem` command.
///
/// # Errors
///
/// Returns `DomainError` if the order is missing, the product is not on it,
/// or the store fails.
#[instrument(skip(command, clock, store), fields(order_id = %command.order_id))]
pub async fn handle_remove_item(
    command: &RemoveItem,
    clock: &dyn Clock,
    store: &EventStore,
) -> Result<OrderCommandResult, DomainError> {
    info!(command_type = command.command_type(), "handling command");
    let mut order = load_order(command.order_id, store).await?;

    order.remove_item(command.product_id, command.correlation_id(), clock)?;

    persist(&mut order, store).await
}

/// Handles the `ConfirmOrder` command.
///
/// # Errors
///
/// Returns `DomainError` if the order is missing, not a draft, empty, or the
/// store fails.
#[instrument(skip(command, clock, store), fields(order_id = %command.order_id))]
pub async fn handle_confirm_order(
    command: &ConfirmOrder,
    clock: &dyn Clock,
    store: &EventStore,
) -> Result<OrderCommandResult, DomainError> {
    info!(command_type = command.command_type(), "handling command");
    let mut order = load_order(command.order_id, store).await?;

    order.confirm(command.correlation_id(), clock)?;

    persist(&mut order, store).await
}

/// Handles the `ShipOrder` command.
///
/// # Errors
///
/// Returns `DomainError` if the order is missing, not confirmed, or the store
/// fails.
#[instrument(skip(command, clock, store), fields(order_id = %command.order_id))]
pub async fn handle_ship_order(
    command: &ShipOrder,
    clock: &dyn Clock,
    store: &EventStore,
) -> Result<OrderCommandResult, DomainError> {
    info!(command_type = command.command_type(), "handling command");
    let mut order = load_order(command.order_id, store).await?;

    order.ship(&command.tracking_number, command.correlation_id(), clock)?;

    persist(&mut order, store).await
}

/// Handles the `CancelOrder` command.
///
/// # Errors
///
/// Returns `DomainError` if the order is missing, already shipped or
/// cancelled, or the store fails.
#[instrument(skip(command, clock, store), fields(order_id = %command.order_id))]
pub async fn handle_cancel_order(
    command: &CancelOrder,
    clock: &dyn Clock,
    store: &EventStore,
) -> Result<OrderCommandResult, DomainError> {
    info!(command_type = command.command_type(), "handling command");
    let mut order = load_order(command.order_id, store).await?;

    order.cancel(&command.reason, command.correlation_id(), clock)?;

    persist(&mut order, store).await
}
