//! Aggregate roots for the Order context.

use std::collections::BTreeMap;

use niespro_core::aggregate::AggregateRoot;
use niespro_core::clock::Clock;
use niespro_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use super::events::{
    ItemAdded, ItemRemoved, OrderCancelled, OrderConfirmed, OrderCreated, OrderEvent,
    OrderEventKind, OrderShipped,
};

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Open for edits.
    Draft,
    /// Confirmed by the customer; lines are frozen.
    Confirmed,
    /// Handed to the carrier.
    Shipped,
    /// Cancelled; terminal.
    Cancelled,
}

/// A product line on an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    /// Total units ordered.
    pub quantity: u32,
    /// Price per unit in minor currency units.
    pub unit_price_cents: i64,
}

/// The aggregate root for an order.
#[derive(Debug)]
pub struct Order {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Number of stored events applied.
    pub(crate) version: i64,
    /// Customer placing the order; `None` until `OrderCreated`.
    pub(crate) customer_id: Option<Uuid>,
    /// ISO 4217 currency code.
    pub(crate) currency: String,
    /// Lifecycle status.
    pub(crate) status: OrderStatus,
    /// Lines keyed by product.
    pub(crate) lines: BTreeMap<Uuid, OrderLine>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<OrderEvent>,
}

impl Order {
    /// Creates an empty, not-yet-created order.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            customer_id: None,
            currency: String::new(),
            status: OrderStatus::Draft,
            lines: BTreeMap::new(),
            uncommitted_events: Vec::new(),
        }
    }

    /// Sum of `quantity * unit_price_cents` over all lines.
    ///
    /// `add_item` keeps this within `i64`; replayed history that does not
    /// saturates instead of overflowing.
    #[must_use]
    pub fn total_cents(&self) -> i64 {
        self.lines
            .values()
            .map(|line| i64::from(line.quantity).saturating_mul(line.unit_price_cents))
            .fold(0, i64::saturating_add)
    }

    /// The order total if `product_id` carried `line` instead of its current
    /// line, or `None` on overflow.
    fn total_with(&self, product_id: Uuid, line: &OrderLine) -> Option<i64> {
        self.lines
            .iter()
            .filter(|(id, _)| **id != product_id)
            .map(|(_, other)| other)
            .chain(std::iter::once(line))
            .try_fold(0_i64, |total, l| {
                total.checked_add(i64::from(l.quantity).checked_mul(l.unit_price_cents)?)
            })
    }

    fn is_created(&self) -> bool {
        self.customer_id.is_some()
    }

    fn require_created(&self) -> Result<(), DomainError> {
        if self.is_created() {
            Ok(())
        } else {
            Err(DomainError::AggregateNotFound(self.id))
        }
    }

    fn require_status(&self, expected: OrderStatus, action: &str) -> Result<(), DomainError> {
        self.require_created()?;
        if self.status == expected {
            Ok(())
        } else {
            Err(DomainError::Validation(format!(
                "cannot {action} order {} in status {:?}",
                self.id, self.status
            )))
        }
    }

    /// Records a new event: updates in-memory state and queues it for
    /// persistence without touching the loaded version.
    fn record(&mut self, kind: OrderEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        self.mutate(&kind);
        // TODO: event_id uses Uuid::new_v4(); replaying a command log would
        // need the ID threaded in from the caller.
        self.uncommitted_events.push(OrderEvent {
            event_id: Uuid::new_v4(),
            correlation_id: Some(correlation_id),
            occurred_at: clock.now(),
            kind,
        });
    }

    fn mutate(&mut self, kind: &OrderEventKind) {
        match kind {
            OrderEventKind::OrderCreated(payload) => {
                self.customer_id = Some(payload.customer_id);
                self.currency.clone_from(&payload.currency);
                self.status = OrderStatus::Draft;
            }
            OrderEventKind::ItemAdded(payload) => {
                let line = self.lines.entry(payload.product_id).or_insert(OrderLine {
                    quantity: 0,
                    unit_price_cents: payload.unit_price_cents,
                });
                line.quantity = line.quantity.saturating_add(payload.quantity);
                line.unit_price_cents = payload.unit_price_cents;
            }
            OrderEventKind::ItemRemoved(payload) => {
                self.lines.remove(&payload.product_id);
            }
            OrderEventKind::OrderConfirmed(_) => self.status = OrderStatus::Confirmed,
            OrderEventKind::OrderShipped(_) => self.status = OrderStatus::Shipped,
            OrderEventKind::OrderCancelled(_) => self.status = OrderStatus::Cancelled,
        }
    }

    /// Opens the order, producing an `OrderCreated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the order already exists or the
    /// currency is not a three-letter code.
    pub fn create(
        &mut self,
        customer_id: Uuid,
        currency: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.is_created() {
            return Err(DomainError::Validation(format!(
                "order {} already exists",
                self.id
            )));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::Validation(format!(
                "currency must be a three-letter code, got {currency:?}"
            )));
        }
        self.record(
            OrderEventKind::OrderCreated(OrderCreated {
                order_id: self.id,
                customer_id,
                currency: currency.to_ascii_uppercase(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Adds units of a product, producing an `ItemAdded` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the order is not a draft, the
    /// quantity is zero, the price is negative, or the line or order total
    /// would no longer fit in `i64`.
    pub fn add_item(
        &mut self,
        product_id: Uuid,
        quantity: u32,
        unit_price_cents: i64,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_status(OrderStatus::Draft, "add items to")?;
        if quantity == 0 {
            return Err(DomainError::Validation(
                "quantity must be greater than zero".into(),
            ));
        }
        if unit_price_cents < 0 {
            return Err(DomainError::Validation(
                "unit price must not be negative".into(),
            ));
        }
        let existing = self.lines.get(&product_id).map_or(0, |line| line.quantity);
        let fits = existing.checked_add(quantity).is_some_and(|quantity| {
            let line = OrderLine {
                quantity,
                unit_price_cents,
            };
            self.total_with(product_id, &line).is_some()
        });
        if !fits {
            return Err(DomainError::Validation(format!(
                "adding {quantity} x {unit_price_cents} to order {} would overflow its total",
                self.id
            )));
        }
        self.record(
            OrderEventKind::ItemAdded(ItemAdded {
                order_id: self.id,
                product_id,
                quantity,
                unit_price_cents,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Removes a product line, producing an `ItemRemoved` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the order is not a draft or the
    /// product is not on it.
    pub fn remove_item(
        &mut self,
        product_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_status(OrderStatus::Draft, "remove items from")?;
        if !self.lines.contains_key(&product_id) {
            return Err(DomainError::Validation(format!(
                "product {product_id} not found in order {}",
                self.id
            )));
        }
        self.record(
            OrderEventKind::ItemRemoved(ItemRemoved {
                order_id: self.id,
                product_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Confirms the order, producing an `OrderConfirmed` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the order is not a draft or has
    /// no lines.
    pub fn confirm(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.require_status(OrderStatus::Draft, "confirm")?;
        if self.lines.is_empty() {
            return Err(DomainError::Validation(format!(
                "order {} has no items",
                self.id
            )));
        }
        let total_cents = self.total_cents();
        self.record(
            OrderEventKind::OrderConfirmed(OrderConfirmed {
                order_id: self.id,
                total_cents,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Marks the order shipped, producing an `OrderShipped` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the order is not confirmed or the
    /// tracking number is blank.
    pub fn ship(
        &mut self,
        tracking_number: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_status(OrderStatus::Confirmed, "ship")?;
        if tracking_number.trim().is_empty() {
            return Err(DomainError::Validation(
                "tracking number must not be empty".into(),
            ));
        }
        self.record(
            OrderEventKind::OrderShipped(OrderShipped {
                order_id: self.id,
                tracking_number: tracking_number.trim().to_owned(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Cancels the order, producing an `OrderCancelled` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the order has shipped or is
    /// already cancelled.
    pub fn cancel(
        &mut self,
        reason: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_created()?;
        if matches!(self.status, OrderStatus::Shipped | OrderStatus::Cancelled) {
            return Err(DomainError::Validation(format!(
                "cannot cancel order {} in status {:?}",
                self.id, self.status
            )));
        }
        self.record(
            OrderEventKind::OrderCancelled(OrderCancelled {
                order_id: self.id,
                reason: reason.to_owned(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }
}

impl AggregateRoot for Order {
    type Event = OrderEvent;

    const AGGREGATE_TYPE: &'static str = "Order";

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        self.mutate(&event.kind);
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
