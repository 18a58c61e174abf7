//! Domain events for the Order context.

use chrono::{DateTime, Utc};
use niespro_core::event::{DomainEvent, EventKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type tag for `OrderCreated`.
pub const ORDER_CREATED_EVENT_TYPE: &str = "order.created";
/// Event type tag for `ItemAdded`.
pub const ITEM_ADDED_EVENT_TYPE: &str = "order.item_added";
/// Event type tag for `ItemRemoved`.
pub const ITEM_REMOVED_EVENT_TYPE: &str = "order.item_removed";
/// Event type tag for `OrderConfirmed`.
pub const ORDER_CONFIRMED_EVENT_TYPE: &str = "order.confirmed";
/// Event type tag for `OrderShipped`.
pub const ORDER_SHIPPED_EVENT_TYPE: &str = "order.shipped";
/// Event type tag for `OrderCancelled`.
pub const ORDER_CANCELLED_EVENT_TYPE: &str = "order.cancelled";

/// Emitted when a customer opens a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    /// The order identifier.
    pub order_id: Uuid,
    /// The customer placing the order.
    pub customer_id: Uuid,
    /// ISO 4217 currency code for all prices on the order.
    pub currency: String,
}

/// Emitted when a product line is added (or its quantity increased).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    /// The order identifier.
    pub order_id: Uuid,
    /// The product identifier.
    pub product_id: Uuid,
    /// Units added.
    pub quantity: u32,
    /// Price per unit in minor currency units.
    pub unit_price_cents: i64,
}

/// Emitted when a product line is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    /// The order identifier.
    pub order_id: Uuid,
    /// The product identifier.
    pub product_id: Uuid,
}

/// Emitted when the customer confirms the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    /// The order identifier.
    pub order_id: Uuid,
    /// Order total at confirmation, in minor currency units.
    pub total_cents: i64,
}

/// Emitted when a confirmed order leaves the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderShipped {
    /// The order identifier.
    pub order_id: Uuid,
    /// Carrier tracking number.
    pub tracking_number: String,
}

/// Emitted when an order is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    /// The order identifier.
    pub order_id: Uuid,
    /// Why the order was cancelled.
    pub reason: String,
}

/// Event payload variants for the Order context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEventKind {
    /// An order has been created.
    OrderCreated(OrderCreated),
    /// An item has been added.
    ItemAdded(ItemAdded),
    /// An item has been removed.
    ItemRemoved(ItemRemoved),
    /// The order has been confirmed.
    OrderConfirmed(OrderConfirmed),
    /// The order has been shipped.
    OrderShipped(OrderShipped),
    /// The order has been cancelled.
    OrderCancelled(OrderCancelled),
}

impl EventKind for OrderEventKind {
    fn kind(&self) -> &'static str {
        match self {
            Self::OrderCreated(_) => ORDER_CREATED_EVENT_TYPE,
            Self::ItemAdded(_) => ITEM_ADDED_EVENT_TYPE,
            Self::ItemRemoved(_) => ITEM_REMOVED_EVENT_TYPE,
            Self::OrderConfirmed(_) => ORDER_CONFIRMED_EVENT_TYPE,
            Self::OrderShipped(_) => ORDER_SHIPPED_EVENT_TYPE,
            Self::OrderCancelled(_) => ORDER_CANCELLED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the Order context.
#[derive(Debug, Clone)]
pub struct OrderEvent {
    /// Identity of this event occurrence.
    pub event_id: Uuid,
    /// Correlation ID of the command that produced it.
    pub correlation_id: Option<Uuid>,
    /// When it occurred.
    pub occurred_at: DateTime<Utc>,
    /// Event-specific payload.
    pub kind: OrderEventKind,
}

impl DomainEvent for OrderEvent {
    fn event_id(&self) -> Uuid {
        self.event_id
    }

    fn event_type(&self) -> &'static str {
        self.kind.kind()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }

    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.kind)
    }
}
