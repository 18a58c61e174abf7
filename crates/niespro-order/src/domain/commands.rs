//! Commands for the Order context.

use niespro_core::command::Command;
use uuid::Uuid;

/// Command to open a new order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The identifier to give the new order.
    pub order_id: Uuid,
    /// The customer placing the order.
    pub customer_id: Uuid,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Command to add units of a product to an order.
#[derive(Debug, Clone)]
pub struct AddItem {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target order.
    pub order_id: Uuid,
    /// The product to add.
    pub product_id: Uuid,
    /// Units to add.
    pub quantity: u32,
    /// Price per unit in minor currency units.
    pub unit_price_cents: i64,
}

/// Command to remove a product line from an order.
#[derive(Debug, Clone)]
pub struct RemoveItem {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target order.
    pub order_id: Uuid,
    /// The product to remove.
    pub product_id: Uuid,
}

/// Command to confirm an order.
#[derive(Debug, Clone)]
pub struct ConfirmOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target order.
    pub order_id: Uuid,
}

/// Command to mark an order as shipped.
#[derive(Debug, Clone)]
pub struct ShipOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target order.
    pub order_id: Uuid,
    /// Carrier tracking number.
    pub tracking_number: String,
}

/// Command to cancel an order.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target order.
    pub order_id: Uuid,
    /// Why the order is being cancelled.
    pub reason: String,
}

macro_rules! impl_command {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(
            impl Command for $ty {
                fn command_type(&self) -> &'static str {
                    $name
                }

                fn correlation_id(&self) -> Uuid {
                    self.correlation_id
                }
            }
        )+
    };
}

impl_command! {
    CreateOrder => "order.create",
    AddItem => "order.add_item",
    RemoveItem => "order.remove_item",
    ConfirmOrder => "order.confirm",
    ShipOrder => "order.ship",
    CancelOrder => "order.cancel",
}
