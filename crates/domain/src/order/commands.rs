//! Order commands.

use common::{OrderId, ProductId, UserId};

use super::{Currency, DeliveryAddress, Money};

/// Request to place a new order.
///
/// Prices are optional per item; when absent the product's current catalog
/// price is captured.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The buyer placing the order.
    pub buyer: UserId,

    /// The seller the caller declares the order is for.
    pub seller: UserId,

    /// Currency every line item is priced in.
    pub currency: Currency,

    /// Where the order is delivered.
    pub delivery_address: DeliveryAddress,

    /// Requested items, in the order they are validated and reserved.
    pub items: Vec<RequestedItem>,

    /// Client-supplied key that makes retries of the same request safe.
    pub idempotency_key: Option<String>,
}

impl PlaceOrder {
    /// Creates a new PlaceOrder command without an idempotency key.
    pub fn new(
        buyer: UserId,
        seller: UserId,
        currency: Currency,
        delivery_address: DeliveryAddress,
        items: Vec<RequestedItem>,
    ) -> Self {
        Self {
            buyer,
            seller,
            currency,
            delivery_address,
            items,
            idempotency_key: None,
        }
    }

    /// Attaches an idempotency key.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// One requested line of a [`PlaceOrder`] command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedItem {
    pub product: ProductId,
    pub quantity: u32,
    pub unit_price: Option<Money>,
}

impl RequestedItem {
    /// Requests `quantity` units at the catalog price.
    pub fn new(product: ProductId, quantity: u32) -> Self {
        Self {
            product,
            quantity,
            unit_price: None,
        }
    }

    /// Overrides the unit price.
    pub fn at_price(mut self, unit_price: Money) -> Self {
        self.unit_price = Some(unit_price);
        self
    }
}

/// Request to cancel an order.
#[derive(Debug, Clone, Copy)]
pub struct CancelOrder {
    pub order_id: OrderId,
}

impl CancelOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}

/// Request from a seller to mark an order as shipped.
#[derive(Debug, Clone, Copy)]
pub struct MarkShipped {
    pub order_id: OrderId,
    pub acting_user: UserId,
}

impl MarkShipped {
    pub fn new(order_id: OrderId, acting_user: UserId) -> Self {
        Self {
            order_id,
            acting_user,
        }
    }
}
