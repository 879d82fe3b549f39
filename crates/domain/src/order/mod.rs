//! Order aggregate and related types.

mod aggregate;
mod commands;
mod state;
mod value_objects;

pub use aggregate::{Order, OrderParts};
pub use commands::{CancelOrder, MarkShipped, PlaceOrder, RequestedItem};
pub use state::OrderStatus;
pub use value_objects::{Currency, DeliveryAddress, LineItem, Money, StatusChange};

use common::ProductId;
use thiserror::Error;

/// Errors raised by the order aggregate itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity for product {product} (must be greater than 0)")]
    InvalidQuantity { product: ProductId },

    /// Invalid price.
    #[error("Invalid unit price {price} for product {product} (must not be negative)")]
    InvalidPrice { product: ProductId, price: i64 },

    /// The sum of the line subtotals does not fit in a money amount.
    #[error("Order total is too large (product {product})")]
    TotalOverflow { product: ProductId },

    /// The order has already been shipped, delivered or cancelled.
    #[error(
        "Order cannot be cancelled: it is {status} or has already been shipped, delivered or cancelled"
    )]
    NotCancelable { status: OrderStatus },

    /// The order is not pending, so it cannot be shipped.
    #[error("Order cannot be marked as shipped from {status} status")]
    NotShippable { status: OrderStatus },

    /// Stored status history does not end with the stored status.
    #[error("Status history does not end in the current status {status}")]
    InconsistentHistory { status: OrderStatus },
}
