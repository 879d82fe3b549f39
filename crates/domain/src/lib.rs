//! Domain layer for the marketplace order workflow.
//!
//! This crate provides:
//! - Order aggregate with its status state machine and status history
//! - Product and User records the workflow reads and mutates
//! - Notification records and the factory that maps order transitions
//!   to notifications

pub mod notification;
pub mod order;
pub mod product;
pub mod user;

pub use notification::{
    Language, MessageSet, Notification, NotificationCategory, NotificationDraft,
    NotificationError, NotificationFactory, NotificationKind,
};
pub use order::{
    CancelOrder, Currency, DeliveryAddress, LineItem, MarkShipped, Money, Order, OrderError,
    OrderParts, OrderStatus, PlaceOrder, RequestedItem, StatusChange,
};
pub use product::{Product, StockError};
pub use user::{User, UserRole};
