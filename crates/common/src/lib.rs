//! Shared types for the marketplace workspace.

pub mod types;

pub use types::{NotificationId, OrderId, ProductId, UserId, Version};
