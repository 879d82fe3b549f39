//! Notifications sent to buyers and sellers when an order changes status.

mod factory;
mod messages;

pub use factory::NotificationFactory;
pub use messages::{Language, MessageSet};

use chrono::{DateTime, Utc};
use common::{NotificationId, OrderId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::OrderStatus;

/// Errors raised while synthesizing notifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// No notification mapping exists for this status.
    #[error("Unhandled order status for notification: {0}")]
    UnhandledStatus(OrderStatus),
}

/// What happened to the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "confirmacion_pedido")]
    OrderConfirmed,
    #[serde(rename = "pedido_enviado")]
    OrderShipped,
    #[serde(rename = "pedido_cancelado")]
    OrderCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderConfirmed => "confirmacion_pedido",
            NotificationKind::OrderShipped => "pedido_enviado",
            NotificationKind::OrderCancelled => "pedido_cancelado",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmacion_pedido" => Ok(NotificationKind::OrderConfirmed),
            "pedido_enviado" => Ok(NotificationKind::OrderShipped),
            "pedido_cancelado" => Ok(NotificationKind::OrderCancelled),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// Whether the recipient sees the notification as a purchase or a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationCategory {
    #[serde(rename = "compra")]
    Purchase,
    #[serde(rename = "venta")]
    Sale,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Purchase => "compra",
            NotificationCategory::Sale => "venta",
        }
    }
}

impl std::str::FromStr for NotificationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compra" => Ok(NotificationCategory::Purchase),
            "venta" => Ok(NotificationCategory::Sale),
            other => Err(format!("unknown notification category: {other}")),
        }
    }
}

/// A notification that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub message: String,
    pub order: Option<OrderId>,
    pub order_number: Option<String>,
    pub category: Option<NotificationCategory>,
    pub product_title: Option<String>,
    pub order_status: Option<OrderStatus>,
    pub created_at: DateTime<Utc>,
}

impl NotificationDraft {
    /// A bare notification with no order context.
    pub fn new(
        recipient: UserId,
        kind: NotificationKind,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            recipient,
            kind,
            message: message.into(),
            order: None,
            order_number: None,
            category: None,
            product_title: None,
            order_status: None,
            created_at,
        }
    }
}

/// A persisted notification.
///
/// Only the read flag ever changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub message: String,
    pub order: Option<OrderId>,
    pub order_number: Option<String>,
    pub category: Option<NotificationCategory>,
    pub product_title: Option<String>,
    pub order_status: Option<OrderStatus>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Materializes a draft as an unread notification.
    pub fn from_draft(id: NotificationId, draft: NotificationDraft) -> Self {
        Self {
            id,
            recipient: draft.recipient,
            kind: draft.kind,
            message: draft.message,
            order: draft.order,
            order_number: draft.order_number,
            category: draft.category,
            product_title: draft.product_title,
            order_status: draft.order_status,
            read: false,
            created_at: draft.created_at,
        }
    }

    pub fn mark_read(&mut self) {
        self.read = true;
    }
}
