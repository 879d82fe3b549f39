//! Maps order status transitions to the notifications they produce.

use chrono::{DateTime, Utc};
use common::UserId;

use super::{
    MessageSet, NotificationCategory, NotificationDraft, NotificationError, NotificationKind,
};
use crate::order::{Order, OrderStatus};

/// Builds notification drafts for order transitions.
///
/// | status    | recipients                      |
/// |-----------|---------------------------------|
/// | Pending   | buyer (purchase), seller (sale) |
/// | Shipped   | buyer (purchase)                |
/// | Cancelled | seller (sale)                   |
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationFactory {
    messages: MessageSet,
}

impl NotificationFactory {
    pub fn new(messages: MessageSet) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> MessageSet {
        self.messages
    }

    /// Drafts the notifications for `order` entering `status`.
    pub fn for_transition(
        &self,
        order: &Order,
        status: OrderStatus,
        order_number: &str,
        product_title: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Vec<NotificationDraft>, NotificationError> {
        let draft = |recipient: UserId,
                     kind: NotificationKind,
                     message: String,
                     category: NotificationCategory| NotificationDraft {
            recipient,
            kind,
            message,
            order: Some(order.id()),
            order_number: Some(order_number.to_string()),
            category: Some(category),
            product_title: product_title.map(str::to_string),
            order_status: Some(status),
            created_at: at,
        };

        match status {
            OrderStatus::Pending => Ok(vec![
                draft(
                    order.buyer(),
                    NotificationKind::OrderConfirmed,
                    self.messages.order_created(order_number),
                    NotificationCategory::Purchase,
                ),
                draft(
                    order.seller(),
                    NotificationKind::OrderConfirmed,
                    self.messages.new_sale(order_number),
                    NotificationCategory::Sale,
                ),
            ]),
            OrderStatus::Shipped => Ok(vec![draft(
                order.buyer(),
                NotificationKind::OrderShipped,
                self.messages.order_shipped(order_number),
                NotificationCategory::Purchase,
            )]),
            OrderStatus::Cancelled => Ok(vec![draft(
                order.seller(),
                NotificationKind::OrderCancelled,
                self.messages.order_cancelled(order_number),
                NotificationCategory::Sale,
            )]),
            OrderStatus::Delivered => Err(NotificationError::UnhandledStatus(status)),
        }
    }

    /// Drafts a notification with the fixed text for `kind`.
    pub fn manual(
        &self,
        recipient: UserId,
        kind: NotificationKind,
        at: DateTime<Utc>,
    ) -> NotificationDraft {
        NotificationDraft::new(recipient, kind, self.messages.generic(kind), at)
    }
}
