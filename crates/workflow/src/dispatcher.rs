//! Persists and publishes the notifications for order transitions.

use chrono::Utc;
use common::NotificationId;
use domain::{Notification, NotificationDraft, NotificationFactory, Order, OrderStatus};
use store::NotificationStore;

use crate::bus::NotificationBus;

/// Turns order transitions into stored notifications.
///
/// Notification failures never fail the order operation that triggered
/// them: [`dispatch`](Self::dispatch) logs and counts every failure and
/// returns whatever could be stored.
#[derive(Clone)]
pub struct NotificationDispatcher<S: NotificationStore> {
    store: S,
    factory: NotificationFactory,
    bus: NotificationBus,
}

impl<S: NotificationStore> NotificationDispatcher<S> {
    pub fn new(store: S, factory: NotificationFactory, bus: NotificationBus) -> Self {
        Self {
            store,
            factory,
            bus,
        }
    }

    pub fn factory(&self) -> &NotificationFactory {
        &self.factory
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Creates one notification per interested party for `order` entering
    /// `status`.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn dispatch(&self, order: &Order, status: OrderStatus) -> Vec<Notification> {
        let number = order.display_number();
        let drafts = match self.factory.for_transition(
            order,
            status,
            &number,
            order.first_product_title(),
            Utc::now(),
        ) {
            Ok(drafts) => drafts,
            Err(e) => {
                metrics::counter!("notification_failures_total").increment(1);
                tracing::warn!(error = %e, "no notifications for transition");
                return Vec::new();
            }
        };

        let mut sent = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let recipient = draft.recipient;
            match self.persist(draft).await {
                Ok(notification) => sent.push(notification),
                Err(e) => {
                    metrics::counter!("notification_failures_total").increment(1);
                    tracing::warn!(%recipient, error = %e, "failed to store notification");
                }
            }
        }
        sent
    }

    /// Stores a draft and publishes it on the bus.
    pub async fn persist(&self, draft: NotificationDraft) -> store::Result<Notification> {
        let notification = self
            .store
            .insert_notification(Notification::from_draft(NotificationId::new(), draft))
            .await?;

        metrics::counter!("notifications_created_total").increment(1);
        let receivers = self.bus.publish(notification.clone());
        tracing::debug!(
            notification_id = %notification.id,
            kind = %notification.kind,
            receivers,
            "notification stored"
        );

        Ok(notification)
    }
}
