//! Notification inbox operations.

use chrono::Utc;
use common::{NotificationId, OrderId, UserId};
use domain::{Notification, NotificationCategory, NotificationKind};
use store::NotificationStore;

use crate::dispatcher::NotificationDispatcher;
use crate::error::Result;

/// A notification created directly rather than by an order transition.
#[derive(Debug, Clone)]
pub struct ManualNotification {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub order: Option<OrderId>,
    pub order_number: Option<String>,
    pub category: Option<NotificationCategory>,
}

impl ManualNotification {
    pub fn new(recipient: UserId, kind: NotificationKind) -> Self {
        Self {
            recipient,
            kind,
            order: None,
            order_number: None,
            category: None,
        }
    }
}

/// Lists, creates and acknowledges a user's notifications.
#[derive(Clone)]
pub struct NotificationService<S: NotificationStore + Clone> {
    store: S,
    dispatcher: NotificationDispatcher<S>,
}

impl<S: NotificationStore + Clone> NotificationService<S> {
    pub fn new(store: S, dispatcher: NotificationDispatcher<S>) -> Self {
        Self { store, dispatcher }
    }

    /// Creates a notification with the fixed text for its kind.
    ///
    /// Unlike transition notifications, store failures are returned.
    #[tracing::instrument(skip(self, request), fields(recipient = %request.recipient, kind = %request.kind))]
    pub async fn create_manual(&self, request: ManualNotification) -> Result<Notification> {
        let mut draft = self
            .dispatcher
            .factory()
            .manual(request.recipient, request.kind, Utc::now());
        draft.order = request.order;
        draft.order_number = request.order_number;
        draft.category = request.category;

        Ok(self.dispatcher.persist(draft).await?)
    }

    /// All notifications for a user, newest first.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Notification>> {
        Ok(self.store.list_notifications(user).await?)
    }

    pub async fn list_unread(&self, user: UserId) -> Result<Vec<Notification>> {
        Ok(self.store.list_notifications_by_read(user, false).await?)
    }

    pub async fn list_read(&self, user: UserId) -> Result<Vec<Notification>> {
        Ok(self.store.list_notifications_by_read(user, true).await?)
    }

    /// Marks a notification as read. Returns None if it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn mark_read(&self, id: NotificationId) -> Result<Option<Notification>> {
        Ok(self.store.mark_notification_read(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::NotificationBus;
    use domain::NotificationFactory;
    use store::InMemoryStore;

    fn service(store: InMemoryStore) -> NotificationService<InMemoryStore> {
        let dispatcher = NotificationDispatcher::new(
            store.clone(),
            NotificationFactory::default(),
            NotificationBus::default(),
        );
        NotificationService::new(store, dispatcher)
    }

    #[tokio::test]
    async fn test_manual_then_read_flow() {
        let store = InMemoryStore::new();
        let service = service(store);
        let user = UserId::new();

        let mut request = ManualNotification::new(user, NotificationKind::OrderShipped);
        request.category = Some(NotificationCategory::Purchase);
        request.order_number = Some("#42".to_string());
        let created = service.create_manual(request).await.unwrap();

        assert_eq!(created.message, "Tu pedido ha sido enviado.");
        assert_eq!(created.category, Some(NotificationCategory::Purchase));
        assert!(!created.read);

        assert_eq!(service.list_unread(user).await.unwrap().len(), 1);
        assert!(service.list_read(user).await.unwrap().is_empty());

        let marked = service.mark_read(created.id).await.unwrap().unwrap();
        assert!(marked.read);
        assert!(service.list_unread(user).await.unwrap().is_empty());
        assert_eq!(service.list_read(user).await.unwrap().len(), 1);
        assert_eq!(service.list_for_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_unknown_notification() {
        let service = service(InMemoryStore::new());
        assert!(service.mark_read(NotificationId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_manual_surfaces_store_failure() {
        let store = InMemoryStore::new();
        store.set_fail_on_notifications(true).await;
        let result = service(store)
            .create_manual(ManualNotification::new(UserId::new(), NotificationKind::OrderCancelled))
            .await;
        assert!(result.is_err());
    }
}
