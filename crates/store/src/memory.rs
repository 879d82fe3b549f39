use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::{NotificationId, OrderId, ProductId, UserId};
use domain::{Notification, Order, Product, StockError, User, UserRole};
use tokio::sync::RwLock;

use crate::{
    NotificationStore, OrderStore, ProductStore, Result, StoreError, UserStore,
};

#[derive(Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    users: HashMap<UserId, User>,
    orders: HashMap<OrderId, Order>,
    notifications: Vec<Notification>,
    failing_products: HashSet<ProductId>,
    fail_notifications: bool,
}

/// In-memory store implementation for tests and local development.
///
/// Provides the same interface and guarantees as the PostgreSQL
/// implementation. Every operation takes the single lock, so stock checks and
/// version checks are atomic.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of stored notifications.
    pub async fn notification_count(&self) -> usize {
        self.state.read().await.notifications.len()
    }

    /// Returns the current stock of a product, if it exists.
    pub async fn stock_of(&self, id: ProductId) -> Option<u32> {
        self.state.read().await.products.get(&id).map(|p| p.stock)
    }

    /// Removes a product from the catalog. Returns false if it did not exist.
    pub async fn remove_product(&self, id: ProductId) -> bool {
        self.state.write().await.products.remove(&id).is_some()
    }

    /// Makes every stock mutation on `id` fail with `Unavailable`.
    pub async fn fail_stock_updates_for(&self, id: ProductId) {
        self.state.write().await.failing_products.insert(id);
    }

    /// Configures whether notification inserts fail.
    pub async fn set_fail_on_notifications(&self, fail: bool) {
        self.state.write().await.fail_notifications = fail;
    }
}

fn stock_error(id: ProductId, err: StockError) -> StoreError {
    match err {
        StockError::Insufficient {
            requested,
            available,
        } => StoreError::InsufficientStock {
            product: id,
            requested,
            available,
        },
        StockError::Overflow => StoreError::StockOverflow(id),
    }
}

impl MemoryState {
    fn product_mut(&mut self, id: ProductId) -> Result<&mut Product> {
        if self.failing_products.contains(&id) {
            return Err(StoreError::Unavailable(format!(
                "stock updates disabled for product {id}"
            )));
        }
        self.products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn insert_product(&self, product: Product) -> Result<()> {
        self.state
            .write()
            .await
            .products
            .insert(product.id, product);
        Ok(())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<Product> {
        let mut state = self.state.write().await;
        let product = state.product_mut(id)?;
        product
            .decrement_stock(quantity)
            .map_err(|e| stock_error(id, e))?;
        Ok(product.clone())
    }

    async fn increment_stock(&self, id: ProductId, quantity: u32) -> Result<Product> {
        let mut state = self.state.write().await;
        let product = state.product_mut(id)?;
        product
            .increment_stock(quantity)
            .map_err(|e| stock_error(id, e))?;
        Ok(product.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: User) -> Result<()> {
        self.state.write().await.users.insert(user.id, user);
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, mut order: Order) -> Result<Order> {
        let mut state = self.state.write().await;

        if let Some(key) = order.idempotency_key()
            && state
                .orders
                .values()
                .any(|o| o.idempotency_key() == Some(key))
        {
            return Err(StoreError::DuplicateIdempotencyKey(key.to_string()));
        }

        order.set_version(common::Version::first());
        state.orders.insert(order.id(), order.clone());
        Ok(order)
    }

    async fn update_order(&self, mut order: Order) -> Result<Order> {
        let mut state = self.state.write().await;
        let stored = state
            .orders
            .get_mut(&order.id())
            .ok_or(StoreError::OrderNotFound(order.id()))?;

        if stored.version() != order.version() {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected: order.version(),
                actual: stored.version(),
            });
        }

        order.set_version(order.version().next());
        *stored = order.clone();
        Ok(order)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn find_order_by_idempotency_key(&self, key: &str) -> Result<Option<Order>> {
        Ok(self
            .state
            .read()
            .await
            .orders
            .values()
            .find(|o| o.idempotency_key() == Some(key))
            .cloned())
    }

    async fn list_orders_for_user(&self, user: UserId, role: UserRole) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| match role {
                UserRole::Buyer => o.buyer() == user,
                UserRole::Seller => o.seller() == user,
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        Ok(self.state.write().await.orders.remove(&id).is_some())
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert_notification(&self, notification: Notification) -> Result<Notification> {
        let mut state = self.state.write().await;
        if state.fail_notifications {
            return Err(StoreError::Unavailable(
                "notification inserts disabled".to_string(),
            ));
        }
        state.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, user: UserId) -> Result<Vec<Notification>> {
        let state = self.state.read().await;
        Ok(newest_first(
            state.notifications.iter().filter(|n| n.recipient == user),
        ))
    }

    async fn list_notifications_by_read(
        &self,
        user: UserId,
        read: bool,
    ) -> Result<Vec<Notification>> {
        let state = self.state.read().await;
        Ok(newest_first(
            state
                .notifications
                .iter()
                .filter(|n| n.recipient == user && n.read == read),
        ))
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<Option<Notification>> {
        let mut state = self.state.write().await;
        Ok(state
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .map(|n| {
                n.mark_read();
                n.clone()
            }))
    }
}

/// Newest first; among equal timestamps the most recently inserted wins.
fn newest_first<'a>(notifications: impl DoubleEndedIterator<Item = &'a Notification>) -> Vec<Notification> {
    let mut list: Vec<_> = notifications.rev().cloned().collect();
    list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use common::Version;
    use domain::{
        Currency, DeliveryAddress, LineItem, Money, NotificationDraft, NotificationKind,
    };

    fn product(stock: u32) -> Product {
        Product::new(
            UserId::new(),
            "Termo",
            Money::from_cents(30000),
            Currency::ArgentinePeso,
            stock,
        )
    }

    fn order_for(buyer: UserId, seller: UserId, key: Option<&str>) -> Order {
        Order::place(
            OrderId::new(),
            buyer,
            seller,
            Currency::ArgentinePeso,
            DeliveryAddress {
                street: "San Martín".to_string(),
                number: 10,
                floor: None,
                unit: None,
                postal_code: "8400".to_string(),
                city: "Bariloche".to_string(),
                province: "Río Negro".to_string(),
                country: "Argentina".to_string(),
                lat: -41.1,
                long: -71.3,
            },
            vec![LineItem::new(ProductId::new(), "Termo", 1, Money::from_cents(30000))],
            Utc::now(),
            key.map(str::to_string),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn decrement_and_increment_stock() {
        let store = InMemoryStore::new();
        let p = product(5);
        store.insert_product(p.clone()).await.unwrap();

        let updated = store.decrement_stock(p.id, 2).await.unwrap();
        assert_eq!(updated.stock, 3);

        let updated = store.increment_stock(p.id, 1).await.unwrap();
        assert_eq!(updated.stock, 4);
        assert_eq!(store.stock_of(p.id).await, Some(4));
    }

    #[tokio::test]
    async fn decrement_below_zero_fails_and_leaves_stock() {
        let store = InMemoryStore::new();
        let p = product(1);
        store.insert_product(p.clone()).await.unwrap();

        let err = store.decrement_stock(p.id, 2).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            }
        ));
        assert_eq!(store.stock_of(p.id).await, Some(1));
    }

    #[tokio::test]
    async fn stock_mutation_on_missing_product() {
        let store = InMemoryStore::new();
        let id = ProductId::new();
        assert!(matches!(
            store.decrement_stock(id, 1).await,
            Err(StoreError::ProductNotFound(p)) if p == id
        ));
    }

    #[tokio::test]
    async fn failing_product_rejects_stock_updates() {
        let store = InMemoryStore::new();
        let p = product(3);
        store.insert_product(p.clone()).await.unwrap();
        store.fail_stock_updates_for(p.id).await;

        assert!(matches!(
            store.decrement_stock(p.id, 1).await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.stock_of(p.id).await, Some(3));
    }

    #[tokio::test]
    async fn insert_assigns_first_version() {
        let store = InMemoryStore::new();
        let stored = store
            .insert_order(order_for(UserId::new(), UserId::new(), None))
            .await
            .unwrap();
        assert_eq!(stored.version(), Version::first());
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let store = InMemoryStore::new();
        let stored = store
            .insert_order(order_for(UserId::new(), UserId::new(), None))
            .await
            .unwrap();

        let mut first = stored.clone();
        first.cancel(Utc::now()).unwrap();
        let first = store.update_order(first).await.unwrap();
        assert_eq!(first.version(), Version::new(2));

        let mut stale = stored;
        let seller = stale.seller();
        stale.ship(seller, Utc::now()).unwrap();
        let err = store.update_order(stale).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ConcurrencyConflict { expected, actual, .. }
                if expected == Version::first() && actual == Version::new(2)
        ));

        let current = store.find_order(first.id()).await.unwrap().unwrap();
        assert_eq!(current.status(), domain::OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn update_missing_order() {
        let store = InMemoryStore::new();
        let order = order_for(UserId::new(), UserId::new(), None);
        assert!(matches!(
            store.update_order(order).await,
            Err(StoreError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn idempotency_key_is_unique() {
        let store = InMemoryStore::new();
        let stored = store
            .insert_order(order_for(UserId::new(), UserId::new(), Some("k-1")))
            .await
            .unwrap();

        let err = store
            .insert_order(order_for(UserId::new(), UserId::new(), Some("k-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdempotencyKey(k) if k == "k-1"));

        let found = store.find_order_by_idempotency_key("k-1").await.unwrap();
        assert_eq!(found.map(|o| o.id()), Some(stored.id()));
        assert!(store.find_order_by_idempotency_key("k-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_orders_by_role() {
        let store = InMemoryStore::new();
        let buyer = UserId::new();
        let seller = UserId::new();
        store.insert_order(order_for(buyer, seller, None)).await.unwrap();
        store.insert_order(order_for(buyer, UserId::new(), None)).await.unwrap();
        store.insert_order(order_for(UserId::new(), seller, None)).await.unwrap();

        let as_buyer = store.list_orders_for_user(buyer, UserRole::Buyer).await.unwrap();
        let as_seller = store.list_orders_for_user(seller, UserRole::Seller).await.unwrap();
        assert_eq!(as_buyer.len(), 2);
        assert_eq!(as_seller.len(), 2);
        assert!(as_buyer[0].created_at() >= as_buyer[1].created_at());
    }

    #[tokio::test]
    async fn delete_order() {
        let store = InMemoryStore::new();
        let stored = store
            .insert_order(order_for(UserId::new(), UserId::new(), None))
            .await
            .unwrap();
        assert!(store.delete_order(stored.id()).await.unwrap());
        assert!(!store.delete_order(stored.id()).await.unwrap());
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn notifications_listing_and_mark_read() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let now = Utc::now();

        let older = Notification::from_draft(
            NotificationId::new(),
            NotificationDraft::new(user, NotificationKind::OrderConfirmed, "a", now - Duration::minutes(1)),
        );
        let newer = Notification::from_draft(
            NotificationId::new(),
            NotificationDraft::new(user, NotificationKind::OrderShipped, "b", now),
        );
        let other = Notification::from_draft(
            NotificationId::new(),
            NotificationDraft::new(UserId::new(), NotificationKind::OrderShipped, "c", now),
        );
        for n in [older.clone(), newer.clone(), other] {
            store.insert_notification(n).await.unwrap();
        }

        let all = store.list_notifications(user).await.unwrap();
        assert_eq!(all.iter().map(|n| n.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

        let marked = store.mark_notification_read(older.id).await.unwrap().unwrap();
        assert!(marked.read);

        let unread = store.list_notifications_by_read(user, false).await.unwrap();
        let read = store.list_notifications_by_read(user, true).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, newer.id);
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].id, older.id);

        assert!(store.mark_notification_read(NotificationId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failing_notifications() {
        let store = InMemoryStore::new();
        store.set_fail_on_notifications(true).await;
        let n = Notification::from_draft(
            NotificationId::new(),
            NotificationDraft::new(UserId::new(), NotificationKind::OrderShipped, "x", Utc::now()),
        );
        assert!(store.insert_notification(n).await.is_err());
        assert_eq!(store.notification_count().await, 0);
    }
}
