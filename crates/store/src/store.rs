use async_trait::async_trait;
use common::{NotificationId, OrderId, ProductId, UserId};
use domain::{Notification, Order, Product, User, UserRole};

use crate::Result;

/// Read access to the catalog plus the two stock mutations the order
/// workflow is allowed to perform.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Inserts or replaces a product.
    async fn insert_product(&self, product: Product) -> Result<()>;

    /// Looks up a product by ID.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Removes `quantity` units from stock.
    ///
    /// The check and the write happen atomically: if fewer than `quantity`
    /// units are available the call fails with `InsufficientStock` and stock
    /// is left unchanged. Returns the updated product.
    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<Product>;

    /// Returns `quantity` units to stock. Returns the updated product.
    async fn increment_stock(&self, id: ProductId, quantity: u32) -> Result<Product>;
}

/// Read access to registered users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts or replaces a user.
    async fn insert_user(&self, user: User) -> Result<()>;

    /// Looks up a user by ID.
    async fn find_user(&self, id: UserId) -> Result<Option<User>>;
}

/// Persistence for order aggregates.
///
/// Every stored order carries a version. `insert_order` stores version 1 and
/// `update_order` only succeeds when the stored version still equals the
/// version on the order passed in, bumping it by one.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Stores a new order and returns it with its assigned version.
    ///
    /// Fails with `DuplicateIdempotencyKey` if another order already uses the
    /// same idempotency key.
    async fn insert_order(&self, order: Order) -> Result<Order>;

    /// Replaces the status and history of a stored order.
    ///
    /// Fails with `ConcurrencyConflict` if the order changed since it was
    /// loaded, and `OrderNotFound` if it no longer exists.
    async fn update_order(&self, order: Order) -> Result<Order>;

    /// Looks up an order by ID.
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Looks up the order created with the given idempotency key.
    async fn find_order_by_idempotency_key(&self, key: &str) -> Result<Option<Order>>;

    /// Orders where `user` is the buyer (`Buyer`) or the seller (`Seller`),
    /// newest first.
    async fn list_orders_for_user(&self, user: UserId, role: UserRole) -> Result<Vec<Order>>;

    /// Removes an order. Returns false if it did not exist.
    ///
    /// Only used to undo an order whose creation could not be completed.
    async fn delete_order(&self, id: OrderId) -> Result<bool>;
}

/// Persistence for notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Stores a new notification.
    async fn insert_notification(&self, notification: Notification) -> Result<Notification>;

    /// All notifications for a user, newest first.
    async fn list_notifications(&self, user: UserId) -> Result<Vec<Notification>>;

    /// Notifications for a user filtered by read flag, newest first.
    async fn list_notifications_by_read(&self, user: UserId, read: bool)
    -> Result<Vec<Notification>>;

    /// Sets the read flag. Returns None if the notification does not exist.
    async fn mark_notification_read(&self, id: NotificationId) -> Result<Option<Notification>>;
}

/// A backend that provides every store the marketplace needs.
///
/// Implemented automatically for any cloneable type implementing the four
/// store traits.
pub trait MarketplaceStore:
    ProductStore + UserStore + OrderStore + NotificationStore + Clone + 'static
{
}

impl<T> MarketplaceStore for T where
    T: ProductStore + UserStore + OrderStore + NotificationStore + Clone + 'static
{
}
