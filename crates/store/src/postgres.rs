use async_trait::async_trait;
use common::{NotificationId, OrderId, ProductId, UserId, Version};
use domain::{
    Notification, Order, OrderParts, OrderStatus, Product, User, UserRole,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    NotificationStore, OrderStore, ProductStore, Result, StoreError, UserStore,
};

const PRODUCT_COLUMNS: &str = "id, seller_id, title, price_cents, currency, stock, active";
const ORDER_COLUMNS: &str = "id, version, buyer_id, seller_id, currency, status, items, \
     status_history, delivery_address, created_at, idempotency_key";
const NOTIFICATION_COLUMNS: &str = "id, recipient_id, kind, message, order_id, order_number, \
     category, product_title, order_status, read, created_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    async fn current_stock(&self, id: ProductId) -> Result<Option<u32>> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        stock.map(|s| to_u32(s, "stock")).transpose()
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            seller: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            title: row.try_get("title")?,
            price: domain::Money::from_cents(row.try_get("price_cents")?),
            currency: parse_column(row.try_get::<String, _>("currency")?)?,
            stock: to_u32(row.try_get("stock")?, "stock")?,
            active: row.try_get("active")?,
        })
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        let roles = row
            .try_get::<Vec<String>, _>("roles")?
            .into_iter()
            .map(parse_column::<UserRole>)
            .collect::<Result<Vec<_>>>()?;

        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            roles,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let parts = OrderParts {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            version: Version::new(row.try_get("version")?),
            buyer: UserId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
            seller: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            items: serde_json::from_value(row.try_get("items")?)?,
            currency: parse_column(row.try_get::<String, _>("currency")?)?,
            status: parse_column(row.try_get::<String, _>("status")?)?,
            status_history: serde_json::from_value(row.try_get("status_history")?)?,
            delivery_address: serde_json::from_value(row.try_get("delivery_address")?)?,
            created_at: row.try_get("created_at")?,
            idempotency_key: row.try_get("idempotency_key")?,
        };

        Order::restore(parts).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    fn row_to_notification(row: PgRow) -> Result<Notification> {
        Ok(Notification {
            id: NotificationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            recipient: UserId::from_uuid(row.try_get::<Uuid, _>("recipient_id")?),
            kind: parse_column(row.try_get::<String, _>("kind")?)?,
            message: row.try_get("message")?,
            order: row
                .try_get::<Option<Uuid>, _>("order_id")?
                .map(OrderId::from_uuid),
            order_number: row.try_get("order_number")?,
            category: row
                .try_get::<Option<String>, _>("category")?
                .map(parse_column)
                .transpose()?,
            product_title: row.try_get("product_title")?,
            order_status: row
                .try_get::<Option<String>, _>("order_status")?
                .map(parse_column::<OrderStatus>)
                .transpose()?,
            read: row.try_get("read")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn parse_column<T>(value: String) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse().map_err(StoreError::Corrupt)
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn insert_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, seller_id, title, price_cents, currency, stock, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                seller_id = EXCLUDED.seller_id,
                title = EXCLUDED.title,
                price_cents = EXCLUDED.price_cents,
                currency = EXCLUDED.currency,
                stock = EXCLUDED.stock,
                active = EXCLUDED.active
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.seller.as_uuid())
        .bind(&product.title)
        .bind(product.price.cents())
        .bind(product.currency.as_str())
        .bind(i64::from(product.stock))
        .bind(product.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<Product> {
        // Check and write in one statement so concurrent orders cannot oversell.
        let row = sqlx::query(&format!(
            "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_product(row),
            None => match self.current_stock(id).await? {
                Some(available) => Err(StoreError::InsufficientStock {
                    product: id,
                    requested: quantity,
                    available,
                }),
                None => Err(StoreError::ProductNotFound(id)),
            },
        }
    }

    async fn increment_stock(&self, id: ProductId, quantity: u32) -> Result<Product> {
        let row = sqlx::query(&format!(
            "UPDATE products SET stock = stock + $2 WHERE id = $1 AND stock + $2 <= $3 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(i64::from(quantity))
        .bind(i64::from(u32::MAX))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_product(row),
            None => match self.current_stock(id).await? {
                Some(_) => Err(StoreError::StockOverflow(id)),
                None => Err(StoreError::ProductNotFound(id)),
            },
        }
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn insert_user(&self, user: User) -> Result<()> {
        let roles: Vec<&str> = user.roles.iter().map(UserRole::as_str).collect();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, roles)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                roles = EXCLUDED.roles
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&roles)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, email, roles FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, mut order: Order) -> Result<Order> {
        order.set_version(Version::first());

        sqlx::query(
            r#"
            INSERT INTO orders (id, version, buyer_id, seller_id, currency, status, items,
                                status_history, delivery_address, created_at, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.version().as_i64())
        .bind(order.buyer().as_uuid())
        .bind(order.seller().as_uuid())
        .bind(order.currency().as_str())
        .bind(order.status().as_str())
        .bind(serde_json::to_value(order.items())?)
        .bind(serde_json::to_value(order.status_history())?)
        .bind(serde_json::to_value(order.delivery_address())?)
        .bind(order.created_at())
        .bind(order.idempotency_key())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_idempotency_key")
            {
                return StoreError::DuplicateIdempotencyKey(
                    order.idempotency_key().unwrap_or_default().to_string(),
                );
            }
            StoreError::Database(e)
        })?;

        Ok(order)
    }

    async fn update_order(&self, mut order: Order) -> Result<Order> {
        let expected = order.version();

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE orders
            SET status = $2, status_history = $3, version = version + 1
            WHERE id = $1 AND version = $4
            RETURNING version
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.status().as_str())
        .bind(serde_json::to_value(order.status_history())?)
        .bind(expected.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(version) = updated {
            order.set_version(Version::new(version));
            return Ok(order);
        }

        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
            .bind(order.id().as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match actual {
            Some(actual) => {
                tracing::debug!(
                    order_id = %order.id(),
                    expected = expected.as_i64(),
                    actual,
                    "stale order version"
                );
                Err(StoreError::ConcurrencyConflict {
                    order_id: order.id(),
                    expected,
                    actual: Version::new(actual),
                })
            }
            None => Err(StoreError::OrderNotFound(order.id())),
        }
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_order_by_idempotency_key(&self, key: &str) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE idempotency_key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders_for_user(&self, user: UserId, role: UserRole) -> Result<Vec<Order>> {
        let column = match role {
            UserRole::Buyer => "buyer_id",
            UserRole::Seller => "seller_id",
        };

        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {column} = $1 ORDER BY created_at DESC"
        ))
        .bind(user.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn insert_notification(&self, notification: Notification) -> Result<Notification> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient_id, kind, message, order_id, order_number,
                                       category, product_title, order_status, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.recipient.as_uuid())
        .bind(notification.kind.as_str())
        .bind(&notification.message)
        .bind(notification.order.map(|o| o.as_uuid()))
        .bind(&notification.order_number)
        .bind(notification.category.map(|c| c.as_str()))
        .bind(&notification.product_title)
        .bind(notification.order_status.map(|s| s.as_str()))
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn list_notifications(&self, user: UserId) -> Result<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE recipient_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn list_notifications_by_read(
        &self,
        user: UserId,
        read: bool,
    ) -> Result<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE recipient_id = $1 AND read = $2 ORDER BY created_at DESC"
        ))
        .bind(user.as_uuid())
        .bind(read)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            "UPDATE notifications SET read = TRUE WHERE id = $1 RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_notification).transpose()
    }
}
