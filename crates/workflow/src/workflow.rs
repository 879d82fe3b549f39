//! Order lifecycle orchestration.

use std::time::Instant;

use chrono::Utc;
use common::{OrderId, UserId};
use domain::{
    CancelOrder, LineItem, MarkShipped, Order, OrderError, OrderStatus, PlaceOrder, Product,
    UserRole,
};
use store::{MarketplaceStore, StoreError};

use crate::compensation::{CompensationLog, CompensationStep};
use crate::dispatcher::NotificationDispatcher;
use crate::error::{Result, WorkflowError};

/// Drives orders through their lifecycle.
///
/// Each operation validates against the catalog, persists the order with an
/// optimistic version check, adjusts stock and then notifies the parties.
/// Order creation records every side effect in a [`CompensationLog`] and
/// undoes them if a later step fails.
pub struct OrderWorkflow<S: MarketplaceStore> {
    store: S,
    dispatcher: NotificationDispatcher<S>,
}

impl<S: MarketplaceStore> OrderWorkflow<S> {
    pub fn new(store: S, dispatcher: NotificationDispatcher<S>) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher<S> {
        &self.dispatcher
    }

    /// Validates the cart, stores a `Pending` order, reserves stock and
    /// notifies buyer and seller.
    ///
    /// Retrying with the same idempotency key returns the order created by
    /// the first attempt without touching stock again.
    #[tracing::instrument(skip(self, cmd), fields(buyer = %cmd.buyer, seller = %cmd.seller))]
    pub async fn create_order(&self, cmd: PlaceOrder) -> Result<Order> {
        let started = Instant::now();
        let result = self.place(cmd).await;
        observe("create_order", started, &result);
        result
    }

    /// Cancels a pending order, returns its stock and notifies the seller.
    #[tracing::instrument(skip(self), fields(order_id = %cmd.order_id))]
    pub async fn cancel_order(&self, cmd: CancelOrder) -> Result<Order> {
        let started = Instant::now();
        let result = self.cancel(cmd).await;
        observe("cancel_order", started, &result);
        result
    }

    /// Marks a pending order as shipped on behalf of its seller and notifies
    /// the buyer.
    #[tracing::instrument(skip(self), fields(order_id = %cmd.order_id, user = %cmd.acting_user))]
    pub async fn mark_as_shipped(&self, cmd: MarkShipped) -> Result<Order> {
        let started = Instant::now();
        let result = self.ship(cmd).await;
        observe("mark_as_shipped", started, &result);
        result
    }

    /// Loads an order.
    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.store
            .find_order(id)
            .await?
            .ok_or(WorkflowError::OrderNotFound(id))
    }

    /// Orders a user bought (`Buyer`) or sold (`Seller`), newest first.
    pub async fn list_orders_for_user(&self, user: UserId, role: UserRole) -> Result<Vec<Order>> {
        Ok(self.store.list_orders_for_user(user, role).await?)
    }

    async fn place(&self, cmd: PlaceOrder) -> Result<Order> {
        if let Some(key) = cmd.idempotency_key.as_deref()
            && let Some(existing) = self.store.find_order_by_idempotency_key(key).await?
        {
            tracing::info!(order_id = %existing.id(), "order already created for idempotency key");
            return Ok(existing);
        }

        let mut items = Vec::with_capacity(cmd.items.len());
        let mut sellers: Vec<UserId> = Vec::new();

        for requested in &cmd.items {
            let product = self
                .store
                .find_product(requested.product)
                .await?
                .ok_or(WorkflowError::ProductNotFound(requested.product))?;

            ensure_available(&product, requested.quantity)?;

            if product.currency != cmd.currency {
                return Err(WorkflowError::CurrencyMismatch {
                    product: product.id,
                    title: product.title,
                    expected: cmd.currency,
                    actual: product.currency,
                });
            }

            if !sellers.contains(&product.seller) {
                sellers.push(product.seller);
            }

            let unit_price = requested.unit_price.unwrap_or(product.price);
            items.push(LineItem::new(
                product.id,
                product.title,
                requested.quantity,
                unit_price,
            ));
        }

        if sellers.len() > 1 {
            return Err(WorkflowError::MultipleSellers { sellers });
        }
        if let Some(&actual) = sellers.first()
            && actual != cmd.seller
        {
            return Err(WorkflowError::SellerMismatch {
                declared: cmd.seller,
                actual,
            });
        }

        let order = Order::place(
            OrderId::new(),
            cmd.buyer,
            cmd.seller,
            cmd.currency,
            cmd.delivery_address,
            items,
            Utc::now(),
            cmd.idempotency_key,
        )?;

        let order = match self.store.insert_order(order).await {
            Ok(order) => order,
            Err(StoreError::DuplicateIdempotencyKey(key)) => {
                // A concurrent retry won the insert; nothing was reserved yet.
                return self
                    .store
                    .find_order_by_idempotency_key(&key)
                    .await?
                    .ok_or(WorkflowError::Store(StoreError::DuplicateIdempotencyKey(key)));
            }
            Err(e) => return Err(e.into()),
        };

        let mut log = CompensationLog::new();
        log.record(CompensationStep::OrderInserted(order.id()));

        for item in order.items() {
            if let Err(e) = self.store.decrement_stock(item.product, item.quantity).await {
                tracing::warn!(
                    order_id = %order.id(),
                    product_id = %item.product,
                    error = %e,
                    "stock reservation failed, undoing order"
                );
                log.unwind(&self.store).await;
                return Err(match e {
                    StoreError::InsufficientStock {
                        product,
                        requested,
                        available,
                    } => WorkflowError::InsufficientStock {
                        product,
                        title: item.title.clone(),
                        requested,
                        available,
                    },
                    other => other.into(),
                });
            }
            log.record(CompensationStep::StockDecremented {
                product: item.product,
                quantity: item.quantity,
            });
        }

        self.dispatcher.dispatch(&order, OrderStatus::Pending).await;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            items = %order.items_description(),
            total = %order.total(),
            currency = %order.currency(),
            "order created"
        );

        Ok(order)
    }

    async fn cancel(&self, cmd: CancelOrder) -> Result<Order> {
        let mut order = self.get_order(cmd.order_id).await?;

        order
            .cancel(Utc::now())
            .map_err(|e| transition_error(cmd.order_id, e))?;
        let order = self.store.update_order(order).await?;

        for item in order.items() {
            if let Err(e) = self.store.increment_stock(item.product, item.quantity).await {
                metrics::counter!("stock_restore_failures_total").increment(1);
                tracing::warn!(
                    order_id = %order.id(),
                    product_id = %item.product,
                    quantity = item.quantity,
                    error = %e,
                    "failed to restore stock for cancelled order"
                );
            }
        }

        self.dispatcher.dispatch(&order, OrderStatus::Cancelled).await;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(order_id = %order.id(), "order cancelled");

        Ok(order)
    }

    async fn ship(&self, cmd: MarkShipped) -> Result<Order> {
        let mut order = self.get_order(cmd.order_id).await?;

        let user = self
            .store
            .find_user(cmd.acting_user)
            .await?
            .ok_or(WorkflowError::UserNotFound(cmd.acting_user))?;

        let mut sells_item = false;
        for item in order.items() {
            // Products removed from the catalog fall back to the order's seller.
            let seller = match self.store.find_product(item.product).await? {
                Some(product) => product.seller,
                None => order.seller(),
            };
            if seller == user.id {
                sells_item = true;
                break;
            }
        }
        if !sells_item {
            return Err(WorkflowError::NotOrderSeller {
                order_id: order.id(),
                user: user.id,
            });
        }

        order
            .ship(user.id, Utc::now())
            .map_err(|e| transition_error(cmd.order_id, e))?;
        let order = self.store.update_order(order).await?;

        self.dispatcher.dispatch(&order, OrderStatus::Shipped).await;

        metrics::counter!("orders_shipped_total").increment(1);
        tracing::info!(order_id = %order.id(), "order shipped");

        Ok(order)
    }
}

fn ensure_available(product: &Product, quantity: u32) -> Result<()> {
    if !product.active {
        return Err(WorkflowError::ProductUnavailable {
            product: product.id,
            title: product.title.clone(),
        });
    }
    if product.stock < quantity {
        return Err(WorkflowError::InsufficientStock {
            product: product.id,
            title: product.title.clone(),
            requested: quantity,
            available: product.stock,
        });
    }
    Ok(())
}

fn transition_error(order_id: OrderId, err: OrderError) -> WorkflowError {
    match err {
        OrderError::NotCancelable { status } => WorkflowError::OrderNotCancelable { order_id, status },
        OrderError::NotShippable { status } => WorkflowError::OrderNotShippable { order_id, status },
        other => WorkflowError::InvalidOrder(other),
    }
}

fn observe<T>(operation: &'static str, started: Instant, result: &Result<T>) {
    metrics::histogram!("order_workflow_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());

    if let Err(e) = result {
        metrics::counter!("order_workflow_failures_total", "operation" => operation).increment(1);
        match e {
            WorkflowError::Store(_) => tracing::error!(operation, error = %e, "order workflow failed"),
            _ => tracing::info!(operation, error = %e, "order workflow rejected request"),
        }
    }
}
