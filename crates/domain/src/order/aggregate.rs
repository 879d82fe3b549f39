//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId, Version};

use super::{Currency, DeliveryAddress, LineItem, Money, OrderError, OrderStatus, StatusChange};

/// Order aggregate root.
///
/// An order belongs to exactly one buyer and one seller. The total is never
/// stored: it is derived from the line items on every read. The status history
/// is append-only and its last entry always carries the current status.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    version: Version,
    buyer: UserId,
    seller: UserId,
    items: Vec<LineItem>,
    currency: Currency,
    status: OrderStatus,
    status_history: Vec<StatusChange>,
    delivery_address: DeliveryAddress,
    created_at: DateTime<Utc>,
    idempotency_key: Option<String>,
}

/// Raw order fields as persisted by a store.
///
/// Turned back into an [`Order`] with [`Order::restore`], which re-checks the
/// aggregate invariants.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub version: Version,
    pub buyer: UserId,
    pub seller: UserId,
    pub items: Vec<LineItem>,
    pub currency: Currency,
    pub status: OrderStatus,
    pub status_history: Vec<StatusChange>,
    pub delivery_address: DeliveryAddress,
    pub created_at: DateTime<Utc>,
    pub idempotency_key: Option<String>,
}

pub(crate) const CREATION_REASON: &str = "Creación del pedido";
pub(crate) const CANCELLATION_REASON: &str = "Pedido cancelado por el usuario";
pub(crate) const SHIPMENT_REASON: &str = "Pedido marcado como enviado por el vendedor";

// Construction
impl Order {
    /// Places a new order in `Pending` status.
    ///
    /// The initial history entry records the buyer as the actor.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        id: OrderId,
        buyer: UserId,
        seller: UserId,
        currency: Currency,
        delivery_address: DeliveryAddress,
        items: Vec<LineItem>,
        at: DateTime<Utc>,
        idempotency_key: Option<String>,
    ) -> Result<Self, OrderError> {
        validate_items(&items)?;

        Ok(Self {
            id,
            version: Version::initial(),
            buyer,
            seller,
            items,
            currency,
            status: OrderStatus::Pending,
            status_history: vec![StatusChange::new(
                at,
                OrderStatus::Pending,
                buyer,
                CREATION_REASON,
            )],
            delivery_address,
            created_at: at,
            idempotency_key,
        })
    }

    /// Rebuilds an order from stored fields.
    pub fn restore(parts: OrderParts) -> Result<Self, OrderError> {
        validate_items(&parts.items)?;

        match parts.status_history.last() {
            Some(last) if last.status == parts.status => {}
            _ => {
                return Err(OrderError::InconsistentHistory {
                    status: parts.status,
                });
            }
        }

        Ok(Self {
            id: parts.id,
            version: parts.version,
            buyer: parts.buyer,
            seller: parts.seller,
            items: parts.items,
            currency: parts.currency,
            status: parts.status,
            status_history: parts.status_history,
            delivery_address: parts.delivery_address,
            created_at: parts.created_at,
            idempotency_key: parts.idempotency_key,
        })
    }
}

fn validate_items(items: &[LineItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }

    let mut total = Money::zero();
    for item in items {
        if item.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                product: item.product,
            });
        }
        if item.unit_price.is_negative() {
            return Err(OrderError::InvalidPrice {
                product: item.product,
                price: item.unit_price.cents(),
            });
        }
        total = item
            .unit_price
            .checked_mul(item.quantity)
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or(OrderError::TotalOverflow {
                product: item.product,
            })?;
    }

    Ok(())
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the stored version, `Version::initial()` before the first insert.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Sets the stored version. Called by stores after a successful write.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn buyer(&self) -> UserId {
        self.buyer
    }

    pub fn seller(&self) -> UserId {
        self.seller
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn status_history(&self) -> &[StatusChange] {
        &self.status_history
    }

    pub fn delivery_address(&self) -> &DeliveryAddress {
        &self.delivery_address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }

    /// Sum of quantity * unit price over all line items.
    pub fn total(&self) -> Money {
        self.items.iter().map(LineItem::subtotal).sum()
    }

    /// Number shown to users, e.g. `#3f2a...`.
    pub fn display_number(&self) -> String {
        format!("#{}", self.id)
    }

    /// Title of the first line item, used as the representative product.
    pub fn first_product_title(&self) -> Option<&str> {
        self.items.first().map(|item| item.title.as_str())
    }

    /// Short summary such as `"Widget x2, Gadget x1"`.
    pub fn items_description(&self) -> String {
        self.items
            .iter()
            .map(|item| format!("{} x{}", item.title, item.quantity))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn history_blocks_cancellation(&self) -> bool {
        self.status_history
            .iter()
            .any(|change| change.status.blocks_cancellation())
    }
}

// Transitions
impl Order {
    /// Fails unless the order is `Pending` and has never been shipped,
    /// delivered or cancelled.
    pub fn ensure_cancelable(&self) -> Result<(), OrderError> {
        if !self.status.can_cancel() || self.history_blocks_cancellation() {
            return Err(OrderError::NotCancelable {
                status: self.status,
            });
        }
        Ok(())
    }

    /// Fails unless the order is `Pending` and has never left that status.
    pub fn ensure_shippable(&self) -> Result<(), OrderError> {
        if !self.status.can_ship() || self.history_blocks_cancellation() {
            return Err(OrderError::NotShippable {
                status: self.status,
            });
        }
        Ok(())
    }

    /// Cancels the order on behalf of the buyer.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), OrderError> {
        self.ensure_cancelable()?;
        let buyer = self.buyer;
        self.record_transition(OrderStatus::Cancelled, buyer, CANCELLATION_REASON, at);
        Ok(())
    }

    /// Marks the order as shipped by `actor`.
    ///
    /// Authorization (is `actor` the seller?) is checked by the caller, which
    /// has access to the product catalog.
    pub fn ship(&mut self, actor: UserId, at: DateTime<Utc>) -> Result<(), OrderError> {
        self.ensure_shippable()?;
        self.record_transition(OrderStatus::Shipped, actor, SHIPMENT_REASON, at);
        Ok(())
    }

    fn record_transition(
        &mut self,
        status: OrderStatus,
        actor: UserId,
        reason: &str,
        at: DateTime<Utc>,
    ) {
        self.status = status;
        self.status_history
            .push(StatusChange::new(at, status, actor, reason));
    }
}
