//! Workflow error types.

use common::{OrderId, ProductId, UserId};
use domain::{Currency, OrderError, OrderStatus};
use store::StoreError;
use thiserror::Error;

/// Errors returned by the order workflow.
///
/// Display strings are the messages shown to API clients.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A requested product does not exist.
    #[error("El producto no fue encontrado.")]
    ProductNotFound(ProductId),

    /// A requested product is not listed.
    #[error("El producto {title} no está disponible.")]
    ProductUnavailable { product: ProductId, title: String },

    /// A requested product does not have enough units.
    #[error("El producto {title} no tiene stock suficiente.")]
    InsufficientStock {
        product: ProductId,
        title: String,
        requested: u32,
        available: u32,
    },

    /// A product is priced in a different currency than the order.
    #[error("El producto {title} no se vende en {expected}.")]
    CurrencyMismatch {
        product: ProductId,
        title: String,
        expected: Currency,
        actual: Currency,
    },

    /// The cart contains products from more than one seller.
    #[error("Todos los productos del pedido deben pertenecer al mismo vendedor.")]
    MultipleSellers { sellers: Vec<UserId> },

    /// The declared seller does not own the requested products.
    #[error("El vendedor indicado no coincide con el vendedor de los productos.")]
    SellerMismatch { declared: UserId, actual: UserId },

    /// The order does not exist.
    #[error("Pedido no encontrado.")]
    OrderNotFound(OrderId),

    /// The order was already shipped, delivered or cancelled.
    #[error(
        "El pedido no se puede cancelar. Los pedidos no se pueden cancelar si ya están en estado 'Enviado' o 'Entregado' o 'Cancelado'."
    )]
    OrderNotCancelable { order_id: OrderId, status: OrderStatus },

    /// The order is not pending.
    #[error("El pedido no se puede marcar como enviado desde el estado {status}.")]
    OrderNotShippable { order_id: OrderId, status: OrderStatus },

    /// The acting user does not exist.
    #[error("Usuario no encontrado.")]
    UserNotFound(UserId),

    /// The acting user does not sell any product of the order.
    #[error("El usuario no es vendedor de este pedido.")]
    NotOrderSeller { order_id: OrderId, user: UserId },

    /// The order changed between load and save.
    #[error("El pedido fue modificado por otra operación. Intente nuevamente.")]
    ConcurrencyConflict(OrderId),

    /// The order aggregate rejected its input.
    #[error("{0}")]
    InvalidOrder(OrderError),

    /// Store failure.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProductNotFound(id) => WorkflowError::ProductNotFound(id),
            StoreError::OrderNotFound(id) => WorkflowError::OrderNotFound(id),
            StoreError::ConcurrencyConflict { order_id, .. } => {
                WorkflowError::ConcurrencyConflict(order_id)
            }
            other => WorkflowError::Store(other),
        }
    }
}

impl From<OrderError> for WorkflowError {
    fn from(err: OrderError) -> Self {
        WorkflowError::InvalidOrder(err)
    }
}

/// Convenience type alias for workflow results.
pub type Result<T> = std::result::Result<T, WorkflowError>;
