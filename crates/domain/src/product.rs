//! Catalog products as seen by the order workflow.
//!
//! Products are owned by the catalog; the workflow only reads them and moves
//! their stock up or down.

use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::{Currency, Money};

/// Stock mutation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    /// Decrementing would take stock below zero.
    #[error("Insufficient stock: requested {requested}, available {available}")]
    Insufficient { requested: u32, available: u32 },

    /// Incrementing would overflow the stock counter.
    #[error("Stock overflow")]
    Overflow,
}

/// A product listed by a seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller: UserId,
    pub title: String,
    pub price: Money,
    pub currency: Currency,
    pub stock: u32,
    pub active: bool,
}

impl Product {
    /// Creates an active product.
    pub fn new(
        seller: UserId,
        title: impl Into<String>,
        price: Money,
        currency: Currency,
        stock: u32,
    ) -> Self {
        Self {
            id: ProductId::new(),
            seller,
            title: title.into(),
            price,
            currency,
            stock,
            active: true,
        }
    }

    /// Returns a copy with the active flag set.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// True if the product is listed and has at least `quantity` units.
    pub fn is_available(&self, quantity: u32) -> bool {
        self.active && self.stock >= quantity
    }

    /// Removes `quantity` units from stock.
    pub fn decrement_stock(&mut self, quantity: u32) -> Result<(), StockError> {
        self.stock = self
            .stock
            .checked_sub(quantity)
            .ok_or(StockError::Insufficient {
                requested: quantity,
                available: self.stock,
            })?;
        Ok(())
    }

    /// Returns `quantity` units to stock.
    pub fn increment_stock(&mut self, quantity: u32) -> Result<(), StockError> {
        self.stock = self
            .stock
            .checked_add(quantity)
            .ok_or(StockError::Overflow)?;
        Ok(())
    }
}
