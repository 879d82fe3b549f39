//! Value objects for the order domain.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// Money amount represented in minor units (cents) to avoid floating point issues.
///
/// The currency lives on the order; every amount inside one order is
/// denominated in that currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-unit portion.
    pub fn units(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after units).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity.
    ///
    /// Only call on amounts already checked with [`Money::checked_mul`].
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * i64::from(quantity),
        }
    }

    /// Multiplies by a quantity, returning None on overflow.
    pub fn checked_mul(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Adds two amounts, returning None on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-{}.{:02}", self.units().abs(), self.cents_part())
        } else {
            write!(f, "{}.{:02}", self.units(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Currencies accepted by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "PESO_ARG")]
    ArgentinePeso,
    #[serde(rename = "DOLAR_USA")]
    UsDollar,
    #[serde(rename = "REAL")]
    BrazilianReal,
}

impl Currency {
    /// All accepted currencies.
    pub const ALL: [Currency; 3] = [
        Currency::ArgentinePeso,
        Currency::UsDollar,
        Currency::BrazilianReal,
    ];

    /// Returns the wire code of the currency.
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::ArgentinePeso => "PESO_ARG",
            Currency::UsDollar => "DOLAR_USA",
            Currency::BrazilianReal => "REAL",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown currency: {s}"))
    }
}

/// Structured postal address an order is delivered to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub street: String,
    pub number: u32,
    pub floor: Option<String>,
    pub unit: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub province: String,
    pub country: String,
    pub lat: f64,
    pub long: f64,
}

impl DeliveryAddress {
    /// One-line human readable form, e.g. `"Av. Siempre Viva 742, Piso 1, Depto A, Springfield, BA, AR"`.
    pub fn short_description(&self) -> String {
        let mut desc = format!("{} {}", self.street, self.number);
        if let Some(floor) = &self.floor {
            desc.push_str(&format!(", Piso {floor}"));
        }
        if let Some(unit) = &self.unit {
            desc.push_str(&format!(", Depto {unit}"));
        }
        desc.push_str(&format!(
            ", {}, {}, {}",
            self.city, self.province, self.country
        ));
        desc
    }
}

/// A product line within an order.
///
/// The unit price is captured when the order is placed and never changes
/// afterwards, even if the catalog price does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The ordered product.
    pub product: ProductId,

    /// Product title at the time of ordering.
    pub title: String,

    /// Quantity ordered.
    pub quantity: u32,

    /// Price per unit, in the order's currency.
    pub unit_price: Money,
}

impl LineItem {
    /// Creates a new line item.
    pub fn new(product: ProductId, title: impl Into<String>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product,
            title: title.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns quantity * unit_price.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// One entry of an order's status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub at: DateTime<Utc>,
    pub status: OrderStatus,
    pub actor: UserId,
    pub reason: Option<String>,
}

impl StatusChange {
    pub fn new(
        at: DateTime<Utc>,
        status: OrderStatus,
        actor: UserId,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            at,
            status,
            actor,
            reason: Some(reason.into()),
        }
    }
}
