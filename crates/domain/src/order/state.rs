//! Order state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Shipped ──► Delivered
///           │
///           └──► Cancelled
/// ```
///
/// `Delivered` is declared but no workflow operation produces it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order placed, stock reserved, awaiting shipment.
    #[default]
    #[serde(rename = "PENDIENTE")]
    Pending,

    /// The seller has shipped the order.
    #[serde(rename = "ENVIADO")]
    Shipped,

    /// The order reached the buyer (terminal state).
    #[serde(rename = "ENTREGADO")]
    Delivered,

    /// The order was cancelled (terminal state).
    #[serde(rename = "CANCELADO")]
    Cancelled,
}

impl OrderStatus {
    /// Returns true if reaching this status rules out a later cancellation.
    pub fn blocks_cancellation(&self) -> bool {
        matches!(
            self,
            OrderStatus::Shipped | OrderStatus::Delivered | OrderStatus::Cancelled
        )
    }

    /// Returns true if the order can be cancelled from this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be marked as shipped from this status.
    pub fn can_ship(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDIENTE",
            OrderStatus::Shipped => "ENVIADO",
            OrderStatus::Delivered => "ENTREGADO",
            OrderStatus::Cancelled => "CANCELADO",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDIENTE" => Ok(OrderStatus::Pending),
            "ENVIADO" => Ok(OrderStatus::Shipped),
            "ENTREGADO" => Ok(OrderStatus::Delivered),
            "CANCELADO" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}
