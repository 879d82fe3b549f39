//! Localized message templates.

use super::NotificationKind;

/// Language a [`MessageSet`] is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Spanish,
    English,
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ES" => Ok(Language::Spanish),
            "EN" => Ok(Language::English),
            other => Err(format!("unsupported notification language: {other}")),
        }
    }
}

/// Message templates for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageSet {
    language: Language,
}

impl MessageSet {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Sent to the buyer when their order is created.
    pub fn order_created(&self, order_number: &str) -> String {
        match self.language {
            Language::Spanish => format!("Tu pedido {order_number} fue creado exitosamente"),
            Language::English => format!("Your order {order_number} was created successfully"),
        }
    }

    /// Sent to the seller when they receive an order.
    pub fn new_sale(&self, order_number: &str) -> String {
        match self.language {
            Language::Spanish => format!("Tienes un nuevo pedido {order_number}"),
            Language::English => format!("You have a new order {order_number}"),
        }
    }

    /// Sent to the buyer when the order ships.
    pub fn order_shipped(&self, order_number: &str) -> String {
        match self.language {
            Language::Spanish => format!("Tu pedido {order_number} fue enviado"),
            Language::English => format!("Your order {order_number} has been shipped"),
        }
    }

    /// Sent to the seller when the buyer cancels.
    pub fn order_cancelled(&self, order_number: &str) -> String {
        match self.language {
            Language::Spanish => format!("El pedido {order_number} fue cancelado"),
            Language::English => format!("Order {order_number} was cancelled"),
        }
    }

    /// Fixed text for manually created notifications.
    pub fn generic(&self, kind: NotificationKind) -> &'static str {
        match (self.language, kind) {
            (Language::Spanish, NotificationKind::OrderConfirmed) => {
                "Tu pedido ha sido confirmado."
            }
            (Language::Spanish, NotificationKind::OrderShipped) => "Tu pedido ha sido enviado.",
            (Language::Spanish, NotificationKind::OrderCancelled) => {
                "Tu pedido ha sido cancelado."
            }
            (Language::English, NotificationKind::OrderConfirmed) => {
                "Your order has been confirmed."
            }
            (Language::English, NotificationKind::OrderShipped) => "Your order has been shipped.",
            (Language::English, NotificationKind::OrderCancelled) => {
                "Your order has been cancelled."
            }
        }
    }
}
