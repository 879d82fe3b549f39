//! Marketplace users.

use common::UserId;
use serde::{Deserialize, Serialize};

/// Role flags carried by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "COMPRADOR")]
    Buyer,
    #[serde(rename = "VENDEDOR")]
    Seller,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Buyer => "COMPRADOR",
            UserRole::Seller => "VENDEDOR",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPRADOR" => Ok(UserRole::Buyer),
            "VENDEDOR" => Ok(UserRole::Seller),
            other => Err(format!("unknown user type: {other}")),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub roles: Vec<UserRole>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, roles: Vec<UserRole>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("VENDEDOR".parse::<UserRole>().unwrap(), UserRole::Seller);
        assert!("ADMIN".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_has_role() {
        let user = User::new("Ana", "ana@example.com", vec![UserRole::Buyer]);
        assert!(user.has_role(UserRole::Buyer));
        assert!(!user.has_role(UserRole::Seller));
    }
}
