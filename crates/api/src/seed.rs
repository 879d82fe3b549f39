//! Start-up data for users and products.
//!
//! The service exposes no catalog or registration endpoints, so a fresh
//! deployment is populated from a JSON document:
//!
//! ```json
//! { "users": [ ... ], "products": [ ... ] }
//! ```

use std::path::{Path, PathBuf};

use domain::{Product, User};
use serde::Deserialize;
use store::{MarketplaceStore, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid seed file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to store seed data: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub users: Vec<User>,
    pub products: Vec<Product>,
}

impl Seed {
    /// Reads and parses a seed document.
    pub async fn load(path: &Path) -> Result<Self, SeedError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SeedError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Inserts (or replaces) every record.
    pub async fn apply<S: MarketplaceStore>(self, store: &S) -> Result<(), SeedError> {
        let (users, products) = (self.users.len(), self.products.len());

        for user in self.users {
            store.insert_user(user).await?;
        }
        for product in self.products {
            store.insert_product(product).await?;
        }

        tracing::info!(users, products, "seed data loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ProductId, UserId};
    use store::{InMemoryStore, UserStore};

    #[tokio::test]
    async fn test_apply_inserts_users_and_products() {
        let seller = UserId::new();
        let product = ProductId::new();
        let raw = serde_json::json!({
            "users": [{
                "id": seller,
                "name": "Tienda Norte",
                "email": "ventas@norte.example",
                "roles": ["VENDEDOR"]
            }],
            "products": [{
                "id": product,
                "seller": seller,
                "title": "Termo 1L",
                "price": 4500000,
                "currency": "PESO_ARG",
                "stock": 12,
                "active": true
            }]
        });

        let seed: Seed = serde_json::from_value(raw).unwrap();
        let store = InMemoryStore::new();
        seed.apply(&store).await.unwrap();

        assert!(store.find_user(seller).await.unwrap().is_some());
        assert_eq!(store.stock_of(product).await, Some(12));
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let err = Seed::load(Path::new("/nonexistent/seed.json")).await.unwrap_err();
        assert!(matches!(err, SeedError::Io { .. }));
    }
}
