//! Persistence for the marketplace order workflow.
//!
//! One backend type implements every store trait:
//! - [`InMemoryStore`] for tests and local development
//! - [`PostgresStore`] for production

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{MarketplaceStore, NotificationStore, OrderStore, ProductStore, UserStore};
