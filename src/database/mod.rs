//! # Database Operations
//!
//! Storage seams and their two implementations.
//!
//! ## Key Components
//!
//! - [`store`] - `TariffStore`, `QuoteStore` and `ShipmentStore` traits
//! - [`memory`] - in-process store used by tests and embedders
//! - [`postgres`] - PostgreSQL store, one transaction per atomic unit
//! - [`connection`] - pool construction from configuration
//! - [`migrations`] - schema migrations with advisory-lock concurrency control
//! - [`retry`] - bounded retry on unique-constraint violations
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use courier_core::config::DatabaseConfig;
//! use courier_core::database::{DatabaseConnection, DatabaseMigrations, PgStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::new(&DatabaseConfig::default()).await?;
//! DatabaseMigrations::run_all(db.pool()).await?;
//! let store = PgStore::new(db.pool().clone());
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod memory;
pub mod migrations;
pub mod postgres;
pub mod retry;
pub mod store;

pub use connection::DatabaseConnection;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use migrations::{DatabaseMigrations, Migration};
pub use postgres::PgStore;
pub use retry::with_unique_retry;
pub use store::{QuoteStore, ShipmentStore, StatusChange, TariffStore};
