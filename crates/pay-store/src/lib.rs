//! # pay-store
//!
//! PostgreSQL persistence for event-checkout-rs.
//!
//! ```rust,ignore
//! use pay_store::{PgStore, StoreConfig};
//!
//! let pool = StoreConfig::from_env()?.connect().await?;
//! let store = PgStore::new(pool);
//! store.migrate().await?;
//! ```

pub mod config;
pub mod pg;

// Re-exports
pub use config::StoreConfig;
pub use pg::PgStore;
