//! PacGate Storage - SQLite persistence layer.
//!
//! Settings live in a single `app_state` table of JSON values keyed by
//! name (`isConnected`, `customDomains`, `currentUser`). [`Database`]
//! implements [`pacgate_core::SettingsStore`] on top of it.
//!
//! # Example
//!
//! ```no_run
//! use pacgate_core::SettingsStore;
//! use pacgate_storage::Database;
//!
//! let db = Database::in_memory().unwrap();
//! db.save_connected(false).unwrap();
//! assert_eq!(db.load_connected().unwrap(), Some(false));
//! ```

mod database;
pub mod error;
mod pool;
pub mod repository;
mod schema;

pub use database::Database;
pub use error::{Result, StorageError};
pub use pool::ConnectionPool;
pub use repository::StateRepo;
