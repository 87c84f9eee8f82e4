//! High-level database interface.

use std::path::PathBuf;

use directories::ProjectDirs;
use pacgate_core::store::{KEY_CURRENT_USER, KEY_CUSTOM_DOMAINS, KEY_IS_CONNECTED};
use pacgate_core::{SettingsStore, UserRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::pool::ConnectionPool;
use crate::repository::StateRepo;

/// High-level database interface for PacGate.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing and dry runs).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "pacgate", "pacgate")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("pacgate.db"))
    }

    // === Generic app state ===

    /// Get a JSON-encoded value by key.
    pub fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let conn = self.pool.get()?;
        StateRepo::get(&conn, key)
    }

    /// Set a JSON-encoded value.
    pub fn set_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let conn = self.pool.get()?;
        StateRepo::set(&conn, key, value)?;
        debug!(key, "Stored app state");
        Ok(())
    }

    /// Delete a value. Returns whether it existed.
    pub fn delete_value(&self, key: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        StateRepo::delete(&conn, key)
    }
}

impl SettingsStore for Database {
    fn load_connected(&self) -> pacgate_core::Result<Option<bool>> {
        Ok(self.get_value(KEY_IS_CONNECTED)?)
    }

    fn save_connected(&self, connected: bool) -> pacgate_core::Result<()> {
        Ok(self.set_value(KEY_IS_CONNECTED, &connected)?)
    }

    fn load_custom_domains(&self) -> pacgate_core::Result<Option<Vec<String>>> {
        Ok(self.get_value(KEY_CUSTOM_DOMAINS)?)
    }

    fn save_custom_domains(&self, domains: &[String]) -> pacgate_core::Result<()> {
        Ok(self.set_value(KEY_CUSTOM_DOMAINS, domains)?)
    }

    fn load_user(&self) -> pacgate_core::Result<Option<UserRecord>> {
        Ok(self.get_value(KEY_CURRENT_USER)?)
    }

    fn save_user(&self, user: Option<&UserRecord>) -> pacgate_core::Result<()> {
        match user {
            Some(user) => self.set_value(KEY_CURRENT_USER, user)?,
            None => {
                self.delete_value(KEY_CURRENT_USER)?;
            }
        }
        Ok(())
    }
}
