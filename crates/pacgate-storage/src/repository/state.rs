//! Key/value settings repository.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Repository for the `app_state` table.
pub struct StateRepo;

impl StateRepo {
    /// Get a raw JSON value by key.
    pub fn get_raw(conn: &Connection, key: &str) -> Result<Option<String>> {
        let value = conn
            .query_row(
                "SELECT value FROM app_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Get a value by key, decoded from JSON.
    pub fn get<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
        match Self::get_raw(conn, key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Set a value (insert or update), encoded as JSON.
    pub fn set<T: Serialize + ?Sized>(conn: &Connection, key: &str, value: &T) -> Result<()> {
        let value_json = serde_json::to_string(value)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO app_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value_json, now],
        )?;

        Ok(())
    }

    /// Delete a value. Returns whether a row existed.
    pub fn delete(conn: &Connection, key: &str) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM app_state WHERE key = ?1", [key])?;
        Ok(deleted > 0)
    }
}
