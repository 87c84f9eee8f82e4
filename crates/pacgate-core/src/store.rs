//! Persisted settings seam.
//!
//! The controller never talks to a database directly. It goes through
//! [`SettingsStore`], which `pacgate-storage` implements on SQLite and
//! [`MemoryStore`] implements for tests and ephemeral runs.

use std::sync::Mutex;

use tracing::{error, warn};

use crate::error::{CoreError, Result};
use crate::subscription::UserRecord;

/// Key holding the boolean connection flag.
pub const KEY_IS_CONNECTED: &str = "isConnected";

/// Key holding the ordered custom domain list.
pub const KEY_CUSTOM_DOMAINS: &str = "customDomains";

/// Key holding the signed-in user record.
pub const KEY_CURRENT_USER: &str = "currentUser";

/// Key/value persistence used by the core.
///
/// `load_*` returns `Ok(None)` when the key was never written, which is how
/// first-run initialization is detected.
pub trait SettingsStore: Send + Sync + 'static {
    fn load_connected(&self) -> Result<Option<bool>>;
    fn save_connected(&self, connected: bool) -> Result<()>;

    fn load_custom_domains(&self) -> Result<Option<Vec<String>>>;
    fn save_custom_domains(&self, domains: &[String]) -> Result<()>;

    fn load_user(&self) -> Result<Option<UserRecord>>;
    fn save_user(&self, user: Option<&UserRecord>) -> Result<()>;
}

/// Runs a write, retrying it once before surfacing the failure.
pub fn persist_with_retry<F>(what: &str, mut op: F) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    match op() {
        Ok(()) => Ok(()),
        Err(first) => {
            warn!(error = %first, "Persisting {} failed, retrying once", what);
            op().map_err(|e| {
                error!(error = %e, "Persisting {} failed twice", what);
                match e {
                    CoreError::Persistence(_) => e,
                    other => CoreError::Persistence(other.to_string()),
                }
            })
        }
    }
}

#[derive(Debug, Default, Clone)]
struct MemoryData {
    connected: Option<bool>,
    custom_domains: Option<Vec<String>>,
    user: Option<UserRecord>,
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

impl MemoryStore {
    /// Creates an empty store (first-run state).
    pub fn new() -> Self {
        Self::default()
    }

    fn with_data<T>(&self, f: impl FnOnce(&mut MemoryData) -> T) -> Result<T> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| CoreError::Persistence("memory store poisoned".to_string()))?;
        Ok(f(&mut data))
    }
}

impl SettingsStore for MemoryStore {
    fn load_connected(&self) -> Result<Option<bool>> {
        self.with_data(|d| d.connected)
    }

    fn save_connected(&self, connected: bool) -> Result<()> {
        self.with_data(|d| d.connected = Some(connected))
    }

    fn load_custom_domains(&self) -> Result<Option<Vec<String>>> {
        self.with_data(|d| d.custom_domains.clone())
    }

    fn save_custom_domains(&self, domains: &[String]) -> Result<()> {
        self.with_data(|d| d.custom_domains = Some(domains.to_vec()))
    }

    fn load_user(&self) -> Result<Option<UserRecord>> {
        self.with_data(|d| d.user.clone())
    }

    fn save_user(&self, user: Option<&UserRecord>) -> Result<()> {
        self.with_data(|d| d.user = user.cloned())
    }
}
