//! Subscription backend client.
//!
//! The backend answers two calls: `POST /api/login` with credentials and
//! `POST /api/status` with an API key. Both return the user record; errors
//! come back as `{"error": "..."}` with a non-2xx status.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::subscription::UserRecord;

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://ex.mtproxier.com:3000";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Full URL for `path` (which starts with `/`).
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Source of truth for user records and subscriptions.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Exchanges credentials for a user record.
    async fn login(&self, email: &str, password: &str) -> Result<UserRecord>;

    /// Fetches the current record for an API key.
    async fn status(&self, api_key: &str) -> Result<UserRecord>;
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody<'a> {
    api_key: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// HTTP client for the subscription backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    config: BackendConfig,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("PacGate/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::Backend(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<UserRecord> {
        let url = self.config.endpoint(path);
        debug!(url = %url, "Backend request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Backend unreachable");
                CoreError::NetworkUnavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(CoreError::Backend(message));
        }

        response
            .json::<UserRecord>()
            .await
            .map_err(|e| CoreError::Backend(format!("malformed response: {}", e)))
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn login(&self, email: &str, password: &str) -> Result<UserRecord> {
        self.post("/api/login", &LoginBody { email, password }).await
    }

    async fn status(&self, api_key: &str) -> Result<UserRecord> {
        self.post("/api/status", &StatusBody { api_key }).await
    }
}
