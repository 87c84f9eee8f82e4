//! API request and response models.

use serde::{Deserialize, Serialize};

/// Request body for POST /api/domains.
#[derive(Debug, Deserialize)]
pub struct AddDomainRequest {
    /// Domain or URL as typed by the user.
    pub domain: String,
}

/// Response body for POST /api/domains.
#[derive(Debug, Serialize)]
pub struct AddDomainResponse {
    /// The normalized domain that was stored.
    pub domain: String,
}

/// Response body for DELETE /api/domains/{domain}.
#[derive(Debug, Serialize)]
pub struct RemoveDomainResponse {
    /// Whether the domain was in the custom list.
    pub removed: bool,
}

/// Response body for GET /api/defaults.
#[derive(Debug, Serialize)]
pub struct DefaultsResponse {
    pub domains: Vec<String>,
}

/// Response body for POST /api/rules/update.
#[derive(Debug, Serialize)]
pub struct RulesUpdateResponse {
    /// False when nothing was applied because the proxy is off.
    pub refreshed: bool,
}

/// Request body for POST /api/session.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}
