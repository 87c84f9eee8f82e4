//! Error taxonomy shared by the core components.

use thiserror::Error;

use crate::domains::DomainError;

/// Errors surfaced by the controller, domain set and bridge.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The platform rejected the proxy configuration.
    #[error("failed to apply proxy configuration: {0}")]
    ConfigurationApply(String),

    /// Persisted settings could not be read or written (after one retry).
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The cached subscription is not active.
    #[error("subscription is not active")]
    SubscriptionInactive,

    /// The backend could not be reached.
    #[error("backend unavailable: {0}")]
    NetworkUnavailable(String),

    /// The backend answered but rejected the request.
    #[error("backend rejected request: {0}")]
    Backend(String),

    /// No signed-in user to act for.
    #[error("not signed in")]
    NotSignedIn,

    /// Domain validation or membership error.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl CoreError {
    /// Short machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigurationApply(_) => "configuration_apply",
            Self::Persistence(_) => "persistence",
            Self::SubscriptionInactive => "subscription_inactive",
            Self::NetworkUnavailable(_) => "network_unavailable",
            Self::Backend(_) => "backend_rejected",
            Self::NotSignedIn => "not_signed_in",
            Self::Domain(e) => e.code(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
