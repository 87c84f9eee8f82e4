//! Error types for platform proxy configuration.

use pacgate_core::CoreError;
use thiserror::Error;

/// Platform configuration error.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// IO error (writing the PAC file, spawning a tool).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The operating system refused the setting.
    #[error("{0}")]
    Rejected(String),

    /// Could not determine where to keep the PAC file.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<PlatformError> for CoreError {
    fn from(e: PlatformError) -> Self {
        CoreError::ConfigurationApply(e.to_string())
    }
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
