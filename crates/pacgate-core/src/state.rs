//! Proxy connection states.

use serde::{Deserialize, Serialize};

/// Connection state shown to the user.
///
/// Only the connected/disconnected distinction is persisted. `Connecting`
/// exists while an apply is in flight and `Disabled` is derived from an
/// inactive subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disabled,
}

impl ProxyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disabled => "disabled",
        }
    }

    /// Power button label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::Disabled => "Buy Subscription",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ProxyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
