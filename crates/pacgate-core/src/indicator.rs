//! Visible connection indicator (the ON/OFF badge).

use serde::Serialize;
use tracing::info;

/// Badge text and background color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub text: &'static str,
    pub color: &'static str,
}

impl Badge {
    /// Shown while the proxy is applied.
    pub const ON: Badge = Badge {
        text: "ON",
        color: "#27ae60",
    };

    /// Shown otherwise.
    pub const OFF: Badge = Badge {
        text: "OFF",
        color: "#c0392b",
    };

    pub fn for_connected(connected: bool) -> Self {
        if connected {
            Self::ON
        } else {
            Self::OFF
        }
    }

    pub fn is_on(&self) -> bool {
        *self == Self::ON
    }
}

impl Default for Badge {
    fn default() -> Self {
        Self::OFF
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Something that can display the badge (tray icon, toolbar, log line).
pub trait StatusIndicator: Send + 'static {
    fn show(&mut self, badge: Badge);
}

/// Indicator that reports badge changes to the log.
#[derive(Debug, Default)]
pub struct LogIndicator {
    current: Option<Badge>,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last badge shown, if any.
    pub fn current(&self) -> Option<Badge> {
        self.current
    }
}

impl StatusIndicator for LogIndicator {
    fn show(&mut self, badge: Badge) {
        if self.current != Some(badge) {
            info!(badge = badge.text, color = badge.color, "Status indicator updated");
        }
        self.current = Some(badge);
    }
}
