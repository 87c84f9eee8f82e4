//! PacGate Core - PAC generation, domain sets and proxy state control.
//!
//! This crate holds everything that decides what the proxy does:
//!
//! - [`pac`]: turns a domain list into a `FindProxyForURL` script
//! - [`domains`]: the fixed default list plus the user's persisted custom list
//! - [`controller`]: the connect/disconnect state machine
//! - [`bridge`]: a single-worker queue that serializes UI intents
//!
//! Persistence, the OS proxy settings and the subscription backend sit
//! behind [`SettingsStore`], [`ProxyPlatform`] and [`Backend`].
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use pacgate_core::{
//!     LogIndicator, MemoryStore, ProxyController, ProxyState, RecordingPlatform, Subscription,
//!     Upstream,
//! };
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut controller = ProxyController::new(
//!     store,
//!     RecordingPlatform::new(),
//!     LogIndicator::new(),
//!     Upstream::default(),
//! )
//! .unwrap();
//!
//! let signed_out = Subscription::inactive();
//! assert_eq!(
//!     controller.bootstrap(&signed_out, true).unwrap(),
//!     ProxyState::Disconnected
//! );
//! ```

pub mod backend;
pub mod bridge;
pub mod controller;
pub mod domains;
pub mod error;
pub mod indicator;
pub mod pac;
pub mod platform;
pub mod state;
pub mod store;
pub mod subscription;

pub use backend::{Backend, BackendClient, BackendConfig};
pub use bridge::{Bridge, BridgeError, BridgeHandle, DomainsReport, Intent, Reply, StatusReport};
pub use controller::ProxyController;
pub use domains::{Domain, DomainError, DomainSet, Origin, DEFAULT_PROXIED_DOMAINS};
pub use error::{CoreError, Result};
pub use indicator::{Badge, LogIndicator, StatusIndicator};
pub use pac::{generate, PacScript, Route, Upstream};
pub use platform::{ProxyPlatform, RecordingPlatform};
pub use state::ProxyState;
pub use store::{MemoryStore, SettingsStore};
pub use subscription::{Session, Subscription, UserRecord};
