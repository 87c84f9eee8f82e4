//! PacGate Proxy - operating system PAC configuration.
//!
//! [`SystemProxy`] implements [`pacgate_core::ProxyPlatform`]: it writes the
//! generated script to a file and sets the OS automatic proxy configuration
//! URL to it. Clearing switches automatic configuration off.
//!
//! The lower-level functions in [`setup`] report a [`SetupResult`] instead
//! of failing, matching how the individual platform tools behave.

pub mod error;
pub mod setup;
mod system;

pub use error::{PlatformError, Result};
pub use setup::{disable_system_proxy, enable_pac_url, pac_file_url, SetupResult};
pub use system::SystemProxy;
