//! Command-line configuration.

use std::path::PathBuf;

use clap::Parser;
use pacgate_core::backend::{DEFAULT_BACKEND_URL, DEFAULT_TIMEOUT_SECS};
use pacgate_core::pac::{DEFAULT_UPSTREAM_HOST, DEFAULT_UPSTREAM_PORT};
use pacgate_core::{BackendConfig, Upstream};
use pacgate_server::{ServerConfig, DEFAULT_PORT};

/// PacGate - subscription-gated PAC proxy switch
#[derive(Parser, Debug)]
#[command(name = "pacgate", version, about)]
pub struct Args {
    /// Enable debug logging (also logs to stdout)
    #[arg(long)]
    pub debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Database file (defaults to the app data directory)
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Local API port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Upstream proxy host baked into the PAC script
    #[arg(long, default_value = DEFAULT_UPSTREAM_HOST)]
    pub upstream_host: String,

    /// Upstream proxy port
    #[arg(long, default_value_t = DEFAULT_UPSTREAM_PORT)]
    pub upstream_port: u16,

    /// Subscription backend base URL
    #[arg(long, default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// Backend request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub backend_timeout_secs: u64,

    /// Trust the OS setting on startup instead of re-applying the PAC
    #[arg(long)]
    pub no_bootstrap_apply: bool,

    /// Never touch OS proxy settings; use an in-memory database
    #[arg(long)]
    pub dry_run: bool,
}

impl Args {
    pub fn upstream(&self) -> Upstream {
        Upstream::new(self.upstream_host.clone(), self.upstream_port)
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::new(self.backend_url.clone()).with_timeout(self.backend_timeout_secs)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::default().with_port(self.port)
    }

    /// Effective log level; `--debug` wins.
    pub fn log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }
}
