//! PacGate Server - local HTTP API for the popup.
//!
//! Every route is a thin wrapper over one bridge intent.
//!
//! ## Endpoints
//!
//! - `POST /api/connect` / `POST /api/disconnect` - Toggle the proxy
//! - `POST /api/rules/update` - Re-apply rules if connected
//! - `GET /api/defaults` - Built-in domain list
//! - `GET /api/domains` / `POST /api/domains` / `DELETE /api/domains/{domain}` - Custom list
//! - `GET /api/status` - State, badge and subscription
//! - `POST /api/subscription/refresh` - Re-check the subscription
//! - `POST /api/session` / `POST /api/signout` - Sign in and out
//!
//! Browser requests are accepted only from extension pages and localhost
//! origins (see [`origin`]).
//!
//! ## Example
//!
//! ```no_run
//! use pacgate_core::BridgeHandle;
//! use pacgate_server::{AppState, Server, ServerConfig};
//!
//! async fn serve(bridge: BridgeHandle) {
//!     let server = Server::with_state(ServerConfig::default(), AppState::new(bridge)).unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod error;
mod handlers;
pub mod models;
pub mod origin;
pub mod state;

use std::net::SocketAddr;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tracing::info;

pub use error::{ApiError, Result};
pub use state::AppState;

/// Default server port.
pub const DEFAULT_PORT: u16 = 48766;

/// Default server host (localhost only).
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1).
    pub host: String,
    /// Port to bind to (default: 48766).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/connect", post(handlers::connect))
        .route("/api/disconnect", post(handlers::disconnect))
        .route("/api/rules/update", post(handlers::update_rules))
        .route("/api/defaults", get(handlers::get_defaults))
        .route(
            "/api/domains",
            get(handlers::get_domains).post(handlers::add_domain),
        )
        .route("/api/domains/{domain}", delete(handlers::remove_domain))
        .route("/api/status", get(handlers::get_status))
        .route(
            "/api/subscription/refresh",
            post(handlers::refresh_subscription),
        )
        .route("/api/session", post(handlers::sign_in))
        .route("/api/signout", post(handlers::sign_out))
        .layer(middleware::from_fn(origin::reject_foreign_origin))
        .layer(origin::cors_layer())
        .with_state(state)
}

/// The HTTP API server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a server with the given application state.
    pub fn with_state(
        config: ServerConfig,
        state: AppState,
    ) -> std::result::Result<Self, ServerError> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self {
            router: router(state),
            addr,
        })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> std::result::Result<(), ServerError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        info!("Starting PacGate API server on {}", self.addr);

        let domain = if self.addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Allow address reuse (helps with TIME_WAIT sockets after a restart)
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        info!("API server stopped");
        Ok(())
    }

    /// Runs the server until the process exits.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
