//! Caller origin checks.
//!
//! Browsers attach `Origin` to cross-site requests. Only the extension popup
//! and pages served from this machine may drive the API. Requests without
//! the header (native clients, command-line tools) pass through.

use axum::extract::Request;
use axum::http::header::{CONTENT_TYPE, ORIGIN};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::error::ApiError;

const EXTENSION_SCHEMES: &[&str] = &["chrome-extension://", "moz-extension://"];

const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

/// Whether a browser origin may call the API.
pub fn is_allowed_origin(origin: &str) -> bool {
    for scheme in EXTENSION_SCHEMES {
        if let Some(id) = origin.strip_prefix(scheme) {
            return !id.is_empty() && !id.contains('/');
        }
    }

    let Some(authority) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };

    let host = match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => authority,
    };
    LOCAL_HOSTS.contains(&host)
}

fn header_allowed(origin: &HeaderValue) -> bool {
    origin.to_str().map(is_allowed_origin).unwrap_or(false)
}

/// CORS policy: allowed origins only, and only the methods the API uses.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            |origin: &HeaderValue, _parts: &Parts| header_allowed(origin),
        ))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
}

/// Refuses requests whose `Origin` is not allowed.
///
/// CORS alone only hides responses; simple requests would still reach the
/// bridge.
pub async fn reject_foreign_origin(request: Request, next: Next) -> Result<Response, ApiError> {
    if let Some(origin) = request.headers().get(ORIGIN) {
        if !header_allowed(origin) {
            warn!(origin = ?origin, uri = %request.uri(), "Rejected request from foreign origin");
            return Err(ApiError::ForbiddenOrigin);
        }
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_origins_allowed() {
        assert!(is_allowed_origin("chrome-extension://abcdefghijklmnop"));
        assert!(is_allowed_origin("moz-extension://6b1f0c1e-1234"));
        assert!(!is_allowed_origin("chrome-extension://"));
    }

    #[test]
    fn test_local_origins_allowed() {
        assert!(is_allowed_origin("http://localhost"));
        assert!(is_allowed_origin("http://localhost:3000"));
        assert!(is_allowed_origin("http://127.0.0.1:48766"));
        assert!(is_allowed_origin("http://[::1]:8080"));
    }

    #[test]
    fn test_foreign_origins_refused() {
        assert!(!is_allowed_origin("https://evil.example"));
        assert!(!is_allowed_origin("http://localhost.evil.example"));
        assert!(!is_allowed_origin("http://127.0.0.1.nip.io"));
        assert!(!is_allowed_origin("null"));
        assert!(!is_allowed_origin("file://"));
    }
}
