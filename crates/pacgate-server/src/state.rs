//! Application state for the API server.

use pacgate_core::BridgeHandle;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Queue into the controller worker.
    pub bridge: BridgeHandle,
}

impl AppState {
    /// Creates application state around a running bridge.
    pub fn new(bridge: BridgeHandle) -> Self {
        Self { bridge }
    }
}
