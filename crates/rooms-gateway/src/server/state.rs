//! Gateway state
//!
//! Application state for the gateway server.

use crate::connection::ConnectionManager;
use rooms_adapter::RoomsAdapter;
use rooms_common::AppConfig;
use rooms_core::Relay;
use std::sync::Arc;

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server.
#[derive(Clone)]
pub struct GatewayState {
    /// Room adapter over the shared store
    adapter: RoomsAdapter,
    /// Connection manager for WebSocket connections
    connection_manager: Arc<ConnectionManager>,
    /// Relay handle given to each connection when relay mode is on
    relay: Option<Arc<dyn Relay>>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        adapter: RoomsAdapter,
        connection_manager: Arc<ConnectionManager>,
        relay: Option<Arc<dyn Relay>>,
        config: AppConfig,
    ) -> Self {
        Self {
            adapter,
            connection_manager,
            relay,
            config: Arc::new(config),
        }
    }

    /// Get the room adapter
    pub fn adapter(&self) -> &RoomsAdapter {
        &self.adapter
    }

    /// Get the connection manager
    pub fn connection_manager(&self) -> &Arc<ConnectionManager> {
        &self.connection_manager
    }

    /// Get the relay handle, if relay mode is on
    pub fn relay(&self) -> Option<Arc<dyn Relay>> {
        self.relay.clone()
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("adapter", &self.adapter)
            .field("connection_manager", &self.connection_manager)
            .field("relay", &self.relay.is_some())
            .field("config", &"AppConfig")
            .finish()
    }
}
