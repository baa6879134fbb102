//! Connection manager
//!
//! Holds every open WebSocket connection of this process using DashMap for
//! thread-safe access. It is also the adapter's view of the process: the local
//! connection table, the connection enumerator and the listener set closed on
//! shutdown.

use super::Connection;
use crate::protocol::ServerFrame;
use async_trait::async_trait;
use dashmap::DashMap;
use rooms_core::{ConnectionEnumerator, HostShutdown, LocalConnection, LocalConnections, Relay};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Manages all active WebSocket connections
pub struct ConnectionManager {
    /// Active connections by id
    connections: DashMap<String, Arc<Connection>>,

    /// Cleared when the listeners close; no new sockets or mutations after that
    accepting: AtomicBool,

    /// Flipped to `true` when the listeners close
    closed: watch::Sender<bool>,
}

impl ConnectionManager {
    /// Create a new connection manager
    #[must_use]
    pub fn new() -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            connections: DashMap::new(),
            accepting: AtomicBool::new(true),
            closed,
        }
    }

    /// Create a new connection manager wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection; `None` once the listeners are closed
    pub fn add_connection(
        &self,
        id: String,
        sender: mpsc::Sender<ServerFrame>,
        relay: Option<Arc<dyn Relay>>,
    ) -> Option<Arc<Connection>> {
        if !self.is_accepting() {
            return None;
        }

        let connection = Connection::new(id.clone(), sender, relay);
        self.connections.insert(id.clone(), connection.clone());

        tracing::debug!(connection_id = %id, "Connection added");

        Some(connection)
    }

    /// Remove a connection
    pub fn remove_connection(&self, id: &str) -> Option<Arc<Connection>> {
        let removed = self.connections.remove(id).map(|(_, conn)| conn);
        if removed.is_some() {
            tracing::debug!(connection_id = %id, "Connection removed");
        }
        removed
    }

    /// Get a connection by id
    pub fn get_connection(&self, id: &str) -> Option<Arc<Connection>> {
        self.connections.get(id).map(|r| r.clone())
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Ids of every open connection
    pub fn connection_ids(&self) -> Vec<String> {
        self.connections.iter().map(|r| r.key().clone()).collect()
    }

    /// Whether new sockets and membership mutations are still allowed
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Stop accepting and wake everyone waiting on [`ConnectionManager::closed`]
    pub fn close(&self) {
        if self.accepting.swap(false, Ordering::SeqCst) {
            self.closed.send_replace(true);
            tracing::info!(
                connections = self.connection_count(),
                "Connection manager closed"
            );
        }
    }

    /// Resolve once the listeners are closed
    pub async fn closed(&self) {
        let mut closed = self.closed.subscribe();
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Drop every connection; their send tasks end and close the sockets
    pub fn disconnect_all(&self) -> usize {
        let count = self.connections.len();
        self.connections.clear();
        tracing::info!(count, "All connections dropped");
        count
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("accepting", &self.is_accepting())
            .finish()
    }
}

impl LocalConnections for ConnectionManager {
    fn get(&self, connection_id: &str) -> Option<Arc<dyn LocalConnection>> {
        self.get_connection(connection_id)
            .map(|conn| conn as Arc<dyn LocalConnection>)
    }

    fn any(&self) -> Option<Arc<dyn LocalConnection>> {
        self.connections
            .iter()
            .next()
            .map(|r| Arc::clone(r.value()) as Arc<dyn LocalConnection>)
    }

    fn len(&self) -> usize {
        self.connection_count()
    }
}

impl ConnectionEnumerator for ConnectionManager {
    fn connection_ids(&self) -> Vec<String> {
        ConnectionManager::connection_ids(self)
    }
}

#[async_trait]
impl HostShutdown for ConnectionManager {
    async fn close_listeners(&self) {
        self.close();
    }
}
