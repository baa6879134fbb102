//! Host connection framework collaborators.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::broadcast::DispatchMethod;
use crate::error::StoreResult;

/// A connection held open by this process
#[async_trait]
pub trait LocalConnection: Send + Sync {
    /// Connection id as stored in the membership index
    fn id(&self) -> &str;

    /// Write a payload; `false` when the connection can no longer take it
    async fn write(&self, payload: &Value) -> bool;

    /// Event-style send; hosts without an emitter layer fall back to `write`
    async fn send(&self, payload: &Value) -> bool {
        self.write(payload).await
    }

    /// Handle to the cross-process relay, when the host has one
    fn relay(&self) -> Option<Arc<dyn Relay>> {
        None
    }

    /// Deliver with the requested primitive
    async fn dispatch(&self, method: DispatchMethod, payload: &Value) -> bool {
        match method {
            DispatchMethod::Write => self.write(payload).await,
            DispatchMethod::Send => self.send(payload).await,
        }
    }
}

/// The process-local connection table (id -> connection)
pub trait LocalConnections: Send + Sync {
    /// Look up a local connection
    fn get(&self, connection_id: &str) -> Option<Arc<dyn LocalConnection>>;

    /// An arbitrary local connection, if there is one
    fn any(&self) -> Option<Arc<dyn LocalConnection>>;

    /// Number of local connections
    fn len(&self) -> usize;

    /// Whether there are no local connections
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalConnections for HashMap<String, Arc<dyn LocalConnection>> {
    fn get(&self, connection_id: &str) -> Option<Arc<dyn LocalConnection>> {
        HashMap::get(self, connection_id).cloned()
    }

    fn any(&self) -> Option<Arc<dyn LocalConnection>> {
        self.values().next().cloned()
    }

    fn len(&self) -> usize {
        HashMap::len(self)
    }
}

/// Cross-process forwarding path.
///
/// Routes every id to whichever process holds it, including this one.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Forward one payload to a set of connection ids
    async fn forward(
        &self,
        connection_ids: &[String],
        payload: &Value,
        method: DispatchMethod,
    ) -> StoreResult<()>;
}

/// Lists the connection ids currently held by this process
pub trait ConnectionEnumerator: Send + Sync {
    fn connection_ids(&self) -> Vec<String>;
}

impl<F> ConnectionEnumerator for F
where
    F: Fn() -> Vec<String> + Send + Sync,
{
    fn connection_ids(&self) -> Vec<String> {
        self()
    }
}

/// Host hook run before shutdown reconciliation.
///
/// After `close_listeners` returns the host must not issue new membership
/// mutations.
#[async_trait]
pub trait HostShutdown: Send + Sync {
    async fn close_listeners(&self);
}
