//! Relay wire format and local delivery.

use rooms_core::{DispatchMethod, Keyspace, LocalConnections};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Channel the relay publishes on for a keyspace
#[must_use]
pub fn relay_channel(keyspace: &Keyspace) -> String {
    format!("{}relay", keyspace.prefix())
}

/// One forwarded broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEnvelope {
    /// Id of the publishing process
    pub origin: String,
    #[serde(default)]
    pub method: DispatchMethod,
    /// Target connection ids, already filtered
    pub ids: Vec<String>,
    /// Transformed payload
    pub payload: Value,
}

impl RelayEnvelope {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Deliver an envelope to the connections held locally.
///
/// Each local connection receives the payload at most once even if its id is
/// listed twice. Returns how many writes were accepted.
pub async fn deliver(envelope: &RelayEnvelope, connections: &dyn LocalConnections) -> usize {
    let mut seen = HashSet::new();
    let mut delivered = 0;

    for id in &envelope.ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        if let Some(conn) = connections.get(id) {
            if conn.dispatch(envelope.method, &envelope.payload).await {
                delivered += 1;
            }
        }
    }

    delivered
}
