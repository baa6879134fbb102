//! Relay publisher.

use async_trait::async_trait;
use redis::AsyncCommands;
use rooms_core::{DispatchMethod, Keyspace, Relay, StoreError, StoreResult};
use serde_json::Value;

use super::envelope::{relay_channel, RelayEnvelope};
use crate::pool::SharedRedisPool;

/// Publishes forwarded broadcasts on the namespace relay channel
#[derive(Debug, Clone)]
pub struct PubSubRelay {
    pool: SharedRedisPool,
    channel: String,
    origin: String,
}

impl PubSubRelay {
    /// Create a relay for a keyspace; `origin` identifies this process in envelopes
    #[must_use]
    pub fn new(pool: SharedRedisPool, keyspace: &Keyspace, origin: impl Into<String>) -> Self {
        Self {
            pool,
            channel: relay_channel(keyspace),
            origin: origin.into(),
        }
    }
}

#[async_trait]
impl Relay for PubSubRelay {
    async fn forward(
        &self,
        connection_ids: &[String],
        payload: &Value,
        method: DispatchMethod,
    ) -> StoreResult<()> {
        if connection_ids.is_empty() {
            return Ok(());
        }

        let envelope = RelayEnvelope {
            origin: self.origin.clone(),
            method,
            ids: connection_ids.to_vec(),
            payload: payload.clone(),
        };
        let json = envelope
            .to_json()
            .map_err(|e| StoreError::Relay(e.to_string()))?;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Relay(e.to_string()))?;
        let receivers: u32 = conn
            .publish(&self.channel, json)
            .await
            .map_err(|e| StoreError::Relay(e.to_string()))?;

        tracing::debug!(
            channel = %self.channel,
            targets = connection_ids.len(),
            receivers,
            "Broadcast relayed"
        );
        Ok(())
    }
}
