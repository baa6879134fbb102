//! Relay subscriber.
//!
//! One dedicated Pub/Sub connection per process. A dropped subscription is
//! logged and the listener ends; it does not reconnect.

use futures_util::StreamExt;
use redis::Client;
use rooms_core::{LocalConnections, StoreError, StoreResult};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::envelope::{deliver, RelayEnvelope};

/// Delivers relayed broadcasts to this process's connections
pub struct RelayListener;

impl RelayListener {
    /// Subscribe to `channel` and start delivering in a background task.
    ///
    /// Returns once the subscription is confirmed, so an unreachable server is
    /// reported to the caller.
    pub async fn spawn(
        redis_url: &str,
        channel: &str,
        connections: Arc<dyn LocalConnections>,
    ) -> StoreResult<RelayListenerHandle> {
        let client = Client::open(redis_url).map_err(|e| StoreError::Misconfigured(e.to_string()))?;
        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| StoreError::Relay(e.to_string()))?;

        tracing::info!(channel = %channel, "Relay listener subscribed");

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let channel = channel.to_string();

        let task = tokio::spawn(async move {
            let mut stream = Box::pin(pubsub.into_on_message());

            loop {
                tokio::select! {
                    msg = stream.next() => {
                        let Some(msg) = msg else {
                            tracing::warn!(channel = %channel, "Relay subscription ended");
                            break;
                        };

                        let payload: String = match msg.get_payload() {
                            Ok(payload) => payload,
                            Err(e) => {
                                tracing::warn!(error = %e, "Unreadable relay message");
                                continue;
                            }
                        };

                        match RelayEnvelope::from_json(&payload) {
                            Ok(envelope) => {
                                let delivered = deliver(&envelope, connections.as_ref()).await;
                                tracing::trace!(
                                    origin = %envelope.origin,
                                    targets = envelope.ids.len(),
                                    delivered,
                                    "Relay envelope delivered"
                                );
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Malformed relay envelope");
                            }
                        }
                    }

                    _ = &mut stop_rx => {
                        tracing::info!(channel = %channel, "Relay listener stopping");
                        break;
                    }
                }
            }
        });

        Ok(RelayListenerHandle {
            stop: Some(stop_tx),
            task,
        })
    }
}

/// Handle to a running relay listener
pub struct RelayListenerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RelayListenerHandle {
    /// Whether the listener task has ended
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the listener and wait for it to end
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "Relay listener task failed");
        }
    }
}
