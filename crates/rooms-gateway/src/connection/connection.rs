//! Individual WebSocket connection

use crate::protocol::ServerFrame;
use async_trait::async_trait;
use rooms_core::{LocalConnection, Relay};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A single WebSocket connection
pub struct Connection {
    /// Connection id, also the id stored in the membership index
    id: String,

    /// Channel to send frames to the WebSocket
    sender: mpsc::Sender<ServerFrame>,

    /// Relay handle shared by every connection of the process
    relay: Option<Arc<dyn Relay>>,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        id: String,
        sender: mpsc::Sender<ServerFrame>,
        relay: Option<Arc<dyn Relay>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            sender,
            relay,
        })
    }

    /// Queue a frame for the WebSocket
    pub async fn send_frame(
        &self,
        frame: ServerFrame,
    ) -> Result<(), mpsc::error::SendError<ServerFrame>> {
        self.sender.send(frame).await
    }

    /// Check if the sender channel is closed
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[async_trait]
impl LocalConnection for Connection {
    fn id(&self) -> &str {
        &self.id
    }

    async fn write(&self, payload: &Value) -> bool {
        self.send_frame(ServerFrame::Message {
            data: payload.clone(),
        })
        .await
        .is_ok()
    }

    async fn send(&self, payload: &Value) -> bool {
        self.send_frame(ServerFrame::from_event_payload(payload))
            .await
            .is_ok()
    }

    fn relay(&self) -> Option<Arc<dyn Relay>> {
        self.relay.clone()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("relay", &self.relay.is_some())
            .finish()
    }
}
