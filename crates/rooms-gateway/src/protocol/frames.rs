//! Client and server frames.

use rooms_common::{AppError, ErrorResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames sent by clients
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Join a room
    Join { room: String },
    /// Leave one room, or every room when `room` is omitted
    Leave {
        #[serde(default)]
        room: Option<String>,
    },
    /// Broadcast `data` to rooms (every connection when `rooms` is empty)
    Broadcast {
        #[serde(default)]
        rooms: Vec<String>,
        #[serde(default)]
        except: Vec<String>,
        #[serde(default)]
        data: Value,
        /// Deliver as a named event instead of a plain message
        #[serde(default)]
        event: Option<String>,
    },
    /// Rooms of a connection (this one by default), or all rooms with `all`
    Rooms {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        all: bool,
    },
    /// Connection ids in a room
    Clients { room: String },
    /// Whether a room has no connections
    IsEmpty { room: String },
}

impl ClientFrame {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Operation name, for logging and acks
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Broadcast { .. } => "broadcast",
            Self::Rooms { .. } => "rooms",
            Self::Clients { .. } => "clients",
            Self::IsEmpty { .. } => "is_empty",
        }
    }
}

/// Frames sent to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Sent once after the upgrade with the connection id
    Ready { id: String },
    /// Broadcast payload delivered with `write`
    Message { data: Value },
    /// Broadcast payload delivered with `send`
    Event { name: String, data: Value },
    Rooms { rooms: Vec<String> },
    Clients { room: String, ids: Vec<String> },
    IsEmpty { room: String, empty: bool },
    /// Operation completed
    Ack {
        of: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        targeted: Option<usize>,
    },
    Error { code: String, message: String },
}

impl ServerFrame {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    #[must_use]
    pub fn ack(of: &str) -> Self {
        Self::Ack {
            of: of.to_string(),
            targeted: None,
        }
    }

    /// Build an event frame from a `{ "event": .., "data": .. }` payload.
    ///
    /// Payloads without an event name become plain messages.
    #[must_use]
    pub fn from_event_payload(payload: &Value) -> Self {
        match payload.get("event").and_then(Value::as_str) {
            Some(name) => Self::Event {
                name: name.to_string(),
                data: payload.get("data").cloned().unwrap_or(Value::Null),
            },
            None => Self::Message {
                data: payload.clone(),
            },
        }
    }
}

impl From<&AppError> for ServerFrame {
    fn from(err: &AppError) -> Self {
        let response = ErrorResponse::from(err);
        Self::Error {
            code: response.code,
            message: response.message,
        }
    }
}
