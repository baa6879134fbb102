//! Broadcast request and outcome types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Primitive used to hand a payload to a local connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMethod {
    /// Raw write of the payload
    #[default]
    Write,
    /// Event-style send (hosts with an emitter layer)
    Send,
}

impl fmt::Display for DispatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write => write!(f, "write"),
            Self::Send => write!(f, "send"),
        }
    }
}

impl std::str::FromStr for DispatchMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "write" => Ok(Self::Write),
            "send" => Ok(Self::Send),
            _ => Err(format!("Invalid dispatch method: {s}")),
        }
    }
}

/// Turns the broadcast argument list into the wire payload.
///
/// Applied once per broadcast, never per recipient.
#[derive(Clone)]
pub struct Transformer(Arc<dyn Fn(&[Value]) -> Value + Send + Sync>);

impl Transformer {
    /// Wrap a transform function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Produce the wire payload
    #[must_use]
    pub fn apply(&self, data: &[Value]) -> Value {
        (self.0)(data)
    }
}

impl Default for Transformer {
    /// Sends the first argument, or `null` when there is none
    fn default() -> Self {
        Self::new(|data| data.first().cloned().unwrap_or(Value::Null))
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transformer(..)")
    }
}

/// Options for a broadcast
#[derive(Debug, Clone, Default)]
pub struct BroadcastOptions {
    /// Target rooms; empty means every connection in the namespace
    pub rooms: Vec<String>,
    /// Connection ids that must not receive the payload
    pub except: Vec<String>,
    /// Local primitive used for delivery
    pub method: DispatchMethod,
    /// Payload transformer (defaults to the first argument)
    pub transformer: Option<Transformer>,
}

impl BroadcastOptions {
    /// Broadcast to every connection in the namespace
    #[must_use]
    pub fn everyone() -> Self {
        Self::default()
    }

    /// Broadcast to the given rooms
    #[must_use]
    pub fn to_rooms<I, S>(rooms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rooms: rooms.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add a room to the target set
    #[must_use]
    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.rooms.push(room.into());
        self
    }

    /// Exclude a connection
    #[must_use]
    pub fn except(mut self, connection_id: impl Into<String>) -> Self {
        self.except.push(connection_id.into());
        self
    }

    /// Set the dispatch method
    #[must_use]
    pub fn method(mut self, method: DispatchMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the payload transformer
    #[must_use]
    pub fn transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Transform the argument list into the wire payload
    #[must_use]
    pub fn transform(&self, data: &[Value]) -> Value {
        match &self.transformer {
            Some(t) => t.apply(data),
            None => Transformer::default().apply(data),
        }
    }
}

/// What a broadcast did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Connection ids left after union and exclusion
    pub targeted: usize,
    /// Local connections that accepted the payload
    pub delivered: usize,
    /// Targeted ids with no local connection (or a closed one)
    pub dropped: usize,
    /// Whether the target set was handed to the relay
    pub relayed: bool,
}
