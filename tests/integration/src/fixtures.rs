//! Test fixtures and data generators
//!
//! Provides reusable membership layouts and payloads.

use std::sync::atomic::{AtomicU64, Ordering};

use rooms_gateway::protocol::ServerFrame;
use serde_json::{json, Value};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Membership used by the broadcast scenarios, as (connection, rooms).
///
/// `lobby` = {alice, bob}, `games` = {bob, carol}, `quiet` = {dave}.
pub const LAYOUT: [(&str, &[&str]); 4] = [
    ("alice", &["lobby"]),
    ("bob", &["lobby", "games"]),
    ("carol", &["games"]),
    ("dave", &["quiet"]),
];

/// A chat-style payload
pub fn chat_payload(text: &str) -> Value {
    json!({ "text": text })
}

/// The frame a connection receives for a `write` of `data`
pub fn message_frame(data: Value) -> ServerFrame {
    ServerFrame::Message { data }
}
