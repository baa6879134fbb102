//! # rooms-gateway
//!
//! WebSocket host for the room adapter: holds local connections, turns client
//! frames into membership operations and broadcasts, and sequences shutdown.

pub mod connection;
pub mod protocol;
pub mod server;

pub use server::run;
