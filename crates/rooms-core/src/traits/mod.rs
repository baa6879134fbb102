//! Traits (ports) - the seams between the adapter and its collaborators
//!
//! The domain layer defines what it needs from the shared store and from the
//! host connection framework; the store and host crates provide implementations.

mod adapter;
mod host;
mod store;

pub use adapter::{RoomAdapter, RoomList};
pub use host::{ConnectionEnumerator, HostShutdown, LocalConnection, LocalConnections, Relay};
pub use store::MembershipStore;
