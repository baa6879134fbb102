//! # rooms-core
//!
//! Domain layer for the room-membership adapter: the namespaced keyspace, the
//! membership store port, host collaborator traits, broadcast options, and the
//! wildcard capability.
//! This crate has zero dependencies on infrastructure (Redis, web framework, etc.).

pub mod broadcast;
pub mod error;
pub mod keys;
pub mod traits;
pub mod wildcard;

// Re-export commonly used types at crate root
pub use broadcast::{BroadcastOptions, BroadcastReport, DispatchMethod, Transformer};
pub use error::{StoreError, StoreResult};
pub use keys::{Keyspace, DEFAULT_NAMESPACE};
pub use traits::{
    ConnectionEnumerator, HostShutdown, LocalConnection, LocalConnections, MembershipStore,
    Relay, RoomAdapter, RoomList,
};
pub use wildcard::{SegmentWildcard, WildcardMatcher};
