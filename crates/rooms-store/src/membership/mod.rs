//! Membership store implementations.
//!
//! - [`RedisMembershipStore`]: the shared dual index in Redis
//! - [`MemoryMembershipStore`]: the same layout on an in-process backend

mod memory_store;
mod redis_store;

pub use memory_store::{MemoryBackend, MemoryMembershipStore};
pub use redis_store::RedisMembershipStore;
