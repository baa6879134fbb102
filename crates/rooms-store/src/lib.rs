//! # rooms-store
//!
//! Shared-store layer for room membership.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Atomic Scripts**: Server-side room and connection removal
//! - **Membership Stores**: Redis-backed dual index, plus an in-memory backend
//!   for single-node deployments and tests
//! - **Relay**: Pub/Sub forwarding of broadcasts to the process holding each connection
//!
//! ## Example
//!
//! ```ignore
//! use rooms_store::{RedisMembershipStore, RedisPool, RedisPoolConfig};
//! use std::sync::Arc;
//!
//! let pool = Arc::new(RedisPool::new(RedisPoolConfig::default())?);
//! let store = RedisMembershipStore::connect(pool, "bumblebee").await?;
//!
//! store.add("spark-1", "lobby").await?;
//! let members = store.clients("lobby").await?;
//! ```

pub mod membership;
pub mod pool;
pub mod relay;
pub mod scripts;

// Re-export pool types
pub use pool::{create_shared_pool, RedisPool, RedisPoolConfig, RedisPoolError, RedisResult, SharedRedisPool};

// Re-export membership stores
pub use membership::{MemoryBackend, MemoryMembershipStore, RedisMembershipStore};

// Re-export script types
pub use scripts::{AtomicScript, ScriptSet, NAMESPACE_TOKEN};

// Re-export relay types
pub use relay::{deliver, relay_channel, PubSubRelay, RelayEnvelope, RelayListener, RelayListenerHandle};
