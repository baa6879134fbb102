//! Membership store port.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::keys::Keyspace;

/// Dual-index membership storage shared by every process using a namespace.
///
/// Each method is a single round trip to the store. Methods that touch more than
/// one key run as one transaction or one server-side script, so no third party
/// ever sees one side of the index updated without the other.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Snapshot of the keyspace currently in use
    fn keyspace(&self) -> Keyspace;

    /// Add a connection to a room (both index sides, one transaction)
    async fn add(&self, connection_id: &str, room: &str) -> StoreResult<()>;

    /// Rooms a connection belongs to
    async fn rooms_of(&self, connection_id: &str) -> StoreResult<Vec<String>>;

    /// Every room name in the namespace (prefix scan, O(number of rooms))
    async fn all_rooms(&self) -> StoreResult<Vec<String>>;

    /// Every connection id in the namespace (prefix scan)
    async fn all_connections(&self) -> StoreResult<Vec<String>>;

    /// Remove a connection from the given rooms (both index sides, one transaction)
    async fn remove(&self, connection_id: &str, rooms: &[String]) -> StoreResult<()>;

    /// Connection ids in a room
    async fn clients(&self, room: &str) -> StoreResult<Vec<String>>;

    /// Connection ids of several rooms, read in one transaction, in input order
    async fn clients_of_rooms(&self, rooms: &[String]) -> StoreResult<Vec<Vec<String>>>;

    /// Number of connections in a room
    async fn room_size(&self, room: &str) -> StoreResult<u64>;

    /// Run the room-removal script once per room, batched in one transaction
    async fn empty_rooms(&self, rooms: &[String]) -> StoreResult<()>;

    /// Run the connection-removal script once per id, batched in one transaction
    async fn remove_connections(&self, connection_ids: &[String]) -> StoreResult<()>;

    /// Delete every key in the namespace, returning how many were removed
    async fn clear(&self) -> StoreResult<u64>;

    /// Switch to another namespace, re-registering the atomic scripts
    async fn set_namespace(&self, namespace: &str) -> StoreResult<()>;
}
