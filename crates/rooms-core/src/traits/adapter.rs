//! Room adapter contract.

use async_trait::async_trait;
use serde_json::Value;

use crate::broadcast::{BroadcastOptions, BroadcastReport};
use crate::error::StoreResult;
use crate::traits::LocalConnections;
use crate::wildcard::WildcardMatcher;

/// One room or a list of rooms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomList(Vec<String>);

impl RoomList {
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<&str> for RoomList {
    fn from(room: &str) -> Self {
        Self(vec![room.to_string()])
    }
}

impl From<String> for RoomList {
    fn from(room: String) -> Self {
        Self(vec![room])
    }
}

impl From<Vec<String>> for RoomList {
    fn from(rooms: Vec<String>) -> Self {
        Self(rooms)
    }
}

impl From<Vec<&str>> for RoomList {
    fn from(rooms: Vec<&str>) -> Self {
        Self(rooms.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for RoomList {
    fn from(rooms: &[&str]) -> Self {
        Self(rooms.iter().map(|r| (*r).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RoomList {
    fn from(rooms: [&str; N]) -> Self {
        Self(rooms.iter().map(|r| (*r).to_string()).collect())
    }
}

/// Method surface every room adapter exposes to the host framework.
///
/// The shared store is authoritative: implementations keep no in-process copy
/// of room or connection membership.
#[async_trait]
pub trait RoomAdapter: Send + Sync {
    /// Partial configuration accepted by [`RoomAdapter::config`]
    type Update: Send;

    /// Add a connection to a room
    async fn add(&self, connection_id: &str, room: &str) -> StoreResult<()>;

    /// Alias of [`RoomAdapter::add`]
    async fn set(&self, connection_id: &str, room: &str) -> StoreResult<()> {
        self.add(connection_id, room).await
    }

    /// Rooms of a connection, or every room in the namespace when `None`
    async fn get(&self, connection_id: Option<&str>) -> StoreResult<Vec<String>>;

    /// Remove a connection from one room, or from all of its rooms when `None`
    async fn del(&self, connection_id: &str, room: Option<&str>) -> StoreResult<()>;

    /// Deliver a payload to every connection in the target rooms
    async fn broadcast(
        &self,
        data: &[Value],
        opts: &BroadcastOptions,
        clients: &dyn LocalConnections,
    ) -> StoreResult<BroadcastReport>;

    /// Connection ids in a room
    async fn clients(&self, room: &str) -> StoreResult<Vec<String>>;

    /// Remove every connection from the given rooms
    async fn empty(&self, rooms: RoomList) -> StoreResult<()>;

    /// Whether a room has no connections
    async fn is_empty(&self, room: &str) -> StoreResult<bool>;

    /// Wipe the whole namespace, for every process sharing it
    async fn clear(&self) -> StoreResult<u64>;

    /// Apply a configuration update
    async fn config(&self, update: Self::Update) -> StoreResult<()>;

    /// Pattern-matching capability for room names
    fn wildcard(&self) -> &dyn WildcardMatcher;
}
