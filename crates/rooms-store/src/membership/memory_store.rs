//! In-process membership index.
//!
//! A [`MemoryBackend`] plays the role of one shared store server. Every store
//! built on the same backend sees the same data, so several stores on one
//! backend behave like several processes sharing one Redis. Each operation runs
//! inside a single critical section, which makes the removal "scripts" atomic.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rooms_core::{Keyspace, MembershipStore, StoreError, StoreResult};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
struct BackendState {
    sets: HashMap<String, BTreeSet<String>>,
    unavailable: bool,
}

impl BackendState {
    fn sadd(&mut self, key: String, member: &str) {
        self.sets.entry(key).or_default().insert(member.to_string());
    }

    fn srem(&mut self, key: &str, member: &str) {
        if let Some(set) = self.sets.get_mut(key) {
            set.remove(member);
            // Redis drops a set once its last member is gone
            if set.is_empty() {
                self.sets.remove(key);
            }
        }
    }

    fn smembers(&self, key: &str) -> Vec<String> {
        self.sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .sets
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Remove `key`, detaching each member from its counterpart set
    fn drain_into(&mut self, key: &str, counterpart: impl Fn(&str) -> String, owner: &str) {
        if let Some(members) = self.sets.remove(key) {
            for member in members {
                self.srem(&counterpart(&member), owner);
            }
        }
    }
}

/// Shared in-process store, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the backend reachable or not; unreachable backends fail every call
    pub fn set_available(&self, available: bool) {
        self.state.lock().unavailable = !available;
    }

    /// Every key currently held, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.state.lock().keys_with_prefix("")
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut BackendState) -> R) -> StoreResult<R> {
        let mut state = self.state.lock();
        if state.unavailable {
            return Err(StoreError::Unavailable(
                "memory backend marked unavailable".to_string(),
            ));
        }
        Ok(f(&mut state))
    }
}

/// Membership store on a [`MemoryBackend`]
#[derive(Debug)]
pub struct MemoryMembershipStore {
    backend: MemoryBackend,
    keyspace: RwLock<Keyspace>,
}

impl MemoryMembershipStore {
    /// Create a store for a namespace on a backend
    pub fn new(backend: MemoryBackend, namespace: &str) -> StoreResult<Self> {
        Ok(Self {
            backend,
            keyspace: RwLock::new(Keyspace::new(namespace)?),
        })
    }

    /// Store on a private backend using the default namespace
    #[must_use]
    pub fn standalone() -> Self {
        Self {
            backend: MemoryBackend::new(),
            keyspace: RwLock::new(Keyspace::default()),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &MemoryBackend {
        &self.backend
    }
}

#[async_trait]
impl MembershipStore for MemoryMembershipStore {
    fn keyspace(&self) -> Keyspace {
        self.keyspace.read().clone()
    }

    async fn add(&self, connection_id: &str, room: &str) -> StoreResult<()> {
        let keys = self.keyspace();
        self.backend.with_state(|state| {
            state.sadd(keys.spark_key(connection_id), room);
            state.sadd(keys.room_key(room), connection_id);
        })?;

        tracing::debug!(connection_id = %connection_id, room = %room, "Joined room");
        Ok(())
    }

    async fn rooms_of(&self, connection_id: &str) -> StoreResult<Vec<String>> {
        let key = self.keyspace().spark_key(connection_id);
        self.backend.with_state(|state| state.smembers(&key))
    }

    async fn all_rooms(&self) -> StoreResult<Vec<String>> {
        let keys = self.keyspace();
        let found = self
            .backend
            .with_state(|state| state.keys_with_prefix(&keys.room_prefix()))?;
        Ok(found
            .iter()
            .filter_map(|key| keys.strip_room(key))
            .map(str::to_string)
            .collect())
    }

    async fn all_connections(&self) -> StoreResult<Vec<String>> {
        let keys = self.keyspace();
        let found = self
            .backend
            .with_state(|state| state.keys_with_prefix(&keys.spark_prefix()))?;
        Ok(found
            .iter()
            .filter_map(|key| keys.strip_spark(key))
            .map(str::to_string)
            .collect())
    }

    async fn remove(&self, connection_id: &str, rooms: &[String]) -> StoreResult<()> {
        if rooms.is_empty() {
            return Ok(());
        }

        let keys = self.keyspace();
        let spark_key = keys.spark_key(connection_id);
        self.backend.with_state(|state| {
            for room in rooms {
                state.srem(&spark_key, room);
                state.srem(&keys.room_key(room), connection_id);
            }
        })?;

        tracing::debug!(connection_id = %connection_id, rooms = ?rooms, "Left rooms");
        Ok(())
    }

    async fn clients(&self, room: &str) -> StoreResult<Vec<String>> {
        let key = self.keyspace().room_key(room);
        self.backend.with_state(|state| state.smembers(&key))
    }

    async fn clients_of_rooms(&self, rooms: &[String]) -> StoreResult<Vec<Vec<String>>> {
        let keys = self.keyspace();
        self.backend.with_state(|state| {
            rooms
                .iter()
                .map(|room| state.smembers(&keys.room_key(room)))
                .collect()
        })
    }

    async fn room_size(&self, room: &str) -> StoreResult<u64> {
        let key = self.keyspace().room_key(room);
        self.backend
            .with_state(|state| state.sets.get(&key).map_or(0, |set| set.len() as u64))
    }

    async fn empty_rooms(&self, rooms: &[String]) -> StoreResult<()> {
        if rooms.is_empty() {
            return Ok(());
        }

        let keys = self.keyspace();
        self.backend.with_state(|state| {
            for room in rooms {
                state.drain_into(&keys.room_key(room), |id| keys.spark_key(id), room);
            }
        })?;

        tracing::debug!(rooms = ?rooms, "Rooms emptied");
        Ok(())
    }

    async fn remove_connections(&self, connection_ids: &[String]) -> StoreResult<()> {
        if connection_ids.is_empty() {
            return Ok(());
        }

        let keys = self.keyspace();
        self.backend.with_state(|state| {
            for id in connection_ids {
                state.drain_into(&keys.spark_key(id), |room| keys.room_key(room), id);
            }
        })?;

        tracing::debug!(count = connection_ids.len(), "Connections removed");
        Ok(())
    }

    async fn clear(&self) -> StoreResult<u64> {
        let keys = self.keyspace();
        let deleted = self.backend.with_state(|state| {
            let found = state.keys_with_prefix(keys.prefix());
            for key in &found {
                state.sets.remove(key);
            }
            found.len() as u64
        })?;

        tracing::info!(namespace = %keys.namespace(), deleted, "Namespace cleared");
        Ok(deleted)
    }

    async fn set_namespace(&self, namespace: &str) -> StoreResult<()> {
        let keyspace = Keyspace::new(namespace)?;
        *self.keyspace.write() = keyspace;

        tracing::info!(namespace = %namespace, "Namespace changed");
        Ok(())
    }
}
