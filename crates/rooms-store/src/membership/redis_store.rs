//! Redis-backed membership index.
//!
//! Key layout:
//! - `<ns>:sparks:<id>` -> set of room names
//! - `<ns>:rooms:<room>` -> set of connection ids

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::AsyncCommands;
use rooms_core::{Keyspace, MembershipStore, StoreResult};
use std::sync::Arc;

use crate::pool::{RedisPoolError, RedisResult, SharedRedisPool};
use crate::scripts::{AtomicScript, ScriptSet};

/// Default `COUNT` hint for key scans
const DEFAULT_SCAN_COUNT: usize = 100;

/// Keyspace and the scripts rendered for it, swapped as one unit
#[derive(Debug)]
struct Registration {
    keyspace: Keyspace,
    scripts: ScriptSet,
}

/// Membership store on a shared Redis server
pub struct RedisMembershipStore {
    pool: SharedRedisPool,
    registration: RwLock<Arc<Registration>>,
    scan_count: usize,
}

impl std::fmt::Debug for RedisMembershipStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisMembershipStore")
            .field("namespace", &self.registration.read().keyspace.namespace())
            .field("scan_count", &self.scan_count)
            .finish()
    }
}

impl RedisMembershipStore {
    /// Validate the namespace and register the atomic scripts.
    ///
    /// Fails when the namespace is invalid or the server cannot be reached.
    pub async fn connect(pool: SharedRedisPool, namespace: &str) -> StoreResult<Self> {
        let registration = register(&pool, namespace).await?;

        tracing::info!(namespace = %namespace, "Redis membership store ready");

        Ok(Self {
            pool,
            registration: RwLock::new(Arc::new(registration)),
            scan_count: DEFAULT_SCAN_COUNT,
        })
    }

    /// Override the `COUNT` hint used by key scans
    #[must_use]
    pub fn with_scan_count(mut self, scan_count: usize) -> Self {
        self.scan_count = scan_count.max(1);
        self
    }

    /// The pool this store issues commands on
    #[must_use]
    pub fn pool(&self) -> &SharedRedisPool {
        &self.pool
    }

    fn registration(&self) -> Arc<Registration> {
        Arc::clone(&self.registration.read())
    }

    /// Run one script per key in a single transaction.
    ///
    /// A `NOSCRIPT` reply means the server's script cache was flushed; the
    /// scripts are loaded again and the batch replayed once. Both scripts are
    /// idempotent so the replay cannot double-apply.
    async fn run_scripts(
        &self,
        select: fn(&ScriptSet) -> &AtomicScript,
        keys: &[String],
    ) -> StoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let registration = self.registration();
        let script = select(&registration.scripts);

        match self.exec_script(script, keys).await {
            Err(RedisPoolError::Redis(e)) if e.kind() == redis::ErrorKind::NoScriptError => {
                tracing::warn!(
                    script = script.name(),
                    "Script missing from server cache, re-registering"
                );
                registration.scripts.load(&self.pool).await?;
                self.exec_script(script, keys).await?;
            }
            result => {
                result?;
            }
        }

        tracing::debug!(script = script.name(), count = keys.len(), "Scripts executed");
        Ok(())
    }

    async fn exec_script(&self, script: &AtomicScript, keys: &[String]) -> RedisResult<Vec<u64>> {
        let mut conn = self.pool.get().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        for key in keys {
            script.invoke(&mut pipe, key);
        }
        Ok(pipe.query_async::<Vec<u64>>(&mut conn).await?)
    }

    async fn scan(&self, pattern: &str) -> StoreResult<Vec<String>> {
        Ok(self.pool.scan_keys(pattern, self.scan_count).await?)
    }
}

/// Build a keyspace and load its scripts
async fn register(pool: &SharedRedisPool, namespace: &str) -> StoreResult<Registration> {
    let keyspace = Keyspace::new(namespace)?;
    let scripts = ScriptSet::for_keyspace(&keyspace);
    scripts.load(pool).await?;
    Ok(Registration { keyspace, scripts })
}

#[async_trait]
impl MembershipStore for RedisMembershipStore {
    fn keyspace(&self) -> Keyspace {
        self.registration.read().keyspace.clone()
    }

    async fn add(&self, connection_id: &str, room: &str) -> StoreResult<()> {
        let keys = self.keyspace();
        let mut conn = self.pool.get().await?;

        redis::pipe()
            .atomic()
            .sadd(keys.spark_key(connection_id), room)
            .ignore()
            .sadd(keys.room_key(room), connection_id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        tracing::debug!(connection_id = %connection_id, room = %room, "Joined room");
        Ok(())
    }

    async fn rooms_of(&self, connection_id: &str) -> StoreResult<Vec<String>> {
        let key = self.keyspace().spark_key(connection_id);
        let mut conn = self.pool.get().await?;
        let rooms: Vec<String> = conn.smembers(key).await.map_err(RedisPoolError::from)?;
        Ok(rooms)
    }

    async fn all_rooms(&self) -> StoreResult<Vec<String>> {
        let keys = self.keyspace();
        let found = self.scan(&keys.room_pattern()).await?;
        Ok(found
            .iter()
            .filter_map(|key| keys.strip_room(key))
            .map(str::to_string)
            .collect())
    }

    async fn all_connections(&self) -> StoreResult<Vec<String>> {
        let keys = self.keyspace();
        let found = self.scan(&keys.spark_pattern()).await?;
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
        let mut pipe = redis::pipe();
        pipe.atomic()
            .srem(keys.spark_key(connection_id), rooms)
            .ignore();
        for room in rooms {
            pipe.srem(keys.room_key(room), connection_id).ignore();
        }

        let mut conn = self.pool.get().await?;
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        tracing::debug!(connection_id = %connection_id, rooms = ?rooms, "Left rooms");
        Ok(())
    }

    async fn clients(&self, room: &str) -> StoreResult<Vec<String>> {
        let key = self.keyspace().room_key(room);
        let mut conn = self.pool.get().await?;
        let ids: Vec<String> = conn.smembers(key).await.map_err(RedisPoolError::from)?;
        Ok(ids)
    }

    async fn clients_of_rooms(&self, rooms: &[String]) -> StoreResult<Vec<Vec<String>>> {
        if rooms.is_empty() {
            return Ok(Vec::new());
        }

        let keys = self.keyspace();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for room in rooms {
            pipe.smembers(keys.room_key(room));
        }

        let mut conn = self.pool.get().await?;
        let members = pipe
            .query_async::<Vec<Vec<String>>>(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;
        Ok(members)
    }

    async fn room_size(&self, room: &str) -> StoreResult<u64> {
        let key = self.keyspace().room_key(room);
        let mut conn = self.pool.get().await?;
        let size: u64 = conn.scard(key).await.map_err(RedisPoolError::from)?;
        Ok(size)
    }

    async fn empty_rooms(&self, rooms: &[String]) -> StoreResult<()> {
        self.run_scripts(|scripts| &scripts.remove_room, rooms).await
    }

    async fn remove_connections(&self, connection_ids: &[String]) -> StoreResult<()> {
        self.run_scripts(|scripts| &scripts.remove_connection, connection_ids)
            .await
    }

    async fn clear(&self) -> StoreResult<u64> {
        let keys = self.keyspace();
        let found = self.scan(&keys.namespace_pattern()).await?;
        let deleted = self.pool.delete_keys(&found).await?;

        tracing::info!(namespace = %keys.namespace(), deleted, "Namespace cleared");
        Ok(deleted)
    }

    async fn set_namespace(&self, namespace: &str) -> StoreResult<()> {
        if self.keyspace().namespace() == namespace {
            return Ok(());
        }

        let registration = register(&self.pool, namespace).await?;
        *self.registration.write() = Arc::new(registration);

        tracing::info!(namespace = %namespace, "Namespace changed, scripts re-registered");
        Ok(())
    }
}
