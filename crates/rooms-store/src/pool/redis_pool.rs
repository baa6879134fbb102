//! Redis connection pool using deadpool-redis.
//!
//! Provides a managed pool of Redis connections shared by the membership store
//! and the relay publisher.

use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use rooms_core::StoreError;
use std::collections::HashSet;
use std::sync::Arc;

/// Keys deleted per `DEL` command when clearing a namespace
const DELETE_CHUNK: usize = 500;

/// Redis pool configuration
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    /// Redis connection URL (e.g., `redis://localhost:6379`)
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: usize,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_connections: 16,
        }
    }
}

impl From<&rooms_common::RedisConfig> for RedisPoolConfig {
    fn from(config: &rooms_common::RedisConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections as usize,
        }
    }
}

/// Error type for Redis pool operations
#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error("Failed to create Redis pool: {0}")]
    CreatePool(String),

    #[error("Failed to get connection from pool: {0}")]
    GetConnection(#[from] deadpool_redis::PoolError),

    #[error("Redis command error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl From<RedisPoolError> for StoreError {
    fn from(err: RedisPoolError) -> Self {
        match err {
            RedisPoolError::CreatePool(msg) => Self::Misconfigured(msg),
            RedisPoolError::GetConnection(e) => Self::Unavailable(e.to_string()),
            RedisPoolError::Redis(e) => {
                if e.kind() == redis::ErrorKind::NoScriptError {
                    Self::Script(e.to_string())
                } else if e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() {
                    Self::Unavailable(e.to_string())
                } else {
                    Self::Transport(e.to_string())
                }
            }
        }
    }
}

/// Result type for Redis pool operations
pub type RedisResult<T> = Result<T, RedisPoolError>;

/// Managed Redis connection pool
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
    url: Arc<str>,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("status", &self.pool.status())
            .finish()
    }
}

impl RedisPool {
    /// Create a new Redis pool with the given configuration
    pub fn new(config: RedisPoolConfig) -> RedisResult<Self> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?;

        tracing::info!(
            url = %redact_url(&config.url),
            max_connections = config.max_connections,
            "Redis pool created"
        );

        Ok(Self {
            pool,
            url: Arc::from(config.url.as_str()),
        })
    }

    /// Get a connection from the pool
    pub async fn get(&self) -> RedisResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(RedisPoolError::GetConnection)
    }

    /// URL the pool connects to (needed for dedicated pub/sub connections)
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the current pool status
    #[must_use]
    pub fn status(&self) -> deadpool_redis::Status {
        self.pool.status()
    }

    /// Check if the pool is healthy by pinging Redis
    pub async fn health_check(&self) -> RedisResult<()> {
        let mut conn = self.get().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    /// Scan keys matching a pattern using cursor-based iteration.
    ///
    /// `SCAN` may report a key more than once; the result is deduplicated and
    /// keeps first-seen order.
    pub async fn scan_keys(&self, pattern: &str, count: usize) -> RedisResult<Vec<String>> {
        let mut conn = self.get().await?;
        let mut cursor: u64 = 0;
        let mut seen = HashSet::new();
        let mut all_keys = Vec::new();

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(count)
                .query_async(&mut conn)
                .await?;

            for key in keys {
                if seen.insert(key.clone()) {
                    all_keys.push(key);
                }
            }
            cursor = next_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(all_keys)
    }

    /// Delete keys in chunks, returning how many existed
    pub async fn delete_keys(&self, keys: &[String]) -> RedisResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.get().await?;
        let mut deleted = 0;
        for chunk in keys.chunks(DELETE_CHUNK) {
            let n: u64 = conn.del(chunk).await?;
            deleted += n;
        }
        Ok(deleted)
    }
}

/// Strip credentials from a Redis URL for logging
fn redact_url(url: &str) -> &str {
    url.split('@').next_back().unwrap_or(url)
}

/// Shared Redis pool wrapped in Arc for easy cloning
pub type SharedRedisPool = Arc<RedisPool>;

/// Create a shared Redis pool
pub fn create_shared_pool(config: RedisPoolConfig) -> RedisResult<SharedRedisPool> {
    Ok(Arc::new(RedisPool::new(config)?))
}
