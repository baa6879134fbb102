//! Server-side atomic scripts.
//!
//! Both scripts are embedded templates. The namespace prefix is substituted in at
//! registration time, so a namespace change needs a fresh [`ScriptSet`].

use rooms_core::Keyspace;

use crate::pool::{RedisPool, RedisResult};

/// Placeholder replaced by the key prefix (e.g. `bumblebee:`)
pub const NAMESPACE_TOKEN: &str = "{{namespace}}";

const REMOVE_ROOM_TEMPLATE: &str = include_str!("remove_room.lua");
const REMOVE_CONNECTION_TEMPLATE: &str = include_str!("remove_connection.lua");

/// A rendered script and the SHA1 the server knows it by
#[derive(Debug, Clone)]
pub struct AtomicScript {
    name: &'static str,
    source: String,
    hash: String,
}

impl AtomicScript {
    /// Render a template for a keyspace
    #[must_use]
    pub fn render(name: &'static str, template: &str, keyspace: &Keyspace) -> Self {
        let source = template.replace(NAMESPACE_TOKEN, keyspace.prefix());
        let hash = redis::Script::new(&source).get_hash().to_string();
        Self { name, source, hash }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Append `EVALSHA <hash> 1 <key>` to a pipeline
    pub fn invoke(&self, pipe: &mut redis::Pipeline, key: &str) {
        pipe.cmd("EVALSHA").arg(&self.hash).arg(1).arg(key);
    }
}

/// The room-removal and connection-removal scripts for one namespace
#[derive(Debug, Clone)]
pub struct ScriptSet {
    pub remove_room: AtomicScript,
    pub remove_connection: AtomicScript,
}

impl ScriptSet {
    /// Render both scripts for a keyspace
    #[must_use]
    pub fn for_keyspace(keyspace: &Keyspace) -> Self {
        Self {
            remove_room: AtomicScript::render("remove_room", REMOVE_ROOM_TEMPLATE, keyspace),
            remove_connection: AtomicScript::render(
                "remove_connection",
                REMOVE_CONNECTION_TEMPLATE,
                keyspace,
            ),
        }
    }

    /// Register both scripts with `SCRIPT LOAD`.
    ///
    /// Loading is idempotent; it is also how an unreachable store is detected
    /// at construction.
    pub async fn load(&self, pool: &RedisPool) -> RedisResult<()> {
        let mut conn = pool.get().await?;
        for script in [&self.remove_room, &self.remove_connection] {
            let sha: String = redis::cmd("SCRIPT")
                .arg("LOAD")
                .arg(script.source())
                .query_async(&mut conn)
                .await?;

            if sha != script.hash() {
                tracing::warn!(
                    script = script.name(),
                    expected = script.hash(),
                    actual = %sha,
                    "Script hash mismatch"
                );
            }
            tracing::debug!(script = script.name(), sha = %sha, "Script registered");
        }
        Ok(())
    }
}
