//! Namespaced key construction.
//!
//! Every key the adapter touches lives under `<namespace>:`. Connection entries
//! live under `<namespace>:sparks:` and room entries under `<namespace>:rooms:`.

use crate::error::{StoreError, StoreResult};

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "bumblebee";

/// Segment for connection -> rooms sets
const SPARKS_SEGMENT: &str = "sparks:";
/// Segment for room -> connections sets
const ROOMS_SEGMENT: &str = "rooms:";

/// Pattern metacharacters, the key separator and Lua string delimiters
const RESERVED_CHARS: [char; 8] = ['*', '?', '[', ']', '\\', ':', '\'', '"'];

/// Deterministic mapping from (entity, id) to a store key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyspace {
    namespace: String,
    prefix: String,
}

impl Keyspace {
    /// Create a keyspace for a namespace.
    ///
    /// The namespace ends up inside scan patterns, so it may not be empty and may
    /// not contain glob metacharacters. A `:` is also refused so that one
    /// namespace can never be a key prefix of another. Quotes and control
    /// characters would break the string literal the removal scripts embed it in.
    pub fn new(namespace: impl Into<String>) -> StoreResult<Self> {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(StoreError::InvalidNamespace(
                "namespace must not be empty".to_string(),
            ));
        }
        if let Some(c) = namespace
            .chars()
            .find(|c| RESERVED_CHARS.contains(c) || c.is_control())
        {
            return Err(StoreError::InvalidNamespace(format!(
                "namespace {namespace:?} contains reserved character {c:?}"
            )));
        }

        let prefix = format!("{namespace}:");
        Ok(Self { namespace, prefix })
    }

    /// The configured namespace (without the trailing separator)
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key prefix shared by every key in the namespace, e.g. `bumblebee:`
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key holding the rooms of a connection
    #[must_use]
    pub fn spark_key(&self, connection_id: &str) -> String {
        format!("{}{SPARKS_SEGMENT}{connection_id}", self.prefix)
    }

    /// Key holding the connections of a room
    #[must_use]
    pub fn room_key(&self, room: &str) -> String {
        format!("{}{ROOMS_SEGMENT}{room}", self.prefix)
    }

    /// Prefix of every connection key
    #[must_use]
    pub fn spark_prefix(&self) -> String {
        format!("{}{SPARKS_SEGMENT}", self.prefix)
    }

    /// Prefix of every room key
    #[must_use]
    pub fn room_prefix(&self) -> String {
        format!("{}{ROOMS_SEGMENT}", self.prefix)
    }

    /// Scan pattern matching every connection key
    #[must_use]
    pub fn spark_pattern(&self) -> String {
        format!("{}*", self.spark_prefix())
    }

    /// Scan pattern matching every room key
    #[must_use]
    pub fn room_pattern(&self) -> String {
        format!("{}*", self.room_prefix())
    }

    /// Scan pattern matching every key in the namespace
    #[must_use]
    pub fn namespace_pattern(&self) -> String {
        format!("{}*", self.prefix)
    }

    /// Connection id of a connection key, if the key is one
    #[must_use]
    pub fn strip_spark<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix.as_str())?
            .strip_prefix(SPARKS_SEGMENT)
    }

    /// Room name of a room key, if the key is one
    #[must_use]
    pub fn strip_room<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix.as_str())?
            .strip_prefix(ROOMS_SEGMENT)
    }

    /// Whether a key belongs to this namespace
    #[must_use]
    pub fn owns(&self, key: &str) -> bool {
        key.starts_with(self.prefix.as_str())
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            prefix: format!("{DEFAULT_NAMESPACE}:"),
        }
    }
}
