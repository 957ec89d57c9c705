//! Redis-based key-value backend.
//!
//! Uses a synchronous Redis connection; every key is stored under a fixed
//! namespace so enumeration can `SCAN` only this service's keys.

use std::sync::{Mutex, MutexGuard};

use redis::Commands;

use super::backend::{KeyValueBackend, StoreError, StoreResult};

/// Redis-based key-value backend.
///
/// Keys are stored as `{namespace}{key}`.
pub struct RedisBackend {
    /// Single synchronous connection
    connection: Mutex<redis::Connection>,

    /// Namespace prepended to every key
    namespace: String,
}

impl RedisBackend {
    /// Connect to Redis at `url`.
    pub fn connect(url: &str, namespace: impl Into<String>) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_connection()?;

        Ok(Self {
            connection: Mutex::new(connection),
            namespace: namespace.into(),
        })
    }

    /// Generate the Redis key for a store key.
    fn redis_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, redis::Connection>> {
        self.connection
            .lock()
            .map_err(|_| StoreError::Unavailable("Redis connection lock poisoned".to_string()))
    }
}

impl KeyValueBackend for RedisBackend {
    fn backend_type(&self) -> &'static str {
        "redis"
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.lock()?;
        Ok(conn.get(self.redis_key(key))?)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.lock()?;
        conn.set::<_, _, ()>(self.redis_key(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.lock()?;
        conn.del::<_, ()>(self.redis_key(key))?;
        Ok(())
    }

    fn entries(&self, predicate: &dyn Fn(&str) -> bool) -> StoreResult<Vec<(String, String)>> {
        let mut conn = self.lock()?;
        let pattern = format!("{}*", self.namespace);

        let keys: Vec<String> = conn.scan_match::<_, String>(pattern)?.collect();

        let mut entries = Vec::new();
        for redis_key in keys {
            let key = match redis_key.strip_prefix(&self.namespace) {
                Some(key) => key.to_string(),
                None => continue,
            };
            if !predicate(&key) {
                continue;
            }

            // A key can vanish between SCAN and GET
            let value: Option<String> = conn.get(&redis_key)?;
            if let Some(value) = value {
                entries.push((key, value));
            }
        }

        tracing::debug!(
            namespace = %self.namespace,
            matched = entries.len(),
            "Enumerated Redis entries"
        );

        Ok(entries)
    }
}
