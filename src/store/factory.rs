//! Key-value backend factory

use std::sync::Arc;

use crate::config::StoreConfig;

use super::backend::KeyValueBackend;
use super::memory_backend::MemoryBackend;
use super::redis_backend::RedisBackend;

/// Create a key-value backend based on configuration.
///
/// Returns the appropriate backend implementation based on the `backend` setting:
/// - `"redis"`: Returns a `RedisBackend` if the server is reachable
/// - `"memory"` (default): Returns a `MemoryBackend`
///
/// An unreachable Redis server falls back to memory so that rendering never
/// waits on persistence.
pub fn create_store_backend(config: &StoreConfig) -> Arc<dyn KeyValueBackend> {
    match config.backend.as_str() {
        "redis" => match RedisBackend::connect(&config.redis_url, config.redis_namespace.clone()) {
            Ok(backend) => {
                tracing::info!(
                    backend = "redis",
                    namespace = %config.redis_namespace,
                    "Creating Redis store backend"
                );
                Arc::new(backend)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Redis backend requested but connection failed, falling back to memory"
                );
                Arc::new(MemoryBackend::new())
            }
        },
        _ => {
            tracing::info!(backend = "memory", "Creating memory store backend");
            Arc::new(MemoryBackend::new())
        }
    }
}
