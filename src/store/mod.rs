//! Persistence for reader-supplied placeholder values.
//!
//! This module provides:
//! - `KeyValueBackend`: the host key-value service abstraction
//! - Memory (`DashMap`) and Redis implementations with a config-driven factory
//! - `ValueStore`: prefix scoping plus a sliding 7-day expiry per entry

mod backend;
mod factory;
mod memory_backend;
mod redis_backend;
mod value_store;

pub use backend::{KeyValueBackend, StoreError, StoreResult};
pub use factory::create_store_backend;
pub use memory_backend::MemoryBackend;
pub use redis_backend::RedisBackend;
pub use value_store::{StoredValue, ValueStore};
