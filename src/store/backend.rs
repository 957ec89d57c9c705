//! Backend trait for the host key-value service.
//!
//! This module defines the abstraction layer for persistence backends,
//! allowing different storage implementations (memory, Redis, etc.) to be
//! used interchangeably behind the `ValueStore`.

use thiserror::Error;

/// Errors that can occur during key-value backend operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Redis operation failed
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend is temporarily unavailable
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Expiry window is zero or beyond the calendar
    #[error("Invalid value TTL: {0} seconds")]
    InvalidTtl(u64),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Opaque string key-value service supplied by the host.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so the runtime owning them can be
/// moved onto the event-loop task.
///
/// # Error Handling
///
/// All operations return `StoreResult`. Callers in this crate treat every
/// failure as "no stored value" or a dropped write.
pub trait KeyValueBackend: Send + Sync {
    /// Backend type identifier
    fn backend_type(&self) -> &'static str;

    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// List every `(key, value)` pair whose key satisfies `predicate`.
    fn entries(&self, predicate: &dyn Fn(&str) -> bool) -> StoreResult<Vec<(String, String)>>;
}
