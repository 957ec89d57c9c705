//! Typed value store with sliding expiry and prefix scoping

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::metrics::StoreMetrics;

use super::backend::{KeyValueBackend, StoreError, StoreResult};

/// Persisted entry shape: `{"expiresAt": ..., "value": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredValue {
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    pub value: String,
}

impl StoredValue {
    /// Create a value expiring `ttl` from now, saturating at the latest
    /// representable instant
    pub fn new(value: impl Into<String>, ttl: Duration) -> Self {
        Self {
            expires_at: Utc::now()
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            value: value.into(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Prefix-scoped, TTL-tracking wrapper over a `KeyValueBackend`.
///
/// The plain methods (`get`, `set`, `remove`, `purge_expired`) never fail:
/// backend errors are logged and treated as "no value" or a dropped write.
/// The `try_*` variants expose the underlying `StoreError`.
#[derive(Clone)]
pub struct ValueStore {
    backend: Arc<dyn KeyValueBackend>,
    prefix: String,
    ttl: Duration,
}

impl ValueStore {
    /// Build a store from configuration.
    ///
    /// Fails with `StoreError::InvalidTtl` when `ttl_seconds` is zero or too
    /// large to place an expiry on the calendar.
    pub fn new(backend: Arc<dyn KeyValueBackend>, config: &StoreConfig) -> StoreResult<Self> {
        let ttl = i64::try_from(config.ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or(StoreError::InvalidTtl(config.ttl_seconds))?;

        Self::with_ttl(backend, config.prefix.clone(), ttl)
    }

    pub fn with_ttl(
        backend: Arc<dyn KeyValueBackend>,
        prefix: impl Into<String>,
        ttl: Duration,
    ) -> StoreResult<Self> {
        let representable = Utc::now().checked_add_signed(ttl).is_some();
        if ttl <= Duration::zero() || !representable {
            return Err(StoreError::InvalidTtl(ttl.num_seconds().max(0) as u64));
        }

        Ok(Self {
            backend,
            prefix: prefix.into(),
            ttl,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueBackend> {
        &self.backend
    }

    /// Full backend key for a store key
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Read a live value, refreshing its expiry.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                StoreMetrics::record_error("get");
                tracing::warn!(key = %key, error = %e, "Value store read failed, using default");
                None
            }
        }
    }

    pub fn try_get(&self, key: &str) -> StoreResult<Option<String>> {
        StoreMetrics::record_operation("get");
        let storage_key = self.storage_key(key);

        let raw = match self.backend.get(&storage_key)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let stored: StoredValue = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignoring undecodable stored value");
                return Ok(None);
            }
        };

        if stored.is_expired(Utc::now()) {
            tracing::debug!(
                key = %key,
                expired_at = %stored.expires_at,
                "Stored value expired"
            );
            return Ok(None);
        }

        // Sliding expiry: a hit pushes the deadline out again
        let refreshed = StoredValue::new(stored.value, self.ttl);
        if let Err(e) = self.write(&storage_key, &refreshed) {
            StoreMetrics::record_error("refresh");
            tracing::warn!(key = %key, error = %e, "Failed to refresh stored value expiry");
        }

        Ok(Some(refreshed.value))
    }

    /// Persist `value` with a fresh expiry (best effort).
    pub fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.try_set(key, value) {
            StoreMetrics::record_error("set");
            tracing::warn!(key = %key, error = %e, "Value store write failed");
        }
    }

    pub fn try_set(&self, key: &str, value: &str) -> StoreResult<()> {
        StoreMetrics::record_operation("set");
        self.write(&self.storage_key(key), &StoredValue::new(value, self.ttl))
    }

    fn write(&self, storage_key: &str, stored: &StoredValue) -> StoreResult<()> {
        let encoded = serde_json::to_string(stored)?;
        self.backend.set(storage_key, &encoded)
    }

    /// Remove a persisted value (best effort).
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.try_remove(key) {
            StoreMetrics::record_error("remove");
            tracing::warn!(key = %key, error = %e, "Value store remove failed");
        }
    }

    pub fn try_remove(&self, key: &str) -> StoreResult<()> {
        StoreMetrics::record_operation("remove");
        self.backend.remove(&self.storage_key(key))
    }

    /// Remove every expired or undecodable entry under the prefix.
    ///
    /// Returns the number of entries removed. A failed listing is logged and
    /// counts as zero; a failed removal is logged and skipped.
    pub fn purge_expired(&self) -> usize {
        match self.try_purge_expired() {
            Ok(removed) => removed,
            Err(e) => {
                StoreMetrics::record_error("purge");
                tracing::warn!(error = %e, "Expired value purge failed");
                0
            }
        }
    }

    pub fn try_purge_expired(&self) -> StoreResult<usize> {
        StoreMetrics::record_operation("purge");
        let prefix = self.prefix.as_str();
        let entries = self.backend.entries(&|key: &str| key.starts_with(prefix))?;
        let now = Utc::now();
        let mut removed = 0;

        for (storage_key, raw) in entries {
            let stale = match serde_json::from_str::<StoredValue>(&raw) {
                Ok(stored) => stored.is_expired(now),
                Err(_) => true,
            };

            if !stale {
                continue;
            }

            match self.backend.remove(&storage_key) {
                Ok(()) => removed += 1,
                Err(e) => {
                    StoreMetrics::record_error("purge");
                    tracing::warn!(key = %storage_key, error = %e, "Failed to purge expired value");
                }
            }
        }

        StoreMetrics::record_purged(removed);
        if removed > 0 {
            tracing::info!(
                removed = removed,
                prefix = %self.prefix,
                "Purged expired placeholder values"
            );
        }

        Ok(removed)
    }
}

impl std::fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStore")
            .field("backend", &self.backend.backend_type())
            .field("prefix", &self.prefix)
            .field("ttl_seconds", &self.ttl.num_seconds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn create_test_store() -> (Arc<MemoryBackend>, ValueStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = ValueStore::new(backend.clone(), &StoreConfig::default()).unwrap();
        (backend, store)
    }

    fn write_raw(backend: &MemoryBackend, key: &str, stored: &StoredValue) {
        backend
            .set(key, &serde_json::to_string(stored).unwrap())
            .unwrap();
    }

    fn read_raw(backend: &MemoryBackend, key: &str) -> Option<StoredValue> {
        backend
            .get(key)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    /// Backend whose every call fails
    struct UnavailableBackend;

    impl KeyValueBackend for UnavailableBackend {
        fn backend_type(&self) -> &'static str {
            "unavailable"
        }

        fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        fn remove(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        fn entries(&self, _predicate: &dyn Fn(&str) -> bool) -> StoreResult<Vec<(String, String)>> {
            Err(StoreError::Unavailable("down".to_string()))
        }
    }

    /// Memory backend whose first removal fails
    struct FlakyRemoveBackend {
        inner: MemoryBackend,
        failed: AtomicBool,
    }

    impl KeyValueBackend for FlakyRemoveBackend {
        fn backend_type(&self) -> &'static str {
            "flaky"
        }

        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StoreResult<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> StoreResult<()> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(StoreError::Unavailable("remove timed out".to_string()));
            }
            self.inner.remove(key)
        }

        fn entries(&self, predicate: &dyn Fn(&str) -> bool) -> StoreResult<Vec<(String, String)>> {
            self.inner.entries(predicate)
        }
    }

    #[test]
    fn test_set_and_get() {
        let (backend, store) = create_test_store();
        store.set("1-2-KEY", "foo");

        assert_eq!(store.get("1-2-KEY"), Some("foo".to_string()));
        assert!(backend.get("d-placeholder-1-2-KEY").unwrap().is_some());
    }

    #[test]
    fn test_entry_encoding() {
        let (backend, store) = create_test_store();
        store.set("1-2-KEY", "foo");

        let raw = backend.get("d-placeholder-1-2-KEY").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["value"], "foo");
        assert!(json["expiresAt"].is_string());
    }

    #[test]
    fn test_remove() {
        let (_, store) = create_test_store();
        store.set("1-2-KEY", "foo");
        store.remove("1-2-KEY");

        assert_eq!(store.get("1-2-KEY"), None);
    }

    #[test]
    fn test_get_refreshes_expiry() {
        let (backend, store) = create_test_store();
        let nearly_expired = StoredValue {
            expires_at: Utc::now() + Duration::minutes(1),
            value: "foo".to_string(),
        };
        write_raw(&backend, "d-placeholder-1-2-KEY", &nearly_expired);

        assert_eq!(store.get("1-2-KEY"), Some("foo".to_string()));

        let refreshed = read_raw(&backend, "d-placeholder-1-2-KEY").unwrap();
        assert!(refreshed.expires_at > Utc::now() + Duration::days(6));
    }

    #[test]
    fn test_expired_value_not_returned_nor_deleted() {
        let (backend, store) = create_test_store();
        let expired = StoredValue {
            expires_at: Utc::now() - Duration::seconds(1),
            value: "foo".to_string(),
        };
        write_raw(&backend, "d-placeholder-1-2-KEY", &expired);

        assert_eq!(store.get("1-2-KEY"), None);
        assert_eq!(read_raw(&backend, "d-placeholder-1-2-KEY"), Some(expired));
    }

    #[test]
    fn test_purge_removes_only_expired_prefixed_entries() {
        let (backend, store) = create_test_store();
        write_raw(
            &backend,
            "d-placeholder-1-2-OLD",
            &StoredValue {
                expires_at: Utc::now() - Duration::days(1),
                value: "old".to_string(),
            },
        );
        store.set("1-2-FRESH", "fresh");
        backend.set("d-placeholder-1-2-BROKEN", "not json").unwrap();
        backend.set("other-app-key", "not json either").unwrap();

        assert_eq!(store.purge_expired(), 2);
        assert!(backend.get("d-placeholder-1-2-OLD").unwrap().is_none());
        assert!(backend.get("d-placeholder-1-2-BROKEN").unwrap().is_none());
        assert!(backend.get("d-placeholder-1-2-FRESH").unwrap().is_some());
        assert!(backend.get("other-app-key").unwrap().is_some());
    }

    #[test]
    fn test_undecodable_value_treated_as_missing() {
        let (backend, store) = create_test_store();
        backend.set("d-placeholder-1-2-KEY", "{garbage").unwrap();

        assert_eq!(store.get("1-2-KEY"), None);
    }

    #[test]
    fn test_unavailable_backend_degrades_gracefully() {
        let store = ValueStore::new(Arc::new(UnavailableBackend), &StoreConfig::default()).unwrap();

        assert_eq!(store.get("1-2-KEY"), None);
        store.set("1-2-KEY", "foo");
        store.remove("1-2-KEY");
        assert_eq!(store.purge_expired(), 0);

        assert!(matches!(
            store.try_get("1-2-KEY"),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn test_purge_continues_past_failed_removal() {
        let backend = Arc::new(FlakyRemoveBackend {
            inner: MemoryBackend::new(),
            failed: AtomicBool::new(false),
        });
        let store = ValueStore::new(backend.clone(), &StoreConfig::default()).unwrap();
        for key in ["A", "B", "C"] {
            write_raw(
                &backend.inner,
                &format!("d-placeholder-1-2-{}", key),
                &StoredValue {
                    expires_at: Utc::now() - Duration::days(1),
                    value: key.to_string(),
                },
            );
        }

        assert_eq!(store.purge_expired(), 2);
        assert_eq!(backend.inner.len(), 1);

        // The entry left behind goes on the next pass
        assert_eq!(store.purge_expired(), 1);
        assert!(backend.inner.is_empty());
    }

    #[test]
    fn test_ttl_out_of_range_rejected() {
        for ttl_seconds in [0, u64::MAX, i64::MAX as u64, 1 << 50] {
            let config = StoreConfig {
                ttl_seconds,
                ..StoreConfig::default()
            };
            assert!(
                matches!(
                    ValueStore::new(Arc::new(MemoryBackend::new()), &config),
                    Err(StoreError::InvalidTtl(_))
                ),
                "ttl_seconds = {}",
                ttl_seconds
            );
        }
    }

    #[test]
    fn test_long_ttl_accepted() {
        let config = StoreConfig {
            ttl_seconds: 100 * 365 * 24 * 60 * 60,
            ..StoreConfig::default()
        };
        let store = ValueStore::new(Arc::new(MemoryBackend::new()), &config).unwrap();

        store.set("1-2-KEY", "foo");
        assert_eq!(store.get("1-2-KEY"), Some("foo".to_string()));
    }

    #[test]
    fn test_stored_value_saturates_expiry() {
        let value = StoredValue::new("foo", Duration::MAX);
        assert_eq!(value.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(!value.is_expired(Utc::now()));
    }

    #[test]
    fn test_stored_value_expiry() {
        let value = StoredValue::new("foo", Duration::seconds(60));
        assert!(!value.is_expired(Utc::now()));
        assert!(value.is_expired(Utc::now() + Duration::seconds(61)));
    }
}
