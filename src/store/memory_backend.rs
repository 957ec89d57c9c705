//! In-memory key-value backend using DashMap.
//!
//! Values live only as long as the process; this is the default backend and
//! the one used by tests.

use dashmap::DashMap;

use super::backend::{KeyValueBackend, StoreResult};

/// In-memory key-value backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn entries(&self, predicate: &dyn Fn(&str) -> bool) -> StoreResult<Vec<(String, String)>> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| predicate(entry.key()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }
}
