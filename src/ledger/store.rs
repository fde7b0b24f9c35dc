//! In-memory keyed tables.
//!
//! Each entry sits behind its own mutex so two users (or two sessions)
//! never contend; the outer lock is held only to look entries up.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared handle to one entry.
pub type Entry<V> = Arc<Mutex<V>>;

/// Ordered table of independently lockable entries.
pub struct KeyedStore<K, V> {
    entries: RwLock<BTreeMap<K, Entry<V>>>,
}

impl<K: Ord + Clone, V> KeyedStore<K, V> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Look up an entry.
    pub async fn get(&self, key: &K) -> Option<Entry<V>> {
        let entries = self.entries.read().await;
        entries.get(key).cloned()
    }

    /// Look up an entry, creating it with `init` if absent.
    pub async fn get_or_insert_with(&self, key: &K, init: impl FnOnce() -> V) -> Entry<V> {
        if let Some(entry) = self.get(key).await {
            return entry;
        }
        let mut entries = self.entries.write().await;
        entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(init())))
            .clone()
    }

    /// Insert or replace an entry.
    pub async fn insert(&self, key: K, value: V) -> Entry<V> {
        let entry = Arc::new(Mutex::new(value));
        let mut entries = self.entries.write().await;
        entries.insert(key, entry.clone());
        entry
    }

    /// Remove an entry. Outstanding handles stay usable.
    pub async fn remove(&self, key: &K) -> Option<Entry<V>> {
        let mut entries = self.entries.write().await;
        entries.remove(key)
    }

    pub async fn contains(&self, key: &K) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Snapshot of all keys, in order.
    pub async fn keys(&self) -> Vec<K> {
        self.entries.read().await.keys().cloned().collect()
    }
}

impl<K: Ord + Clone, V> Default for KeyedStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
