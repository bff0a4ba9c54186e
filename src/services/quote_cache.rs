//! In-memory key/value cache with per-entry expiry.
//!
//! Entries are evicted lazily: on `get` for the key asked for, and on every
//! `set` for anything already expired. There is no background sweep. Uses
//! `DashMap` so concurrent readers and writers never block each other for
//! long. Time comes from `tokio::time::Instant`, so tests can pause it.

use std::{hash::Hash, time::Duration};

use dashmap::DashMap;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

pub struct QuoteCache<K, V> {
    entries: DashMap<K, Entry<V>>,
}

impl<K, V> QuoteCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Last write wins for concurrent sets on the same key.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();

        // expired entries under any key go on every insert
        self.entries.retain(|_, e| now <= e.expires_at);
        self.entries.insert(key, Entry { value, expires_at: now + ttl });
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if now <= entry.expires_at {
                return Some(entry.value.clone());
            }
        }

        // Re-check under the write lock so a fresh concurrent `set` survives.
        self.entries.remove_if(key, |_, e| now > e.expires_at);
        None
    }

    pub fn delete(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Entry count, including expired entries nobody has asked for yet.
    pub fn size(&self) -> usize {
        self.entries.len()
    }
}

impl<K, V> Default for QuoteCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
