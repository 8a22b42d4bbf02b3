//! Session-scoped cache storage.
//!
//! Values are kept in serialized form, the same shape a browser session store
//! would hold, so the store stays ignorant of the domain types written into it.
//! A value that fails to encode or decode degrades to a miss.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

struct StoredEntry {
    value: Value,
    stored_at: Instant,
}

/// Keyed store with lazy, per-key-class expiry.
///
/// Entries are overwritten on `set` and treated as misses once older than the
/// TTL of their key class. Expired entries stay in the map until overwritten or
/// cleared.
pub struct CacheStore {
    config: CacheConfig,
    entries: RwLock<HashMap<CacheKey, StoredEntry>>,
}

impl CacheStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store `value` under `key`, stamping it with the current instant.
    pub fn set<T: Serialize + ?Sized>(&self, key: CacheKey, value: &T) {
        if !self.config.enabled {
            debug!(key = key.as_str(), "Cache write skipped: cache disabled");
            return;
        }

        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    key = key.as_str(),
                    error = %err,
                    "Failed to encode cache value, write skipped"
                );
                return;
            }
        };

        rw_write(&self.entries, SOURCE, "set").insert(
            key,
            StoredEntry {
                value,
                stored_at: Instant::now(),
            },
        );
        counter!("inkchain_cache_store_total", "key" => key.as_str()).increment(1);
    }

    /// Read a fresh value for `key`.
    ///
    /// Returns `None` when the entry is absent, older than its TTL, or does not
    /// decode into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: CacheKey) -> Option<T> {
        if !self.config.enabled {
            return None;
        }

        let ttl = self.config.ttl_for(key);
        let entries = rw_read(&self.entries, SOURCE, "get");
        let Some(entry) = entries.get(&key) else {
            counter!("inkchain_cache_miss_total", "key" => key.as_str()).increment(1);
            debug!(key = key.as_str(), "Cache miss");
            return None;
        };

        let age = entry.stored_at.elapsed();
        if age > ttl {
            counter!("inkchain_cache_expired_total", "key" => key.as_str()).increment(1);
            debug!(
                key = key.as_str(),
                age_ms = age.as_millis() as u64,
                "Cache entry expired"
            );
            return None;
        }

        match T::deserialize(&entry.value) {
            Ok(value) => {
                counter!("inkchain_cache_hit_total", "key" => key.as_str()).increment(1);
                debug!(key = key.as_str(), "Cache hit");
                Some(value)
            }
            Err(err) => {
                counter!("inkchain_cache_miss_total", "key" => key.as_str()).increment(1);
                warn!(
                    key = key.as_str(),
                    error = %err,
                    "Cached value did not decode, treating as miss"
                );
                None
            }
        }
    }

    /// Age of the entry under `key`, expired or not.
    pub fn age(&self, key: CacheKey) -> Option<Duration> {
        rw_read(&self.entries, SOURCE, "age")
            .get(&key)
            .map(|entry| entry.stored_at.elapsed())
    }

    /// Whether `key` holds an entry that `get` would currently serve.
    pub fn contains_fresh(&self, key: CacheKey) -> bool {
        self.config.enabled
            && self
                .age(key)
                .is_some_and(|age| age <= self.config.ttl_for(key))
    }

    pub fn clear(&self, key: CacheKey) {
        rw_write(&self.entries, SOURCE, "clear").remove(&key);
        debug!(key = key.as_str(), "Cache entry cleared");
    }

    pub fn clear_all(&self) {
        rw_write(&self.entries, SOURCE, "clear_all").clear();
        debug!("Cache cleared");
    }
}
