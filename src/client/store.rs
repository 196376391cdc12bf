//! Local Store Module
//!
//! Synchronous engine behind [`LocalClient`](super::LocalClient): a HashMap of
//! records with LRU tracking and lazy, read-time expiry.

use std::collections::HashMap;

use tracing::debug;

use crate::client::{current_timestamp_ms, CacheStats, LruTracker, Record};
use crate::config::LocalClientConfig;
use crate::error::{CacheError, Result};

// == Local Store ==
/// Bounded record storage with LRU eviction and per-record TTL.
///
/// Capacity and expiry are independent: a live record may be evicted by LRU
/// pressure, and an expired record keeps its slot until it is read, deleted
/// or evicted.
#[derive(Debug)]
pub struct LocalStore {
    records: HashMap<String, Record>,
    lru: LruTracker,
    stats: CacheStats,
    ttl_seconds: i64,
    max_items: usize,
    max_size_bytes: usize,
}

impl LocalStore {
    // == Constructor ==
    /// Creates an empty store. A `max_items` of zero is treated as one.
    pub fn new(config: &LocalClientConfig) -> Self {
        Self {
            records: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            ttl_seconds: config.ttl_seconds,
            max_items: config.max_items.max(1),
            max_size_bytes: config.max_size_bytes,
        }
    }

    // == Set ==
    /// Stores a value under `key`, resetting its TTL and recency.
    ///
    /// Values larger than `max_size_bytes` are rejected with no state change.
    /// Inserting a new key at capacity evicts the least recently used key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let size = Record::approximate_size(value);
        if size > self.max_size_bytes {
            self.stats.record_rejected_write();
            return Err(CacheError::SizeExceeded {
                size,
                max: self.max_size_bytes,
            });
        }

        if !self.records.contains_key(key) {
            while self.records.len() >= self.max_items {
                match self.lru.evict_oldest() {
                    Some(evicted) => {
                        self.records.remove(&evicted);
                        self.stats.record_eviction();
                        debug!(key = %evicted, "evicted least recently used record");
                    }
                    None => break,
                }
            }
        }

        self.records
            .insert(key.to_string(), Record::new(value.to_string(), self.ttl_seconds));
        self.lru.touch(key);
        self.stats.set_total_entries(self.records.len());

        Ok(())
    }

    // == Get ==
    /// Returns the live value for `key`.
    ///
    /// An expired record is removed as a side effect and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let now = current_timestamp_ms();

        let expired = match self.records.get(key) {
            None => {
                self.stats.record_miss();
                return None;
            }
            Some(record) => record.is_expired_at(now),
        };

        if expired {
            self.remove(key);
            self.stats.record_expiration();
            debug!(key = %key, "dropped expired record on read");
            return None;
        }

        self.lru.touch(key);
        self.stats.record_hit();
        self.records.get(key).map(|record| record.value.clone())
    }

    // == Delete ==
    /// Removes `key` if present; absent keys are a no-op.
    pub fn delete(&mut self, key: &str) {
        self.remove(key);
    }

    fn remove(&mut self, key: &str) {
        if self.records.remove(key).is_some() {
            self.lru.remove(key);
            self.stats.set_total_entries(self.records.len());
        }
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.records.len());
        stats
    }

    /// Number of records held, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a record exists for `key`, without touching recency or expiry.
    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }
}
