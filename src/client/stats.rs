//! Local Client Statistics
//!
//! Hit, miss, eviction and expiry counters for the bounded in-process client.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a live record
    pub hits: u64,
    /// Reads that found nothing or an expired record
    pub misses: u64,
    /// Records dropped to make room under `max_items`
    pub evictions: u64,
    /// Records dropped lazily because they were read after expiry
    pub expirations: u64,
    /// Writes refused for exceeding `max_size_bytes`
    pub rejected_writes: u64,
    /// Records currently held, expired-but-unread ones included
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 before any read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Counts a lazy expiry; the read that found it is also a miss.
    pub fn record_expiration(&mut self) {
        self.expirations += 1;
        self.misses += 1;
    }

    pub fn record_rejected_write(&mut self) {
        self.rejected_writes += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
