//! Record Module
//!
//! Defines the unit stored by the local client: a value plus its expiry instant.

use chrono::Utc;

// == Record ==
/// A stored value with its absolute expiration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The stored payload
    pub value: String,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: i64,
}

impl Record {
    // == Constructor ==
    /// Creates a record expiring `ttl_seconds` from now.
    ///
    /// A non-positive TTL yields a record that is already expired.
    pub fn new(value: String, ttl_seconds: i64) -> Self {
        Self {
            value,
            expires_at: current_timestamp_ms().saturating_add(ttl_seconds.saturating_mul(1000)),
        }
    }

    // == Is Expired ==
    /// Checks if the record has expired.
    ///
    /// A record is expired once the current time reaches `expires_at`, so a
    /// zero TTL is never observable.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same as [`Record::is_expired`] against an explicit clock reading.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }

    /// Returns remaining TTL in milliseconds, clamped at zero.
    pub fn ttl_remaining_ms(&self) -> i64 {
        (self.expires_at - current_timestamp_ms()).max(0)
    }

    // == Approximate Size ==
    /// Approximate in-memory size of `value`, counting two bytes per UTF-16
    /// code unit.
    pub fn approximate_size(value: &str) -> usize {
        value.encode_utf16().count() * 2
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
