//! Fixed-Window Rate Limiter
//!
//! Counts requests per subject in windows that restart at the first request
//! made after the previous window has elapsed. Windows are re-anchored at that
//! request, not aligned to a fixed clock grid.
//!
//! The read-modify-write in [`RateLimiter::is_within_limits`] is not atomic:
//! concurrent requests for the same subject may all be admitted past the
//! ceiling. This is a best-effort limiter, not a linearizable counter.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{current_timestamp_ms, StorageClient};
use crate::config::RateLimitConfig;
use crate::error::{CacheError, Result};

// == Rate Window ==
/// Stored counting state for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateWindow {
    /// Requests admitted in the current window
    pub request_count: u64,
    /// Start of the current window (Unix milliseconds)
    pub window_start_timestamp: i64,
}

impl RateWindow {
    pub fn starting_at(now_ms: i64) -> Self {
        Self {
            request_count: 0,
            window_start_timestamp: now_ms,
        }
    }

    /// Whether a window of `window_ms` has fully elapsed at `now_ms`.
    pub fn has_elapsed(&self, now_ms: i64, window_ms: i64) -> bool {
        now_ms.saturating_sub(self.window_start_timestamp) >= window_ms
    }
}

// == Rate Limiter ==
/// Per-subject admission decisions over a [`StorageClient`].
#[derive(Clone)]
pub struct RateLimiter {
    client: Arc<dyn StorageClient>,
    prefix: String,
    window_ms: i64,
    max_requests: u64,
}

impl RateLimiter {
    pub fn new(client: Arc<dyn StorageClient>, config: RateLimitConfig) -> Self {
        Self {
            client,
            prefix: config.prefix,
            window_ms: i64::try_from(config.window_seconds)
                .unwrap_or(i64::MAX)
                .saturating_mul(1000),
            max_requests: config.max_requests,
        }
    }

    pub fn key_prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, subject_id: &str) -> String {
        format!("{}{}", self.prefix, subject_id)
    }

    /// Returns the stored window for `subject_id`, if any.
    pub async fn request_window(&self, subject_id: &str) -> Result<Option<RateWindow>> {
        let key = self.full_key(subject_id);
        match self.client.get(&key).await {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| CacheError::mismatch(key, source)),
        }
    }

    /// Decides whether one more request from `subject_id` is admissible now.
    ///
    /// The window is persisted on every call; a denied request leaves the
    /// count unchanged.
    pub async fn is_within_limits(&self, subject_id: &str) -> Result<bool> {
        let now = current_timestamp_ms();
        let key = self.full_key(subject_id);

        let mut window = self
            .request_window(subject_id)
            .await?
            .unwrap_or_else(|| RateWindow::starting_at(now));

        if window.has_elapsed(now, self.window_ms) {
            window = RateWindow::starting_at(now);
        }

        let admitted = window.request_count < self.max_requests;
        if admitted {
            window.request_count += 1;
        }

        self.client
            .set(&key, &serde_json::to_string(&window)?)
            .await?;

        debug!(
            subject = %subject_id,
            admitted,
            count = window.request_count,
            max = self.max_requests,
            "rate limit decision"
        );
        Ok(admitted)
    }

    /// Forgets `subject_id`'s window so its next request starts a fresh one.
    pub async fn reset(&self, subject_id: &str) {
        self.client.delete(&self.full_key(subject_id)).await;
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("prefix", &self.prefix)
            .field("window_ms", &self.window_ms)
            .field("max_requests", &self.max_requests)
            .finish()
    }
}
