//! Configuration Module
//!
//! Construction-time settings for the storage clients and the rate limiter,
//! loadable from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::factory::Backend;

/// Default key prefix for rate-limit windows.
pub const DEFAULT_RATE_LIMIT_PREFIX: &str = "rememcache-rate-limit:";

/// Reads and parses an environment variable, falling back to `default`.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// == Local Client Config ==
/// Settings for the bounded in-process client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalClientConfig {
    /// Lifetime of each record in seconds (`<= 0` expires immediately)
    pub ttl_seconds: i64,
    /// Maximum number of records before LRU eviction kicks in
    pub max_items: usize,
    /// Maximum approximate size of a single value in bytes
    pub max_size_bytes: usize,
}

impl LocalClientConfig {
    /// Loads the local client settings from the environment.
    ///
    /// # Environment Variables
    /// - `MEM_CACHE_TTL_SECONDS` - Record TTL in seconds (default: 60)
    /// - `MEM_CACHE_MAX_ITEMS` - Maximum records (default: 1000)
    /// - `MEM_CACHE_MAX_SIZE_BYTES` - Maximum value size (default: 5 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl_seconds: env_or("MEM_CACHE_TTL_SECONDS", defaults.ttl_seconds),
            max_items: env_or("MEM_CACHE_MAX_ITEMS", defaults.max_items),
            max_size_bytes: env_or("MEM_CACHE_MAX_SIZE_BYTES", defaults.max_size_bytes),
        }
    }

    pub fn with_ttl_seconds(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_max_size_bytes(mut self, max_size_bytes: usize) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }
}

impl Default for LocalClientConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 60,
            max_items: 1000,
            max_size_bytes: 5 * 1024 * 1024,
        }
    }
}

// == Remote Client Config ==
/// Settings for the Redis-backed client.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteClientConfig {
    pub host: String,
    pub port: u16,
    /// Logical database index
    pub db: i64,
    pub password: Option<String>,
    /// Expiry applied to every write, in seconds
    pub ttl_seconds: i64,
    /// Upper bound on a single connection attempt
    pub connect_timeout_ms: u64,
    /// Backoff step: delay after failure N is `N * retry_base_delay_ms`
    pub retry_base_delay_ms: u64,
    /// Backoff ceiling
    pub retry_max_delay_ms: u64,
}

impl RemoteClientConfig {
    /// Loads the remote client settings from the environment.
    ///
    /// # Environment Variables
    /// - `REDIS_HOST` (default: 127.0.0.1), `REDIS_PORT` (default: 6379)
    /// - `REDIS_DB` (default: 0), `REDIS_PASSWORD` (default: none)
    /// - `REDIS_TTL_SECONDS` - Record TTL in seconds (default: 300)
    /// - `REDIS_CONNECT_TIMEOUT_MS` (default: 5000)
    /// - `REDIS_RETRY_BASE_DELAY_MS` (default: 500), `REDIS_RETRY_MAX_DELAY_MS` (default: 20000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("REDIS_HOST").unwrap_or(defaults.host),
            port: env_or("REDIS_PORT", defaults.port),
            db: env_or("REDIS_DB", defaults.db),
            password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            ttl_seconds: env_or("REDIS_TTL_SECONDS", defaults.ttl_seconds),
            connect_timeout_ms: env_or("REDIS_CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms),
            retry_base_delay_ms: env_or("REDIS_RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms),
            retry_max_delay_ms: env_or("REDIS_RETRY_MAX_DELAY_MS", defaults.retry_max_delay_ms),
        }
    }

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_ttl_seconds(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for RemoteClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            password: None,
            ttl_seconds: 300,
            connect_timeout_ms: 5000,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 20_000,
        }
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for RemoteClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("ttl_seconds", &self.ttl_seconds)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("retry_max_delay_ms", &self.retry_max_delay_ms)
            .finish()
    }
}

// == Rate Limit Config ==
/// Settings for a fixed-window rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Window length in seconds
    pub window_seconds: u64,
    /// Admission ceiling per window
    pub max_requests: u64,
    /// Key namespace for stored windows
    pub prefix: String,
}

impl RateLimitConfig {
    /// Loads the rate limit settings from the environment.
    ///
    /// # Environment Variables
    /// - `RATE_LIMIT_WINDOW_SECONDS` (default: 60)
    /// - `RATE_LIMIT_MAX_REQUESTS` (default: 60)
    /// - `RATE_LIMIT_PREFIX` (default: `rememcache-rate-limit:`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            window_seconds: env_or("RATE_LIMIT_WINDOW_SECONDS", defaults.window_seconds),
            max_requests: env_or("RATE_LIMIT_MAX_REQUESTS", defaults.max_requests),
            prefix: env::var("RATE_LIMIT_PREFIX").unwrap_or(defaults.prefix),
        }
    }

    pub fn with_window_seconds(mut self, window_seconds: u64) -> Self {
        self.window_seconds = window_seconds;
        self
    }

    pub fn with_max_requests(mut self, max_requests: u64) -> Self {
        self.max_requests = max_requests;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            max_requests: 60,
            prefix: DEFAULT_RATE_LIMIT_PREFIX.to_string(),
        }
    }
}

// == Aggregate Config ==
/// Everything the demo runner needs, loaded in one go.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend used by the runner (`CACHE_BACKEND`, default: memory)
    pub backend: Backend,
    pub local: LocalClientConfig,
    pub remote: RemoteClientConfig,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            backend: env_or("CACHE_BACKEND", Backend::default()),
            local: LocalClientConfig::from_env(),
            remote: RemoteClientConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
        }
    }
}
