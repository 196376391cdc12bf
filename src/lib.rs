//! rememcache - Pluggable key/value caching and rate limiting
//!
//! A bounded in-memory store with TTL and LRU eviction, a Redis adapter with
//! the same contract, a namespaced JSON provider and a fixed-window rate
//! limiter that run unmodified on either backend.

pub mod client;
pub mod config;
pub mod error;
pub mod factory;
pub mod provider;
pub mod rate_limit;

pub use client::{LocalClient, RemoteClient, RemoteHooks, StorageClient};
pub use config::{Config, LocalClientConfig, RateLimitConfig, RemoteClientConfig};
pub use error::{CacheError, Result};
pub use factory::{Backend, ClientRegistry};
pub use provider::KeyValueProvider;
pub use rate_limit::{RateLimiter, RateWindow};
