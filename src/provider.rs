//! Key/Value Provider
//!
//! Namespaced, JSON-typed access to a [`StorageClient`].

use std::fmt;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::client::StorageClient;
use crate::error::{CacheError, Result};

/// Default key prefix for providers over the local backend.
pub const DEFAULT_LOCAL_PREFIX: &str = "rememcache-mem:";
/// Default key prefix for providers over the remote backend.
pub const DEFAULT_REMOTE_PREFIX: &str = "rememcache-redis:";

// == Key Value Provider ==
/// Caching-facing API for application code.
///
/// Every key is stored as `prefix + key`, so providers with different
/// prefixes can share one client without seeing each other's entries. TTL is
/// entirely up to the backing client.
#[derive(Clone)]
pub struct KeyValueProvider {
    client: Arc<dyn StorageClient>,
    prefix: String,
}

impl KeyValueProvider {
    pub fn new(client: Arc<dyn StorageClient>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    pub fn key_prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Reads and decodes the value stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing is stored, which is distinct from a
    /// stored JSON `null` decoding into `T`. Text that does not decode into `T`
    /// is reported as [`CacheError::DeserializationMismatch`].
    pub async fn get_item<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.full_key(key);
        match self.client.get(&full_key).await {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| CacheError::mismatch(full_key, source)),
        }
    }

    /// Encodes `value` as JSON and stores it under `key`.
    pub async fn set_item<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.client.set(&self.full_key(key), &raw).await
    }

    pub async fn delete_item(&self, key: &str) {
        self.client.delete(&self.full_key(key)).await;
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }
}

impl fmt::Debug for KeyValueProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueProvider")
            .field("prefix", &self.prefix)
            .field("available", &self.is_available())
            .finish()
    }
}
