//! Bounded in-process client.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::client::{CacheStats, LocalStore, StorageClient};
use crate::config::LocalClientConfig;
use crate::error::Result;

// == Local Client ==
/// In-process [`StorageClient`] bounded by item count and value size.
///
/// Reads update recency, so every operation takes the same mutex; the store
/// never runs a background sweep.
#[derive(Debug)]
pub struct LocalClient {
    store: Mutex<LocalStore>,
    config: LocalClientConfig,
}

impl LocalClient {
    pub fn new(config: LocalClientConfig) -> Self {
        Self {
            store: Mutex::new(LocalStore::new(&config)),
            config,
        }
    }

    /// Configuration this instance was built with.
    pub fn config(&self) -> &LocalClientConfig {
        &self.config
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.lock().await.stats()
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }
}

impl Default for LocalClient {
    fn default() -> Self {
        Self::new(LocalClientConfig::default())
    }
}

#[async_trait]
impl StorageClient for LocalClient {
    async fn get(&self, key: &str) -> Option<String> {
        self.store.lock().await.get(key)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.store.lock().await.set(key, value)
    }

    async fn delete(&self, key: &str) {
        self.store.lock().await.delete(key);
    }

    fn is_available(&self) -> bool {
        true
    }
}
