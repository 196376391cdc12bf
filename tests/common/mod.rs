//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rememcache::{Result, StorageClient};

// == Map Client ==
/// Unbounded, never-expiring stand-in for a remote backend.
#[derive(Debug, Default)]
pub struct MapClient {
    entries: Mutex<HashMap<String, String>>,
    available: bool,
}

impl MapClient {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: true,
        }
    }

    /// A client that reports itself unavailable and drops every write,
    /// mirroring a disconnected remote backend.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StorageClient for MapClient {
    async fn get(&self, key: &str) -> Option<String> {
        if !self.available {
            return None;
        }
        self.entries.lock().unwrap().get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.available {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
