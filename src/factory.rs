//! Client registry and factory
//!
//! Owns the shared client instance per backend and builds providers and rate
//! limiters over them. Callers pass the registry around explicitly; there is
//! no process-global state.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::client::{LocalClient, RemoteClient, RemoteHooks, StorageClient};
use crate::config::{LocalClientConfig, RateLimitConfig, RemoteClientConfig};
use crate::error::CacheError;
use crate::provider::{KeyValueProvider, DEFAULT_LOCAL_PREFIX, DEFAULT_REMOTE_PREFIX};
use crate::rate_limit::RateLimiter;

// == Backend ==
/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Bounded in-process store
    #[default]
    Local,
    /// Redis server
    Remote,
}

impl Backend {
    /// Prefix used by providers when the caller does not pick one.
    pub fn default_prefix(&self) -> &'static str {
        match self {
            Backend::Local => DEFAULT_LOCAL_PREFIX,
            Backend::Remote => DEFAULT_REMOTE_PREFIX,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => write!(f, "memory"),
            Backend::Remote => write!(f, "redis"),
        }
    }
}

impl FromStr for Backend {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" | "local" => Ok(Backend::Local),
            "redis" | "remote" => Ok(Backend::Remote),
            other => Err(CacheError::InvalidConfig(format!(
                "Unknown backend: {}. Valid backends: memory, redis",
                other
            ))),
        }
    }
}

struct RemoteSlot {
    config: RemoteClientConfig,
    hooks: RemoteHooks,
    client: Option<Arc<RemoteClient>>,
}

// == Client Registry ==
/// Shared client instances, one per backend.
///
/// Reconfiguring a backend swaps in a brand new instance: the previous
/// instance and its contents are discarded, never merged. Providers and
/// limiters built earlier keep using the instance they were built with.
pub struct ClientRegistry {
    local: RwLock<Arc<LocalClient>>,
    remote: RwLock<RemoteSlot>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::with_configs(LocalClientConfig::default(), RemoteClientConfig::default())
    }

    /// Builds the local client now; the remote client is created on first use.
    pub fn with_configs(local: LocalClientConfig, remote: RemoteClientConfig) -> Self {
        let hooks = RemoteHooks::for_config(&remote);
        Self {
            local: RwLock::new(Arc::new(LocalClient::new(local))),
            remote: RwLock::new(RemoteSlot {
                config: remote,
                hooks,
                client: None,
            }),
        }
    }

    /// Replaces the shared local client with a fresh, empty one.
    pub async fn configure_local(&self, config: LocalClientConfig) {
        info!(?config, "reconfiguring local client");
        *self.local.write().await = Arc::new(LocalClient::new(config));
    }

    /// Replaces the shared remote client. Must be called within a tokio runtime.
    pub async fn configure_remote(&self, config: RemoteClientConfig, hooks: RemoteHooks) {
        info!(?config, "reconfiguring remote client");
        let client = Arc::new(RemoteClient::with_hooks(config.clone(), hooks.clone()));
        *self.remote.write().await = RemoteSlot {
            config,
            hooks,
            client: Some(client),
        };
    }

    pub async fn local_client(&self) -> Arc<LocalClient> {
        self.local.read().await.clone()
    }

    /// Returns the shared remote client, connecting it on first use.
    pub async fn remote_client(&self) -> Arc<RemoteClient> {
        if let Some(client) = &self.remote.read().await.client {
            return client.clone();
        }

        let mut slot = self.remote.write().await;
        if let Some(client) = &slot.client {
            return client.clone();
        }
        let client = Arc::new(RemoteClient::with_hooks(slot.config.clone(), slot.hooks.clone()));
        slot.client = Some(client.clone());
        client
    }

    pub async fn client(&self, backend: Backend) -> Arc<dyn StorageClient> {
        match backend {
            Backend::Local => self.local_client().await,
            Backend::Remote => self.remote_client().await,
        }
    }

    /// Builds a provider; `None` picks the backend's default prefix.
    pub async fn provider(&self, backend: Backend, prefix: Option<&str>) -> KeyValueProvider {
        let prefix = prefix.unwrap_or(backend.default_prefix());
        KeyValueProvider::new(self.client(backend).await, prefix)
    }

    pub async fn rate_limiter(&self, backend: Backend, config: RateLimitConfig) -> RateLimiter {
        RateLimiter::new(self.client(backend).await, config)
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry").finish_non_exhaustive()
    }
}
