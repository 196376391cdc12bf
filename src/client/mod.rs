//! Storage Client Module
//!
//! The minimal text key/value contract shared by every backend, plus its two
//! implementations: a bounded in-process store and a Redis adapter.

mod local;
mod lru;
mod record;
mod remote;
mod stats;
mod store;


use async_trait::async_trait;

use crate::error::Result;

pub use local::LocalClient;
pub use lru::LruTracker;
pub use record::{current_timestamp_ms, Record};
pub use remote::{
    default_retry_policy, ConnectObserver, ConnectionState, ErrorObserver, RemoteClient,
    RemoteHooks, RetryPolicy,
};
pub use stats::CacheStats;
pub use store::LocalStore;

// == Storage Client ==
/// Raw get/set/delete of text payloads with a backend-managed TTL.
///
/// Values crossing this boundary are always text: callers serialize
/// structured data themselves. Implementations are shared behind
/// `Arc<dyn StorageClient>` by providers and rate limiters.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Returns the stored value, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key` with the client's configured TTL.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`; deleting an absent key is not an error.
    async fn delete(&self, key: &str);

    /// Whether the backend can currently serve requests.
    fn is_available(&self) -> bool;
}
