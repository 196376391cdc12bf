//! Redis-backed client.
//!
//! Connectivity is advisory: while the connection is not ready every
//! operation returns a neutral result instead of an error, so a store outage
//! never turns into an application outage.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{
    AsyncCommands, Client, ConnectionAddr, ConnectionInfo, ErrorKind, RedisConnectionInfo,
    RedisError, RedisResult,
};
use tokio::sync::{watch, Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::StorageClient;
use crate::config::RemoteClientConfig;
use crate::error::Result;

/// Delay before reconnect attempt N (1-based), or `None` to give up.
pub type RetryPolicy = Arc<dyn Fn(u32) -> Option<Duration> + Send + Sync>;
/// Invoked every time a connection becomes ready.
pub type ConnectObserver = Arc<dyn Fn() + Send + Sync>;
/// Invoked on every failed connection attempt and transport error.
pub type ErrorObserver = Arc<dyn Fn(&RedisError) + Send + Sync>;

/// Linear backoff: `min(attempt * base, max)`, retried forever.
pub fn default_retry_policy(base: Duration, max: Duration) -> RetryPolicy {
    Arc::new(move |attempt: u32| Some(base.saturating_mul(attempt).min(max)))
}

// == Connection State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
}

// == Hooks ==
/// Reconnect policy and connection observers for a [`RemoteClient`].
#[derive(Clone)]
pub struct RemoteHooks {
    pub retry_policy: RetryPolicy,
    pub on_connect: ConnectObserver,
    pub on_error: ErrorObserver,
}

impl RemoteHooks {
    /// Default hooks using the backoff delays from `config`.
    pub fn for_config(config: &RemoteClientConfig) -> Self {
        let target = format!("{}:{}", config.host, config.port);
        let error_target = target.clone();
        Self {
            retry_policy: default_retry_policy(
                Duration::from_millis(config.retry_base_delay_ms),
                Duration::from_millis(config.retry_max_delay_ms),
            ),
            on_connect: Arc::new(move || info!(server = %target, "connected to redis server")),
            on_error: Arc::new(move |err: &RedisError| {
                warn!(server = %error_target, error = %err, "redis connection error")
            }),
        }
    }

    pub fn with_retry_policy(
        mut self,
        policy: impl Fn(u32) -> Option<Duration> + Send + Sync + 'static,
    ) -> Self {
        self.retry_policy = Arc::new(policy);
        self
    }

    pub fn on_connect(mut self, observer: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Arc::new(observer);
        self
    }

    pub fn on_error(mut self, observer: impl Fn(&RedisError) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(observer);
        self
    }
}

impl Default for RemoteHooks {
    fn default() -> Self {
        Self::for_config(&RemoteClientConfig::default())
    }
}

impl fmt::Debug for RemoteHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteHooks").finish_non_exhaustive()
    }
}

/// A live connection tagged with the generation it was opened in.
type Tagged = (u64, MultiplexedConnection);

/// State shared between the client handle and its supervisor task.
struct Shared {
    state: watch::Sender<ConnectionState>,
    connection: RwLock<Option<Tagged>>,
    /// Bumped every time a new connection becomes ready
    generation: AtomicU64,
    lost: Notify,
    hooks: RemoteHooks,
}

impl Shared {
    fn new(hooks: RemoteHooks) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            state,
            connection: RwLock::new(None),
            generation: AtomicU64::new(0),
            lost: Notify::new(),
            hooks,
        }
    }

    /// Publishes `conn` as the current connection and returns its generation.
    async fn install(&self, conn: MultiplexedConnection) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *self.connection.write().await = Some((generation, conn));
        self.state.send_replace(ConnectionState::Ready);
        generation
    }

    /// Moves `Ready -> Disconnected` once per connection and wakes the
    /// supervisor. Errors that are not transport failures leave the state
    /// alone, as do errors from a connection that has since been replaced.
    fn report(&self, generation: u64, err: &RedisError) {
        let transport = err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout();
        if !transport {
            warn!(error = %err, "redis command failed");
            return;
        }
        if generation != self.generation.load(Ordering::Acquire) {
            debug!(error = %err, "ignoring error from a replaced redis connection");
            return;
        }

        let dropped = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Ready {
                *state = ConnectionState::Disconnected;
                true
            } else {
                false
            }
        });
        if dropped {
            (self.hooks.on_error)(err);
            self.lost.notify_one();
        }
    }
}

// == Remote Client ==
/// [`StorageClient`] over a Redis server with native key expiry.
///
/// Construction spawns a supervisor task on the current tokio runtime that
/// connects, and reconnects after failures following the retry policy.
/// Dropping the client stops the supervisor.
pub struct RemoteClient {
    shared: Arc<Shared>,
    ttl_seconds: i64,
    config: RemoteClientConfig,
    supervisor: JoinHandle<()>,
}

impl RemoteClient {
    /// Creates a client with default hooks. Must be called within a tokio runtime.
    pub fn new(config: RemoteClientConfig) -> Self {
        let hooks = RemoteHooks::for_config(&config);
        Self::with_hooks(config, hooks)
    }

    /// Creates a client with caller-supplied retry policy and observers.
    pub fn with_hooks(config: RemoteClientConfig, hooks: RemoteHooks) -> Self {
        let shared = Arc::new(Shared::new(hooks));

        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                db: config.db,
                password: config.password.clone(),
                ..Default::default()
            },
        };
        let supervisor = match Client::open(info) {
            Ok(client) => tokio::spawn(supervise(
                client,
                shared.clone(),
                config.connect_timeout(),
            )),
            Err(err) => {
                (shared.hooks.on_error)(&err);
                tokio::spawn(async {})
            }
        };

        Self {
            shared,
            ttl_seconds: config.ttl_seconds,
            config,
            supervisor,
        }
    }

    pub fn config(&self) -> &RemoteClientConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Waits until the connection is ready or `timeout` elapses.
    ///
    /// Returns whether the client is available.
    pub async fn wait_until_available(&self, timeout: Duration) -> bool {
        let mut state = self.shared.state.subscribe();
        let ready = state.wait_for(|state| *state == ConnectionState::Ready);
        let available = matches!(tokio::time::timeout(timeout, ready).await, Ok(Ok(_)));
        available
    }

    async fn connection(&self) -> Option<Tagged> {
        if !self.is_available() {
            return None;
        }
        self.shared.connection.read().await.clone()
    }
}

impl Drop for RemoteClient {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

impl fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteClient")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

#[async_trait]
impl StorageClient for RemoteClient {
    async fn get(&self, key: &str) -> Option<String> {
        let (generation, mut conn) = self.connection().await?;
        let result: RedisResult<Option<String>> = conn.get(key).await;
        match result {
            Ok(value) => value,
            Err(err) => {
                self.shared.report(generation, &err);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let Some((generation, mut conn)) = self.connection().await else {
            return Ok(());
        };

        // SET EX rejects non-positive expiries; such a record is gone at once.
        let outcome: RedisResult<()> = if self.ttl_seconds <= 0 {
            conn.del(key).await
        } else {
            conn.set_ex(key, value, self.ttl_seconds as u64).await
        };
        if let Err(err) = outcome {
            self.shared.report(generation, &err);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) {
        let Some((generation, mut conn)) = self.connection().await else {
            return;
        };
        let outcome: RedisResult<()> = conn.del(key).await;
        if let Err(err) = outcome {
            self.shared.report(generation, &err);
        }
    }

    fn is_available(&self) -> bool {
        self.state() == ConnectionState::Ready
    }
}

// == Supervisor ==
/// Drives `Disconnected -> Connecting -> Ready` and back, forever or until
/// the retry policy gives up.
async fn supervise(client: Client, shared: Arc<Shared>, connect_timeout: Duration) {
    let mut failures: u32 = 0;

    loop {
        shared.state.send_replace(ConnectionState::Connecting);

        let attempt =
            tokio::time::timeout(connect_timeout, client.get_multiplexed_async_connection()).await;
        let result = attempt.unwrap_or_else(|_| {
            Err(RedisError::from((ErrorKind::IoError, "connection attempt timed out")))
        });

        match result {
            Ok(conn) => {
                let generation = shared.install(conn).await;
                debug!(generation, "redis connection ready");
                failures = 0;
                (shared.hooks.on_connect)();

                shared.lost.notified().await;
                *shared.connection.write().await = None;
                debug!("redis connection lost, reconnecting");
            }
            Err(err) => {
                shared.state.send_replace(ConnectionState::Disconnected);
                (shared.hooks.on_error)(&err);
                failures = failures.saturating_add(1);

                match (shared.hooks.retry_policy)(failures) {
                    Some(delay) => {
                        debug!(
                            attempt = failures,
                            delay_ms = delay.as_millis() as u64,
                            "retrying redis connection"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        warn!(attempts = failures, "giving up on redis connection");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Nothing listens on port 1, so connection attempts are refused.
    fn unreachable_config() -> RemoteClientConfig {
        RemoteClientConfig::new("127.0.0.1", 1).with_connect_timeout(Duration::from_millis(500))
    }

    async fn wait_for_errors(errors: &AtomicUsize, at_least: usize) {
        for _ in 0..50 {
            if errors.load(Ordering::SeqCst) >= at_least {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[test]
    fn test_default_retry_policy_backoff() {
        let policy = default_retry_policy(Duration::from_millis(500), Duration::from_secs(20));

        assert_eq!(policy(1), Some(Duration::from_millis(500)));
        assert_eq!(policy(2), Some(Duration::from_millis(1000)));
        assert_eq!(policy(40), Some(Duration::from_secs(20)));
        assert_eq!(policy(u32::MAX), Some(Duration::from_secs(20)));
    }

    #[tokio::test]
    async fn test_unreachable_server_degrades_to_no_op() {
        let errors = Arc::new(AtomicUsize::new(0));
        let seen = errors.clone();
        let hooks = RemoteHooks::for_config(&unreachable_config())
            .with_retry_policy(|_| Some(Duration::from_millis(50)))
            .on_error(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });

        let client = RemoteClient::with_hooks(unreachable_config(), hooks);
        wait_for_errors(&errors, 1).await;

        assert!(errors.load(Ordering::SeqCst) >= 1);
        assert!(!client.is_available());
        assert_eq!(client.get("k").await, None);
        assert!(client.set("k", "v").await.is_ok());
        client.delete("k").await;
        assert_eq!(client.get("k").await, None);
    }

    #[tokio::test]
    async fn test_retry_policy_can_give_up() {
        let errors = Arc::new(AtomicUsize::new(0));
        let seen = errors.clone();
        let hooks = RemoteHooks::for_config(&unreachable_config())
            .with_retry_policy(|_| None)
            .on_error(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });

        let client = RemoteClient::with_hooks(unreachable_config(), hooks);
        wait_for_errors(&errors, 1).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_wait_until_available_times_out() {
        let hooks = RemoteHooks::for_config(&unreachable_config()).on_error(|_| {});
        let client = RemoteClient::with_hooks(unreachable_config(), hooks);

        assert!(!client.wait_until_available(Duration::from_millis(200)).await);
    }

    fn dropped_connection() -> RedisError {
        RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ))
    }

    fn counting_shared(errors: Arc<AtomicUsize>) -> Shared {
        let hooks = RemoteHooks::default().on_error(move |_| {
            errors.fetch_add(1, Ordering::SeqCst);
        });
        Shared::new(hooks)
    }

    #[test]
    fn test_transport_error_disconnects_current_generation() {
        let errors = Arc::new(AtomicUsize::new(0));
        let shared = counting_shared(errors.clone());
        shared.generation.store(1, Ordering::SeqCst);
        shared.state.send_replace(ConnectionState::Ready);

        shared.report(1, &dropped_connection());
        shared.report(1, &dropped_connection());

        assert_eq!(*shared.state.borrow(), ConnectionState::Disconnected);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_late_error_from_replaced_connection_is_ignored() {
        let errors = Arc::new(AtomicUsize::new(0));
        let shared = counting_shared(errors.clone());
        // An operation still holds the generation 1 connection after a reconnect
        shared.generation.store(2, Ordering::SeqCst);
        shared.state.send_replace(ConnectionState::Ready);

        shared.report(1, &dropped_connection());

        assert_eq!(*shared.state.borrow(), ConnectionState::Ready);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_server_error_keeps_connection_ready() {
        let errors = Arc::new(AtomicUsize::new(0));
        let shared = counting_shared(errors.clone());
        shared.generation.store(1, Ordering::SeqCst);
        shared.state.send_replace(ConnectionState::Ready);

        let wrong_type = RedisError::from((ErrorKind::TypeError, "WRONGTYPE"));
        shared.report(1, &wrong_type);

        assert_eq!(*shared.state.borrow(), ConnectionState::Ready);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wait_until_available_sees_ready_state() {
        let hooks = RemoteHooks::for_config(&unreachable_config())
            .with_retry_policy(|_| None)
            .on_error(|_| {});
        let client = RemoteClient::with_hooks(unreachable_config(), hooks);
        client.shared.state.send_replace(ConnectionState::Ready);

        assert!(client.wait_until_available(Duration::from_millis(200)).await);
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_get_delete() {
        let connects = Arc::new(AtomicUsize::new(0));
        let seen = connects.clone();
        let config = RemoteClientConfig::default().with_ttl_seconds(60);
        let hooks = RemoteHooks::for_config(&config).on_connect(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let client = RemoteClient::with_hooks(config, hooks);

        assert!(client.wait_until_available(Duration::from_secs(5)).await);
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        client.set("rememcache-test:k", "v").await.unwrap();
        assert_eq!(client.get("rememcache-test:k").await, Some("v".to_string()));

        client.delete("rememcache-test:k").await;
        assert_eq!(client.get("rememcache-test:k").await, None);
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_non_positive_ttl_is_absent_immediately() {
        let client = RemoteClient::new(RemoteClientConfig::default().with_ttl_seconds(0));
        assert!(client.wait_until_available(Duration::from_secs(5)).await);

        client.set("rememcache-test:zero", "v").await.unwrap();
        assert_eq!(client.get("rememcache-test:zero").await, None);
    }
}
