//! rememcache demo runner
//!
//! Exercises a provider and a rate limiter against the backend selected by
//! `CACHE_BACKEND` (memory or redis), configured from the environment.

use std::time::Duration;

use anyhow::Context;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rememcache::{Backend, ClientRegistry, Config};

/// Runs the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the client registry (and wait for Redis when selected)
/// 4. Write and read a structured value, then read it again after 1s
/// 5. Drive the rate limiter past its ceiling, reset it, then wait out the window
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rememcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(backend = %config.backend, "starting rememcache runner");

    let registry = ClientRegistry::with_configs(config.local.clone(), config.remote.clone());

    if config.backend == Backend::Remote {
        let remote = registry.remote_client().await;
        if !remote.wait_until_available(Duration::from_secs(5)).await {
            warn!("redis is not available after 5s; operations will be no-ops");
        }
    }

    run_provider_demo(&registry, config.backend).await?;
    run_rate_limit_demo(&registry, &config).await?;

    info!("runner complete");
    Ok(())
}

async fn run_provider_demo(registry: &ClientRegistry, backend: Backend) -> anyhow::Result<()> {
    let provider = registry.provider(backend, Some("runner:")).await;
    info!(prefix = provider.key_prefix(), "using provider");

    let value = json!({ "now": chrono::Utc::now().timestamp_millis(), "hello": "world" });
    provider
        .set_item("demo-key", &value)
        .await
        .context("writing demo-key")?;
    info!("wrote demo-key");

    let read: Option<serde_json::Value> = provider.get_item("demo-key").await?;
    info!(?read, "read demo-key");

    tokio::time::sleep(Duration::from_secs(1)).await;
    let read: Option<serde_json::Value> = provider.get_item("demo-key").await?;
    info!(?read, "read demo-key after 1s");

    Ok(())
}

async fn run_rate_limit_demo(registry: &ClientRegistry, config: &Config) -> anyhow::Result<()> {
    let limits = config.rate_limit.clone().with_prefix("runner-rl:");
    let window_seconds = limits.window_seconds;
    let max_requests = limits.max_requests;
    let limiter = registry.rate_limiter(config.backend, limits).await;
    info!(window_seconds, max_requests, "using rate limiter");

    for i in 1..=max_requests + 1 {
        let allowed = limiter.is_within_limits("user1").await?;
        info!(request = i, allowed, "rate limit check");
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    limiter.reset("user1").await;
    let allowed = limiter.is_within_limits("user1").await?;
    info!(allowed, "after reset");

    info!("waiting for window to expire");
    tokio::time::sleep(Duration::from_secs(window_seconds + 1)).await;
    let allowed = limiter.is_within_limits("user1").await?;
    info!(allowed, "after window");

    Ok(())
}
