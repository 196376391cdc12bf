//! Integration Tests for the rate limiter
//!
//! Admission, rollover and reset behaviour over each kind of backend.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MapClient;
use rememcache::{Backend, ClientRegistry, RateLimitConfig, RateLimiter};

fn limits(prefix: &str, max_requests: u64, window_seconds: u64) -> RateLimitConfig {
    RateLimitConfig::default()
        .with_prefix(prefix)
        .with_max_requests(max_requests)
        .with_window_seconds(window_seconds)
}

#[tokio::test]
async fn test_limiters_with_different_prefixes_are_isolated() {
    let registry = ClientRegistry::new();
    let a = registry.rate_limiter(Backend::Local, limits("ra:", 3, 60)).await;
    let b = registry.rate_limiter(Backend::Local, limits("rb:", 1, 60)).await;

    assert!(a.is_within_limits("u").await.unwrap());
    assert!(b.is_within_limits("u").await.unwrap());

    a.is_within_limits("u").await.unwrap();
    a.is_within_limits("u").await.unwrap();
    assert!(!a.is_within_limits("u").await.unwrap());

    // b's counter is untouched by a's traffic
    let window = b.request_window("u").await.unwrap().unwrap();
    assert_eq!(window.request_count, 1);
}

#[tokio::test]
async fn test_honors_max_requests() {
    let registry = ClientRegistry::new();
    let rl = registry.rate_limiter(Backend::Local, limits("r2:", 2, 60)).await;

    assert!(rl.is_within_limits("u1").await.unwrap());
    assert!(rl.is_within_limits("u1").await.unwrap());
    assert!(!rl.is_within_limits("u1").await.unwrap());
}

#[tokio::test]
async fn test_window_rollover_scenario() {
    let registry = ClientRegistry::new();
    let rl = registry.rate_limiter(Backend::Local, limits("rw:", 2, 1)).await;

    let mut decisions = Vec::new();
    for _ in 0..3 {
        decisions.push(rl.is_within_limits("u2").await.unwrap());
    }
    assert_eq!(decisions, vec![true, true, false]);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert!(rl.is_within_limits("u2").await.unwrap());
}

#[tokio::test]
async fn test_reset_after_denial_admits_immediately() {
    let registry = ClientRegistry::new();
    let rl = registry.rate_limiter(Backend::Local, limits("rr:", 1, 60)).await;

    assert!(rl.is_within_limits("u3").await.unwrap());
    assert!(!rl.is_within_limits("u3").await.unwrap());

    rl.reset("u3").await;

    assert!(rl.is_within_limits("u3").await.unwrap());
}

#[tokio::test]
async fn test_substituted_client() {
    let client = Arc::new(MapClient::new());
    let rl = RateLimiter::new(client.clone(), limits("fr:", 1, 60));

    assert!(rl.is_within_limits("user").await.unwrap());
    assert!(!rl.is_within_limits("user").await.unwrap());
    assert_eq!(client.keys(), vec!["fr:user".to_string()]);
}

#[tokio::test]
async fn test_unavailable_backend_admits_everything() {
    // With no stored state every request looks like the first of a window.
    let rl = RateLimiter::new(Arc::new(MapClient::offline()), limits("off:", 1, 60));

    assert!(!rl.is_available());
    for _ in 0..5 {
        assert!(rl.is_within_limits("user").await.unwrap());
    }
}

#[tokio::test]
async fn test_default_prefix_is_used() {
    let registry = ClientRegistry::new();
    let rl = registry
        .rate_limiter(Backend::Local, RateLimitConfig::default())
        .await;

    rl.is_within_limits("subject").await.unwrap();

    let client = registry.local_client().await;
    assert_eq!(rl.key_prefix(), "rememcache-rate-limit:");
    assert_eq!(client.len().await, 1);
}

#[tokio::test]
async fn test_concurrent_requests_are_best_effort() {
    let registry = ClientRegistry::new();
    let rl = Arc::new(registry.rate_limiter(Backend::Local, limits("cc:", 10, 60)).await);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let rl = rl.clone();
        handles.push(tokio::spawn(async move { rl.is_within_limits("u").await.unwrap() }));
    }
    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }

    // Racing read-modify-writes may over-admit, never under-admit.
    assert!(admitted >= 10);
    let window = rl.request_window("u").await.unwrap().unwrap();
    assert!(window.request_count <= 10);
}
