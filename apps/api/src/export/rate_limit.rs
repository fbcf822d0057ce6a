//! Fixed-window rate limiting for the export endpoints.
//!
//! `RateLimiter` owns the policy (budget, window, key layout); the counters live behind
//! a `CounterStore` so the same limiter runs against process memory or Redis.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use once_cell::sync::Lazy;
use redis::aio::MultiplexedConnection;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit store unavailable: {0}")]
    Unavailable(String),
}

/// Counter state right after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u64,
    pub resets_in: Duration,
}

/// Atomic increment-with-expiry. The first increment of a window sets its expiry;
/// later increments in the same window never extend it.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, RateLimitError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-process store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    expires_at: Instant,
}

/// Single-server counter store.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    windows: Mutex<HashMap<String, Window>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired window. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, w| w.expires_at > now);
        before - windows.len()
    }

    pub async fn len(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, RateLimitError> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let state = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            expires_at: now + window,
        });
        if state.expires_at <= now {
            *state = Window {
                count: 0,
                expires_at: now + window,
            };
        }
        state.count += 1;
        Ok(WindowCount {
            count: state.count,
            resets_in: state.expires_at.saturating_duration_since(now),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis store
// ────────────────────────────────────────────────────────────────────────────

/// INCR, PEXPIRE on the first hit, then report the remaining TTL. Runs server-side so
/// the increment and the expiry are one step for every server sharing the store.
static INCREMENT_SCRIPT: Lazy<redis::Script> = Lazy::new(|| {
    redis::Script::new(
        r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
  ttl = tonumber(ARGV[1])
end
return {count, ttl}
",
    )
});

/// Counter store shared by every server pointing at the same Redis.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: MultiplexedConnection,
}

impl RedisCounterStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, RateLimitError> {
        let mut conn = self.conn.clone();
        let window_ms = window.as_millis().max(1) as u64;
        let (count, ttl_ms): (i64, i64) = INCREMENT_SCRIPT
            .key(key)
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e: redis::RedisError| RateLimitError::Unavailable(e.to_string()))?;
        Ok(WindowCount {
            count: count.max(0) as u64,
            resets_in: Duration::from_millis(ttl_ms.max(0) as u64),
        })
    }
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore").finish_non_exhaustive()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Limiter
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Seconds until the window resets, never below 1.
    pub retry_after_secs: u64,
    /// Unix seconds at which the window resets.
    pub reset_at: i64,
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    max_requests: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, max_requests: u64, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    pub fn key(identity: &str, route: &str) -> String {
        format!("rate_limit:{identity}:{route}")
    }

    /// Counts one request for `identity` on `route`.
    ///
    /// A failing store lets the request through with a full budget and a warning.
    pub async fn check(&self, identity: &str, route: &str) -> RateDecision {
        let key = Self::key(identity, route);
        match self.store.increment(&key, self.window).await {
            Ok(window) => self.decide(window),
            Err(e) => {
                tracing::warn!("Rate limiter unavailable, allowing request: {e}");
                self.decide(WindowCount {
                    count: 0,
                    resets_in: self.window,
                })
            }
        }
    }

    fn decide(&self, window: WindowCount) -> RateDecision {
        let retry_after_secs = window.resets_in.as_secs_f64().ceil().max(1.0) as u64;
        RateDecision {
            allowed: window.count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(window.count),
            retry_after_secs,
            reset_at: chrono::Utc::now().timestamp() + retry_after_secs as i64,
        }
    }
}

/// Client identity for rate limiting: first `X-Forwarded-For` entry, then `X-Real-IP`,
/// then the socket peer, then `"unknown"`.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }
    peer.map(|p| p.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn increment(
            &self,
            _key: &str,
            _window: Duration,
        ) -> Result<WindowCount, RateLimitError> {
            Err(RateLimitError::Unavailable("connection refused".to_string()))
        }
    }

    fn limiter(max: u64) -> (Arc<InMemoryCounterStore>, RateLimiter) {
        let store = Arc::new(InMemoryCounterStore::new());
        let limiter = RateLimiter::new(store.clone(), max, Duration::from_secs(60));
        (store, limiter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_allows_up_to_budget_then_denies() {
        let (_, limiter) = limiter(3);
        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check("1.2.3.4", "export:pdf").await;
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }
        let denied = limiter.check("1.2.3.4", "export:pdf").await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after_secs, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expiry_restores_budget() {
        let (_, limiter) = limiter(1);
        assert!(limiter.check("a", "r").await.allowed);
        assert!(!limiter.check("a", "r").await.allowed);

        tokio::time::advance(Duration::from_secs(30)).await;
        let denied = limiter.check("a", "r").await;
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_secs, 30);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(limiter.check("a", "r").await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identities_and_routes_are_independent() {
        let (_, limiter) = limiter(1);
        assert!(limiter.check("a", "/pdf").await.allowed);
        assert!(limiter.check("b", "/pdf").await.allowed);
        assert!(limiter.check("a", "/html").await.allowed);
        assert!(!limiter.check("a", "/pdf").await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_drops_only_stale_windows() {
        let store = InMemoryCounterStore::new();
        store.increment("old", Duration::from_secs(10)).await.unwrap();
        store.increment("new", Duration::from_secs(120)).await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        let limiter = RateLimiter::new(Arc::new(BrokenStore), 10, Duration::from_secs(60));
        let decision = limiter.check("a", "r").await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 10);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_counted_once_each() {
        let store = Arc::new(InMemoryCounterStore::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment("k", Duration::from_secs(60)).await.unwrap().count
            }));
        }
        let mut counts = Vec::new();
        for handle in handles {
            counts.push(handle.await.unwrap());
        }
        counts.sort_unstable();
        assert_eq!(counts, (1..=50).collect::<Vec<u64>>());
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(
            RateLimiter::key("10.0.0.1", "export:pdf"),
            "rate_limit:10.0.0.1:export:pdf"
        );
    }

    #[test]
    fn test_client_identity_precedence() {
        let peer: SocketAddr = "192.168.1.9:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_identity(&headers, Some(peer)), "192.168.1.9");
        assert_eq!(client_identity(&headers, None), "unknown");

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_identity(&headers, Some(peer)), "10.0.0.2");

        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.7, 10.0.0.1"));
        assert_eq!(client_identity(&headers, Some(peer)), "203.0.113.7");
    }
}
