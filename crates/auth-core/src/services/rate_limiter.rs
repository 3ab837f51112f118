//! Fixed-window rate limiting with automatic failover between a shared
//! cache backend and an in-process fallback.
//!
//! The two backends are allowed to disagree during an outage — this is a
//! deliberate fail-open design for availability (spec §9), the mirror image
//! of the Blacklist's fail-secure policy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use auth_cache::Cache;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::Instant;

const REPROBE_INTERVAL: Duration = Duration::from_secs(30);
const IN_PROCESS_CAP: usize = 10_000;
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub limit: u64,
    pub window: Duration,
}

pub struct RateLimitDecision {
    pub allowed: bool,
    pub retry_after: Duration,
}

struct Bucket {
    count: u64,
    window_start: Instant,
}

/// In-process fixed-window map, used as the fallback when the shared backend
/// is unavailable. Bounded by an LRU cap; swept periodically by the caller.
struct InProcessBackend {
    buckets: Mutex<LruCache<String, Bucket>>,
}

impl InProcessBackend {
    fn new() -> Self {
        Self {
            buckets: Mutex::new(LruCache::new(NonZeroUsize::new(IN_PROCESS_CAP).unwrap())),
        }
    }

    fn allow(&self, key: &str, cfg: RateLimitConfig) -> RateLimitDecision {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();

        if buckets.get(key).is_none() {
            buckets.put(
                key.to_string(),
                Bucket {
                    count: 0,
                    window_start: now,
                },
            );
        }
        let entry = buckets.get_mut(key).expect("just inserted");

        if now.duration_since(entry.window_start) >= cfg.window {
            entry.count = 1;
            entry.window_start = now;
            return RateLimitDecision {
                allowed: true,
                retry_after: Duration::from_secs(0),
            };
        }

        entry.count += 1;
        let allowed = entry.count <= cfg.limit;
        let elapsed = now.duration_since(entry.window_start);
        let retry_after = cfg.window.saturating_sub(elapsed);
        RateLimitDecision { allowed, retry_after }
    }

    fn sweep(&self, max_age: Duration) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let stale: Vec<String> = buckets
            .iter()
            .filter(|(_, b)| now.duration_since(b.window_start) >= max_age)
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            buckets.pop(&key);
        }
    }
}

/// Fixed-window counters keyed by `ratelimit:<op>:<ip>`, backed by the
/// shared cache while healthy, falling back to an in-process map on any
/// shared-backend error and re-probing for recovery every 30 seconds.
pub struct RateLimiter<C: Cache> {
    shared: Arc<C>,
    fallback: InProcessBackend,
    using_fallback: AtomicBool,
    last_probe: Mutex<Instant>,
    mode_flips: AtomicU64,
    login: RateLimitConfig,
    register: RateLimitConfig,
}

impl<C: Cache> RateLimiter<C> {
    pub fn new(shared: Arc<C>, login: RateLimitConfig, register: RateLimitConfig) -> Self {
        Self {
            shared,
            fallback: InProcessBackend::new(),
            using_fallback: AtomicBool::new(false),
            last_probe: Mutex::new(Instant::now()),
            mode_flips: AtomicU64::new(0),
            login,
            register,
        }
    }

    pub fn mode_flip_count(&self) -> u64 {
        self.mode_flips.load(Ordering::Relaxed)
    }

    pub async fn allow_login(&self, client_ip: &str) -> RateLimitDecision {
        self.allow("login", client_ip, self.login).await
    }

    pub async fn allow_register(&self, client_ip: &str) -> RateLimitDecision {
        self.allow("register", client_ip, self.register).await
    }

    async fn allow(&self, op: &str, client_ip: &str, cfg: RateLimitConfig) -> RateLimitDecision {
        let key = format!("ratelimit:{op}:{client_ip}");

        if self.using_fallback.load(Ordering::Acquire) {
            let mut last_probe = self.last_probe.lock();
            if last_probe.elapsed() >= REPROBE_INTERVAL {
                *last_probe = Instant::now();
                drop(last_probe);
                if self.shared_allow(&key, cfg).await.is_some() {
                    self.flip_mode(false);
                }
            }
        }

        if !self.using_fallback.load(Ordering::Acquire) {
            if let Some(decision) = self.shared_allow(&key, cfg).await {
                return decision;
            }
            self.flip_mode(true);
        }

        self.fallback.allow(&key, cfg)
    }

    async fn shared_allow(&self, key: &str, cfg: RateLimitConfig) -> Option<RateLimitDecision> {
        let count = self.shared.incr_with_ttl(key, cfg.window).await.ok()?;
        let allowed = count <= cfg.limit;
        let retry_after = if allowed {
            Duration::from_secs(0)
        } else {
            self.shared
                .ttl(key)
                .await
                .ok()
                .flatten()
                .unwrap_or(cfg.window)
        };
        Some(RateLimitDecision { allowed, retry_after })
    }

    fn flip_mode(&self, to_fallback: bool) {
        let was = self.using_fallback.swap(to_fallback, Ordering::AcqRel);
        if was != to_fallback {
            self.mode_flips.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("rate_limiter_mode_flip_total", 1);
            tracing::warn!(using_fallback = to_fallback, "rate limiter backend mode flipped");
        }
    }

    /// Cooperative background sweep; the caller spawns this in its own task
    /// at boot and aborts it at shutdown.
    pub async fn run_sweeper(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            self.fallback.sweep(self.login.window.max(self.register.window));
        }
    }
}

pub fn default_configs() -> HashMap<&'static str, RateLimitConfig> {
    let mut m = HashMap::new();
    m.insert(
        "login",
        RateLimitConfig {
            limit: 5,
            window: Duration::from_secs(15 * 60),
        },
    );
    m.insert(
        "register",
        RateLimitConfig {
            limit: 3,
            window: Duration::from_secs(60 * 60),
        },
    );
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_cache::MultiLevelCache;

    fn limiter() -> RateLimiter<MultiLevelCache> {
        RateLimiter::new(
            Arc::new(MultiLevelCache::in_memory()),
            RateLimitConfig {
                limit: 3,
                window: Duration::from_secs(60),
            },
            RateLimitConfig {
                limit: 3,
                window: Duration::from_secs(60),
            },
        )
    }

    #[tokio::test]
    async fn allows_up_to_limit_then_denies() {
        let rl = limiter();
        for _ in 0..3 {
            assert!(rl.allow_login("198.51.100.7").await.allowed);
        }
        let decision = rl.allow_login("198.51.100.7").await;
        assert!(!decision.allowed);
        assert!(decision.retry_after <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn different_ips_have_independent_buckets() {
        let rl = limiter();
        for _ in 0..3 {
            assert!(rl.allow_login("1.1.1.1").await.allowed);
        }
        assert!(rl.allow_login("2.2.2.2").await.allowed);
    }
}
