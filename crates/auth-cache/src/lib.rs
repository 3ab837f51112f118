//! Dual-tier cache: an in-process `DashMap` (L1) in front of Redis (L2).
//! Backs the Rate Limiter's shared backend and the Blacklist.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::{AsyncCommands, Client, Script};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>, CacheError>;
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    /// Atomic increment with TTL set on the first increment only. The
    /// backbone of fixed-window rate limiting against the shared backend.
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<u64, CacheError>;
    /// Remaining time-to-live for a key, if it exists and carries one.
    /// Used to compute `retry_after` for rate-limited responses.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;
}

const INCR_WITH_TTL_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return current
"#;

/// Entry kept in the in-process fallback tier: the serialized value, the
/// absolute deadline, and (for `incr_with_ttl`) the running counter so the
/// fallback path can still honor fixed-window semantics when Redis is
/// unreachable.
struct L1Entry {
    value: String,
    expires_at: std::time::Instant,
}

pub struct MultiLevelCache {
    l1: DashMap<String, L1Entry>,
    /// `None` when no shared backend is configured; the cache then runs
    /// purely out of the in-process tier.
    l2: Option<Client>,
}

impl MultiLevelCache {
    pub fn new(redis_url: Option<&str>) -> anyhow::Result<Self> {
        let client = redis_url.map(Client::open).transpose()?;
        Ok(Self {
            l1: DashMap::new(),
            l2: client,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            l1: DashMap::new(),
            l2: None,
        }
    }

    /// Used for L1 invalidation in tests.
    pub fn invalidate_l1(&self, key: &str) {
        self.l1.remove(key);
    }

    fn l1_get(&self, key: &str) -> Option<String> {
        if let Some(entry) = self.l1.get(key) {
            if entry.expires_at > std::time::Instant::now() {
                return Some(entry.value.clone());
            }
        }
        self.l1.remove(key);
        None
    }

    fn l1_set(&self, key: &str, value: String, ttl: Duration) {
        self.l1.insert(
            key.to_string(),
            L1Entry {
                value,
                expires_at: std::time::Instant::now() + ttl,
            },
        );
    }
}

#[async_trait]
impl Cache for MultiLevelCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>, CacheError> {
        if let Some(val_str) = self.l1_get(key) {
            debug!("L1 cache hit: {}", key);
            return Ok(Some(serde_json::from_str(&val_str)?));
        }

        let Some(client) = &self.l2 else {
            return Ok(None);
        };
        let mut conn = client.get_multiplexed_async_connection().await?;
        let val: Option<String> = conn.get(key).await?;
        match val {
            Some(val_str) => {
                debug!("L2 cache hit: {}", key);
                self.l1_set(key, val_str.clone(), Duration::from_secs(60));
                Ok(Some(serde_json::from_str(&val_str)?))
            }
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let val_str = serde_json::to_string(value)?;
        self.l1_set(key, val_str.clone(), ttl);

        if let Some(client) = &self.l2 {
            let mut conn = client.get_multiplexed_async_connection().await?;
            let _: () = conn.set_ex(key, val_str, ttl.as_secs().max(1)).await?;
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1.remove(key);
        if let Some(client) = &self.l2 {
            let mut conn = client.get_multiplexed_async_connection().await?;
            let _: () = conn.del(key).await?;
        }
        Ok(())
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<u64, CacheError> {
        if let Some(client) = &self.l2 {
            let mut conn = client.get_multiplexed_async_connection().await?;
            let script = Script::new(INCR_WITH_TTL_SCRIPT);
            let count: u64 = script
                .key(key)
                .arg(ttl.as_secs().max(1))
                .invoke_async(&mut conn)
                .await?;
            return Ok(count);
        }

        // In-process fallback: emulate INCR+EXPIRE-on-first-write with the
        // L1 map directly, since there's no Lua to run locally.
        let now = std::time::Instant::now();
        let mut entry = self.l1.entry(key.to_string()).or_insert_with(|| L1Entry {
            value: "0".to_string(),
            expires_at: now + ttl,
        });
        if entry.expires_at <= now {
            entry.value = "0".to_string();
            entry.expires_at = now + ttl;
        }
        let count: u64 = entry.value.parse().unwrap_or(0) + 1;
        entry.value = count.to_string();
        Ok(count)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        if let Some(entry) = self.l1.get(key) {
            let now = std::time::Instant::now();
            if entry.expires_at > now {
                return Ok(Some(entry.expires_at - now));
            }
            return Ok(None);
        }

        let Some(client) = &self.l2 else {
            return Ok(None);
        };
        let mut conn = client.get_multiplexed_async_connection().await?;
        let secs: i64 = conn.ttl(key).await?;
        if secs < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_secs(secs as u64)))
        }
    }
}
