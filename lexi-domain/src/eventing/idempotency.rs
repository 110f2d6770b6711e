//! 消费端幂等守卫（IdempotencyStore）
//!
//! 总线本身不去重；回放与至少一次投递都可能产生重复消息。
//! 需要恰好一次语义的处理器可在处理前以 `ReplayMetadata::message_id` 调用 `try_acquire`，
//! 首次获取返回 `true`，在过期时间内重复获取返回 `false`。
//!
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::error::EventBusResult as Result;

#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// 尝试占用幂等键；已被占用且未过期时返回 `false`
    async fn try_acquire(&self, key: &str) -> Result<bool>;
}

const DEFAULT_PURGE_INTERVAL: usize = 1024;

/// 进程内实现；每 `purge_interval` 次获取顺带清理一次过期键
pub struct InMemoryIdempotencyStore {
    ttl: Duration,
    keys: DashMap<String, Instant>,
    purge_interval: usize,
    acquires: AtomicUsize,
}

impl InMemoryIdempotencyStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            keys: DashMap::new(),
            purge_interval: DEFAULT_PURGE_INTERVAL,
            acquires: AtomicUsize::new(0),
        }
    }

    pub fn with_purge_interval(mut self, every: usize) -> Self {
        self.purge_interval = every.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// 清理已过期的键
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.keys.retain(|_, expires_at| *expires_at > now);
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn try_acquire(&self, key: &str) -> Result<bool> {
        // 须在持有 entry 之前清理，retain 会锁住全部分片
        let calls = self.acquires.fetch_add(1, Ordering::Relaxed) + 1;
        if calls % self.purge_interval == 0 {
            self.purge_expired();
        }

        let now = Instant::now();
        let mut entry = self.keys.entry(key.to_string()).or_insert(now);
        if *entry > now {
            return Ok(false);
        }
        *entry = now + self.ttl;
        Ok(true)
    }
}

/// 基于 `SET key 1 NX EX ttl` 的 Redis 实现，键为 `{prefix}:idempotency:{key}`
#[cfg(feature = "redis")]
pub struct RedisIdempotencyStore {
    conn: redis::aio::ConnectionManager,
    prefix: Option<String>,
    ttl: Duration,
}

#[cfg(feature = "redis")]
impl RedisIdempotencyStore {
    pub fn new(
        conn: redis::aio::ConnectionManager,
        options: &super::options::EventBusOptions,
    ) -> Self {
        Self {
            conn,
            prefix: options.channel_prefix().map(str::to_string),
            ttl: options.idempotency_ttl(),
        }
    }

    fn key(&self, key: &str) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:idempotency:{key}"),
            None => format!("idempotency:{key}"),
        }
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl IdempotencyStore for RedisIdempotencyStore {
    async fn try_acquire(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.key(key))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl.as_secs())
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_within_ttl_is_rejected() {
        let store = InMemoryIdempotencyStore::new(Duration::from_secs(60));
        assert!(store.try_acquire("s1:1").await.unwrap());
        assert!(!store.try_acquire("s1:1").await.unwrap());
        assert!(store.try_acquire("s1:2").await.unwrap());
    }

    #[tokio::test]
    async fn expired_key_can_be_acquired_again() {
        let store = InMemoryIdempotencyStore::new(Duration::from_millis(20));
        assert!(store.try_acquire("k").await.unwrap());
        tokio::time::sleep(Duration::from_millis(40)).await;
        store.purge_expired();
        assert!(store.try_acquire("k").await.unwrap());
    }

    #[tokio::test]
    async fn expired_keys_are_purged_while_acquiring() {
        let store =
            InMemoryIdempotencyStore::new(Duration::from_millis(20)).with_purge_interval(4);
        for key in ["a", "b", "c"] {
            assert!(store.try_acquire(key).await.unwrap());
        }
        assert_eq!(store.len(), 3);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.try_acquire("d").await.unwrap());
        assert_eq!(store.len(), 1);
    }
}
