//! 事件总线配置（EventBusOptions）
//!
//! 进程启动时从外部配置绑定一次，之后只读。
//! 配置节 `event_bus`：`enable_local`、`enable_redis`、`redis.connection_string`、
//! `redis.prefix`、`redis.idempotency_expire_seconds`。
//!
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EventBusError, EventBusResult};

pub const DEFAULT_REDIS_PREFIX: &str = "lexi";
pub const DEFAULT_IDEMPOTENCY_EXPIRE_SECONDS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusOptions {
    /// 是否启用进程内投递
    pub enable_local: bool,
    /// 是否启用 Redis 分布式投递
    pub enable_redis: bool,
    pub redis: RedisOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisOptions {
    /// 连接串，`enable_redis` 为 true 时必填
    pub connection_string: Option<String>,
    /// 频道名前缀；置空表示直接使用事件名
    pub prefix: Option<String>,
    /// 幂等键过期秒数
    pub idempotency_expire_seconds: u64,
}

impl Default for EventBusOptions {
    fn default() -> Self {
        Self {
            enable_local: true,
            enable_redis: false,
            redis: RedisOptions::default(),
        }
    }
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self {
            connection_string: None,
            prefix: Some(DEFAULT_REDIS_PREFIX.to_string()),
            idempotency_expire_seconds: DEFAULT_IDEMPOTENCY_EXPIRE_SECONDS,
        }
    }
}

impl EventBusOptions {
    /// 配置节名称
    pub const SECTION: &'static str = "event_bus";

    /// 仅启用本地投递
    pub fn local_only() -> Self {
        Self::default()
    }

    /// 启用 Redis 投递（同时保留本地投递）
    pub fn with_redis(connection_string: impl Into<String>) -> Self {
        Self {
            enable_redis: true,
            redis: RedisOptions {
                connection_string: Some(connection_string.into()),
                ..RedisOptions::default()
            },
            ..Self::default()
        }
    }

    /// 启动期校验：错误配置应在流量进入前暴露
    pub fn validate(&self) -> EventBusResult<()> {
        if self.enable_redis && self.redis.connection_string().is_none() {
            return Err(EventBusError::configuration(
                "event_bus.redis.connection_string is required when enable_redis is true",
            ));
        }
        if self.redis.idempotency_expire_seconds == 0 {
            return Err(EventBusError::configuration(
                "event_bus.redis.idempotency_expire_seconds must be positive",
            ));
        }
        Ok(())
    }

    /// 生效的频道前缀（空白视为未配置）
    pub fn channel_prefix(&self) -> Option<&str> {
        self.redis
            .prefix
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(self.redis.idempotency_expire_seconds)
    }
}

impl RedisOptions {
    /// 生效的连接串（空白视为未配置）
    pub fn connection_string(&self) -> Option<&str> {
        self.connection_string
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}
