//! 事件总线统一错误定义
//!
//! 聚焦配置、序列化/信封、通道、分布式传输、事件存储与 Saga 关联等最小必要集合，
//! 便于在各实现层统一转换为 `EventBusError`。
//!
//! 约定：发布路径上的“软失败”（路径被禁用、Broker 不可达）只记录日志、不返回错误；
//! 只有配置错误与序列化错误会向调用方传播。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventBusError {
    // --- 配置 ---
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    // --- 序列化/信封 ---
    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    #[error("malformed envelope: {reason}")]
    Envelope { reason: String },
    #[error("unknown event type: {event_type}")]
    UnknownEventType { event_type: String },

    // --- 通道与传输 ---
    #[error("channel closed: {channel}")]
    ChannelClosed { channel: String },
    #[error("broker error: {reason}")]
    Broker { reason: String },

    // --- 事件存储 ---
    #[error("event store error: {reason}")]
    EventStore { reason: String },

    // --- 处理器 / Saga ---
    #[error("event handler error: handler={handler}, reason={reason}")]
    Handler { handler: String, reason: String },
    #[error("correlation mismatch: expected={expected}, found={found}")]
    CorrelationMismatch {
        expected: uuid::Uuid,
        found: uuid::Uuid,
    },
}

impl EventBusError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn broker(reason: impl Into<String>) -> Self {
        Self::Broker {
            reason: reason.into(),
        }
    }

    pub fn event_store(reason: impl Into<String>) -> Self {
        Self::EventStore {
            reason: reason.into(),
        }
    }

    pub fn envelope(reason: impl Into<String>) -> Self {
        Self::Envelope {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type EventBusResult<T> = Result<T, EventBusError>;

#[cfg(feature = "redis")]
impl From<redis::RedisError> for EventBusError {
    fn from(err: redis::RedisError) -> Self {
        EventBusError::Broker {
            reason: err.to_string(),
        }
    }
}
