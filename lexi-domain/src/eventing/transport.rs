//! 分布式传输（DistributedTransport）协议
//!
//! 定义跨进程发布与按模式订阅的最小抽象：
//! - `publish`：向具名频道发送一条文本载荷（即序列化后的信封）；
//! - `subscribe`：按 glob 模式订阅，返回 'static 生命周期的消息流，便于在 tokio::spawn 中消费。
//!
//! 流结束意味着连接丢失，由订阅方决定是否重连。
//!
use async_trait::async_trait;
use futures_core::stream::BoxStream;

use crate::error::EventBusResult as Result;

/// 从传输层收到的一条消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMessage {
    pub channel: String,
    pub payload: String,
}

#[async_trait]
pub trait DistributedTransport: Send + Sync {
    async fn publish(&self, channel: &str, payload: &str) -> Result<()>;

    async fn subscribe(&self, pattern: &str) -> Result<BoxStream<'static, TransportMessage>>;
}

#[async_trait]
impl<T> DistributedTransport for std::sync::Arc<T>
where
    T: DistributedTransport + ?Sized,
{
    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        (**self).publish(channel, payload).await
    }

    async fn subscribe(&self, pattern: &str) -> Result<BoxStream<'static, TransportMessage>> {
        (**self).subscribe(pattern).await
    }
}

/// 频道名：有前缀时为 `{prefix}:{event}`，否则直接使用事件名
pub fn channel_name(prefix: Option<&str>, event_name: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{event_name}"),
        None => event_name.to_string(),
    }
}

/// 订阅模式：有前缀时为 `{prefix}:*`，否则订阅全部频道
pub fn subscribe_pattern(prefix: Option<&str>) -> String {
    match prefix {
        Some(p) => format!("{p}:*"),
        None => "*".to_string(),
    }
}

/// 仅支持 `*` 通配符的 glob 匹配，与 Redis PSUBSCRIBE 的常用子集一致
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return text.is_empty();
    };
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else {
        // 模式中没有通配符
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
