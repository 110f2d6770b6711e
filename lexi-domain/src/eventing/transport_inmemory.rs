//! 内存版分布式传输（InMemoryTransport）
//!
//! 基于 `tokio::sync::broadcast` 模拟 Redis Pub/Sub，满足 `DistributedTransport` 协议：
//! - `publish`：广播到所有订阅者，并记录已发布的 `(频道, 载荷)`；
//! - `subscribe`：按 glob 模式过滤广播流；
//! - `set_available(false)`：模拟 Broker 不可达，发布与订阅返回 `Broker` 错误；
//! - `disconnect_subscribers`：结束当前所有订阅流，模拟连接断开；
//! - 典型用途：测试环境、示例与本地开发。
//!
//! 注意：与 Redis 一致，发布时没有订阅者的消息直接丢失。

use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::transport::{DistributedTransport, TransportMessage, glob_match};
use crate::error::{EventBusError, EventBusResult as Result};

pub struct InMemoryTransport {
    tx: broadcast::Sender<TransportMessage>,
    available: AtomicBool,
    published: Mutex<Vec<TransportMessage>>,
    // 当前连接代次；取消即结束该代次上的全部订阅流
    connection: Mutex<CancellationToken>,
    subscriptions: AtomicUsize,
}

impl InMemoryTransport {
    /// 创建一个内存传输，`capacity` 为广播缓冲区容量
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            available: AtomicBool::new(true),
            published: Mutex::new(Vec::new()),
            connection: Mutex::new(CancellationToken::new()),
            subscriptions: AtomicUsize::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// 已成功发布的消息（按发布顺序）
    pub fn published(&self) -> Vec<TransportMessage> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// 累计成功建立的订阅次数（含重连）
    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    /// 结束所有现存订阅流；之后的订阅不受影响
    pub fn disconnect_subscribers(&self) {
        if let Ok(mut connection) = self.connection.lock() {
            connection.cancel();
            *connection = CancellationToken::new();
        }
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl DistributedTransport for InMemoryTransport {
    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(EventBusError::broker("in-memory broker unavailable"));
        }

        let message = TransportMessage {
            channel: channel.to_string(),
            payload: payload.to_string(),
        };
        if let Ok(mut published) = self.published.lock() {
            published.push(message.clone());
        }
        // 无订阅者时 send 返回错误，与 Pub/Sub 语义一致，忽略
        let _ = self.tx.send(message);
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<BoxStream<'static, TransportMessage>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(EventBusError::broker("in-memory broker unavailable"));
        }

        let connection = self
            .connection
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default();
        let pattern = pattern.to_string();
        let stream = BroadcastStream::new(self.tx.subscribe()).filter_map(move |r| {
            let matched = match r {
                Ok(m) if glob_match(&pattern, &m.channel) => Some(m),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(n)) => {
                    warn!(skipped = n, "in-memory subscriber lagged, messages lost");
                    None
                }
            };
            futures_util::future::ready(matched)
        });
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::pin(stream.take_until(connection.cancelled_owned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn subscriber_sees_only_matching_channels() {
        let transport = InMemoryTransport::new(16);
        let mut stream = transport.subscribe("lexi:*").await.unwrap();

        transport.publish("other:Foo", "{}").await.unwrap();
        transport.publish("lexi:Foo", "payload").await.unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.channel, "lexi:Foo");
        assert_eq!(msg.payload, "payload");
        assert_eq!(transport.published().len(), 2);
    }

    #[tokio::test]
    async fn unavailable_broker_rejects_publish() {
        let transport = InMemoryTransport::default();
        transport.set_available(false);
        let err = transport.publish("lexi:Foo", "{}").await.unwrap_err();
        assert!(matches!(err, EventBusError::Broker { .. }));
        assert!(transport.published().is_empty());
    }

    #[tokio::test]
    async fn disconnect_ends_live_streams_only() {
        let transport = InMemoryTransport::new(16);
        let mut old = transport.subscribe("lexi:*").await.unwrap();
        transport.disconnect_subscribers();
        let mut fresh = transport.subscribe("lexi:*").await.unwrap();
        assert_eq!(transport.subscriptions(), 2);

        let ended = tokio::time::timeout(Duration::from_secs(1), old.next())
            .await
            .unwrap();
        assert!(ended.is_none());

        transport.publish("lexi:Foo", "after").await.unwrap();
        let msg = tokio::time::timeout(Duration::from_secs(1), fresh.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.payload, "after");
    }
}
