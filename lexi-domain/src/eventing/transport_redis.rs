//! Redis Pub/Sub 传输（RedisTransport）
//!
//! - 发布走共享的 `ConnectionManager`（自动重连、可并发克隆）；
//! - 订阅为每次调用建立独立的 Pub/Sub 连接并执行 `PSUBSCRIBE`；
//!   连接断开时消息流结束，由订阅方重建。
//!
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use tracing::{debug, warn};

use super::transport::{DistributedTransport, TransportMessage};
use crate::error::EventBusResult as Result;

#[derive(Clone)]
pub struct RedisTransport {
    client: redis::Client,
    publisher: ConnectionManager,
}

impl RedisTransport {
    /// 打开客户端并建立发布连接；连接串非法或首次连接失败时返回 `Broker` 错误
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let client = redis::Client::open(connection_string)?;
        let publisher = client.get_connection_manager().await?;
        Ok(Self { client, publisher })
    }

    pub fn client(&self) -> &redis::Client {
        &self.client
    }

    /// 共享连接的克隆，供幂等存储等组件复用
    pub fn connection(&self) -> ConnectionManager {
        self.publisher.clone()
    }
}

#[async_trait]
impl DistributedTransport for RedisTransport {
    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        let mut conn = self.publisher.clone();
        let receivers = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async::<i64>(&mut conn)
            .await?;
        debug!(channel, receivers, "published to redis");
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<BoxStream<'static, TransportMessage>> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.psubscribe(pattern).await?;

        let stream = pubsub.into_on_message().filter_map(|msg| {
            let message = match msg.get_payload::<String>() {
                Ok(payload) => Some(TransportMessage {
                    channel: msg.get_channel_name().to_string(),
                    payload,
                }),
                Err(e) => {
                    warn!(
                        channel = msg.get_channel_name(),
                        error = %e,
                        "non-text redis payload skipped"
                    );
                    None
                }
            };
            futures_util::future::ready(message)
        });
        Ok(Box::pin(stream))
    }
}
