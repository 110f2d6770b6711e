//! 分布式订阅者（DistributedSubscriber）
//!
//! 长驻后台任务：按 `{prefix}:*` 订阅传输层，解析信封后投入与本地发布相同的
//! `LocalEventBus` 通道，因此处理器代码与投递来源无关。
//!
//! - 连接断开（消息流结束）或订阅失败时，等待 `reconnect_delay` 后重新订阅；
//! - 关闭信号触发后退出，不再消费。
//!
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::local::LocalEventBus;
use super::registry::EventTypeRegistry;
use super::transport::{DistributedTransport, TransportMessage, channel_name, subscribe_pattern};
use crate::domain_event::{DeliveryContext, EventEnvelope};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

pub struct DistributedSubscriber {
    transport: Arc<dyn DistributedTransport>,
    local: Arc<LocalEventBus>,
    types: Arc<EventTypeRegistry>,
    prefix: Option<String>,
    reconnect_delay: Duration,
}

impl DistributedSubscriber {
    pub fn new(
        transport: Arc<dyn DistributedTransport>,
        local: Arc<LocalEventBus>,
        types: Arc<EventTypeRegistry>,
        prefix: Option<String>,
    ) -> Self {
        Self {
            transport,
            local,
            types,
            prefix,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn pattern(&self) -> String {
        subscribe_pattern(self.prefix.as_deref())
    }

    /// 订阅循环，直到 `token` 被取消
    pub async fn run(self, token: CancellationToken) {
        let pattern = self.pattern();

        loop {
            let subscribed = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                r = self.transport.subscribe(&pattern) => r,
            };

            match subscribed {
                Ok(mut stream) => {
                    info!(pattern = %pattern, "distributed subscription established");
                    loop {
                        let message = tokio::select! {
                            biased;
                            _ = token.cancelled() => None,
                            m = stream.next() => m,
                        };
                        match message {
                            Some(message) => self.deliver(message).await,
                            None => break,
                        }
                    }
                    if token.is_cancelled() {
                        break;
                    }
                    warn!(pattern = %pattern, "distributed subscription lost, reconnecting");
                }
                Err(e) => {
                    error!(pattern = %pattern, error = %e, "distributed subscribe failed");
                }
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        info!(pattern = %pattern, "distributed subscriber stopped");
    }

    async fn deliver(&self, message: TransportMessage) {
        let envelope = match EventEnvelope::from_json(&message.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(channel = %message.channel, error = %e, "malformed envelope dropped");
                return;
            }
        };

        let expected = channel_name(self.prefix.as_deref(), envelope.full_name());
        if expected != message.channel {
            warn!(
                channel = %message.channel,
                expected = %expected,
                event = envelope.full_name(),
                "envelope name does not match channel, dropped"
            );
            return;
        }

        if self.local.handlers().handler_count(envelope.full_name()) == 0 {
            if !self.types.is_registered(envelope.full_name()) {
                warn!(event = envelope.full_name(), "unknown distributed event type, dropped");
            } else {
                debug!(event = envelope.full_name(), "no handler registered, event dropped");
            }
            return;
        }

        let ctx = match envelope.replay() {
            Some(meta) => DeliveryContext::replay(meta.clone()),
            None => DeliveryContext::distributed(),
        };
        let options = self.types.options_for(envelope.full_name());
        let name = envelope.full_name().to_string();
        if let Err(e) = self.local.publish(envelope, options, ctx).await {
            warn!(event = %name, error = %e, "distributed event not enqueued");
        }
    }
}
