//! 混合事件总线（HybridEventBus）
//!
//! 单一发布入口，按事件决定投递路径：
//! - `enable_redis` 且事件为 Saga 集成事件：走分布式传输；
//! - 否则 `enable_local` 时投入本地通道；
//! - 两条路径都不可用时仅记录告警。
//!
//! 发布始终是“尽力而为”的信号：路径被禁用、Broker 不可达都只记录日志并返回 `Ok`；
//! 只有序列化失败、关闭后投递等编程/生命周期错误会返回给调用方。
//!
use bon::bon;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::handler::{EventHandler, HandlerRegistry};
use super::local::LocalEventBus;
use super::options::EventBusOptions;
use super::registry::EventTypeRegistry;
use super::subscriber::{DEFAULT_RECONNECT_DELAY, DistributedSubscriber};
use super::transport::{DistributedTransport, channel_name};
use crate::domain_event::{ChannelOptions, DeliveryContext, Event, EventEnvelope, IntegrationEvent};
use crate::error::{EventBusError, EventBusResult as Result};

pub struct HybridEventBus {
    options: EventBusOptions,
    types: Arc<EventTypeRegistry>,
    local: Arc<LocalEventBus>,
    transport: Option<Arc<dyn DistributedTransport>>,
    reconnect_delay: Duration,
    token: CancellationToken,
    tasks: TaskTracker,
    started: AtomicBool,
}

#[bon]
impl HybridEventBus {
    /// 构建总线；配置非法或启用 Redis 却未提供传输时立即失败
    #[builder]
    pub fn new(
        #[builder(default)] options: EventBusOptions,
        transport: Option<Arc<dyn DistributedTransport>>,
        #[builder(default = Arc::new(EventTypeRegistry::new()))] types: Arc<EventTypeRegistry>,
        #[builder(default = CancellationToken::new())] shutdown: CancellationToken,
        #[builder(default = DEFAULT_RECONNECT_DELAY)] reconnect_delay: Duration,
    ) -> Result<Self> {
        options.validate()?;
        if options.enable_redis && transport.is_none() {
            return Err(EventBusError::configuration(
                "enable_redis is true but no distributed transport was provided",
            ));
        }

        let handlers = Arc::new(HandlerRegistry::new());
        let local = Arc::new(LocalEventBus::new(handlers, shutdown.clone()));

        info!(
            enable_local = options.enable_local,
            enable_redis = options.enable_redis,
            prefix = options.channel_prefix().unwrap_or(""),
            "hybrid event bus created"
        );

        Ok(Self {
            options,
            types,
            local,
            transport,
            reconnect_delay,
            token: shutdown,
            tasks: TaskTracker::new(),
            started: AtomicBool::new(false),
        })
    }
}

impl HybridEventBus {
    /// 按配置建立 Redis 传输（若启用）后构建总线
    #[cfg(feature = "redis")]
    pub async fn connect(options: EventBusOptions) -> Result<Self> {
        options.validate()?;
        let transport: Option<Arc<dyn DistributedTransport>> =
            match options.redis.connection_string().filter(|_| options.enable_redis) {
                Some(conn) => Some(Arc::new(
                    super::transport_redis::RedisTransport::connect(conn).await?,
                )),
                None => None,
            };
        Self::builder()
            .options(options)
            .maybe_transport(transport)
            .build()
    }

    // --- 注册 ---

    /// 登记领域事件类型（供订阅与回放按名称解析）
    pub fn register_event<E: Event>(&self) -> &Self {
        self.types.register::<E>();
        self
    }

    /// 登记 Saga 集成事件类型
    pub fn register_integration_event<E: Event + IntegrationEvent>(&self) -> &Self {
        self.types.register_integration::<E>();
        self
    }

    /// 为事件类型 `E` 注册处理器；本地、分布式与回放流量共用
    pub fn subscribe<E, H>(&self, handler: Arc<H>) -> &Self
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        self.types.declare_options::<E>();
        self.local.handlers().register::<E, H>(handler);
        self
    }

    // --- 发布 ---

    pub async fn publish<E: Event>(&self, event: &E) -> Result<()> {
        if self.options.enable_redis && event.as_integration().is_some() {
            return self.publish_distributed(event).await;
        }
        if self.options.enable_local {
            return self.publish_local(event).await;
        }
        warn!(event = E::event_name(), "no delivery path enabled, event dropped");
        Ok(())
    }

    /// 强制走本地通道
    pub async fn publish_local<E: Event>(&self, event: &E) -> Result<()> {
        if !self.options.enable_local {
            warn!(event = E::event_name(), "local delivery disabled, event dropped");
            return Ok(());
        }
        let envelope = EventEnvelope::wrap(event)?;
        self.local
            .publish(envelope, E::channel_options(), DeliveryContext::local())
            .await
    }

    /// 强制走分布式传输
    pub async fn publish_distributed<E: Event>(&self, event: &E) -> Result<()> {
        if !self.options.enable_redis {
            warn!(event = E::event_name(), "distributed delivery disabled, event dropped");
            return Ok(());
        }
        let envelope = EventEnvelope::wrap(event)?;
        self.send_distributed(&envelope).await
    }

    /// 信封级本地投递：按回放元数据推断投递上下文，通道配置取自类型注册表
    pub async fn publish_envelope_local(&self, envelope: EventEnvelope) -> Result<()> {
        if !self.options.enable_local {
            warn!(event = envelope.full_name(), "local delivery disabled, event dropped");
            return Ok(());
        }
        let ctx = match envelope.replay() {
            Some(meta) => DeliveryContext::replay(meta.clone()),
            None => DeliveryContext::local(),
        };
        let options = self.types.options_for(envelope.full_name());
        self.local.publish(envelope, options, ctx).await
    }

    /// 信封级分布式投递
    pub async fn publish_envelope_distributed(&self, envelope: EventEnvelope) -> Result<()> {
        if !self.options.enable_redis {
            warn!(event = envelope.full_name(), "distributed delivery disabled, event dropped");
            return Ok(());
        }
        self.send_distributed(&envelope).await
    }

    async fn send_distributed(&self, envelope: &EventEnvelope) -> Result<()> {
        let Some(transport) = &self.transport else {
            warn!(event = envelope.full_name(), "no distributed transport, event dropped");
            return Ok(());
        };

        let payload = envelope.to_json()?;
        let channel = channel_name(self.options.channel_prefix(), envelope.full_name());
        match transport.publish(&channel, &payload).await {
            Ok(()) => debug!(channel = %channel, "event published to broker"),
            Err(e) => error!(
                channel = %channel,
                event = envelope.full_name(),
                error = %e,
                "broker publish failed, event dropped"
            ),
        }
        Ok(())
    }

    // --- 生命周期 ---

    /// 启动分布式订阅（仅一次）；未启用 Redis 时为空操作
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(transport) = self.transport.clone().filter(|_| self.options.enable_redis) else {
            debug!("distributed delivery disabled, subscriber not started");
            return;
        };

        let subscriber = DistributedSubscriber::new(
            transport,
            self.local.clone(),
            self.types.clone(),
            self.options.channel_prefix().map(str::to_string),
        )
        .with_reconnect_delay(self.reconnect_delay);
        self.tasks.spawn(subscriber.run(self.token.clone()));
    }

    /// 发出关闭信号：订阅退出，本地消费任务在当前处理器完成后退出
    pub fn shutdown(&self) {
        info!("hybrid event bus shutting down");
        self.tasks.close();
        self.local.shutdown();
    }

    /// 等待所有后台任务退出
    pub async fn join(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.local.join().await;
    }

    // --- 访问器 ---

    /// 事件 `E` 在分布式传输上的频道名
    pub fn channel_name<E: Event>(&self) -> String {
        channel_name(self.options.channel_prefix(), E::event_name())
    }

    pub fn options(&self) -> &EventBusOptions {
        &self.options
    }

    pub fn types(&self) -> &Arc<EventTypeRegistry> {
        &self.types
    }

    pub fn local(&self) -> &Arc<LocalEventBus> {
        &self.local
    }

    pub fn channel_options_for(&self, event_name: &str) -> ChannelOptions {
        self.types.options_for(event_name)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventing::InMemoryTransport;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Serialize, Deserialize)]
    struct Noted {
        n: u32,
    }
    impl Event for Noted {
        fn event_name() -> &'static str {
            "Noted"
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Shared {
        correlation_id: Uuid,
    }
    impl Event for Shared {
        fn event_name() -> &'static str {
            "Shared"
        }
        fn as_integration(&self) -> Option<&dyn IntegrationEvent> {
            Some(self)
        }
    }
    impl IntegrationEvent for Shared {
        fn correlation_id(&self) -> Uuid {
            self.correlation_id
        }
    }

    fn redis_bus(transport: &Arc<InMemoryTransport>) -> HybridEventBus {
        HybridEventBus::builder()
            .options(EventBusOptions::with_redis("redis://unused"))
            .transport(transport.clone() as Arc<dyn DistributedTransport>)
            .build()
            .unwrap()
    }

    #[test]
    fn redis_without_transport_fails_at_construction() {
        let err = HybridEventBus::builder()
            .options(EventBusOptions::with_redis("redis://unused"))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, EventBusError::Configuration { .. }));

        let mut options = EventBusOptions::default();
        options.enable_redis = true;
        assert!(HybridEventBus::builder().options(options).build().is_err());
    }

    #[tokio::test]
    async fn integration_events_go_distributed_and_skip_local() {
        let transport = Arc::new(InMemoryTransport::new(16));
        let bus = redis_bus(&transport);

        bus.publish(&Shared {
            correlation_id: Uuid::new_v4(),
        })
        .await
        .unwrap();
        bus.publish(&Noted { n: 1 }).await.unwrap();

        let published = transport.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].channel, "lexi:Shared");
        assert!(!bus.local().has_channel("Shared"));
        assert!(bus.local().has_channel("Noted"));
    }

    #[tokio::test]
    async fn disabled_paths_are_silent_no_ops() {
        let options = EventBusOptions {
            enable_local: false,
            ..Default::default()
        };
        let bus = HybridEventBus::builder().options(options).build().unwrap();

        bus.publish(&Noted { n: 1 }).await.unwrap();
        bus.publish_local(&Noted { n: 2 }).await.unwrap();
        bus.publish_distributed(&Noted { n: 3 }).await.unwrap();
        assert_eq!(bus.local().channel_count(), 0);
    }

    #[tokio::test]
    async fn broker_failure_does_not_fail_publish() {
        let transport = Arc::new(InMemoryTransport::new(16));
        transport.set_available(false);
        let bus = redis_bus(&transport);

        bus.publish(&Shared {
            correlation_id: Uuid::new_v4(),
        })
        .await
        .unwrap();
        assert!(transport.published().is_empty());
    }

    #[tokio::test]
    async fn publish_after_shutdown_reports_closed_channel() {
        let bus = HybridEventBus::builder().build().unwrap();
        bus.shutdown();
        bus.join().await;
        let err = bus.publish(&Noted { n: 1 }).await.unwrap_err();
        assert!(matches!(err, EventBusError::ChannelClosed { .. }));
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Tallied {
        n: u32,
    }
    impl Event for Tallied {
        fn event_name() -> &'static str {
            "Tallied"
        }
        fn channel_options() -> ChannelOptions {
            ChannelOptions::builder().single_writer(true).build()
        }
    }

    struct Ignore;

    #[async_trait::async_trait]
    impl EventHandler<Tallied> for Ignore {
        async fn handle(&self, _event: Tallied, _ctx: &DeliveryContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn envelope_path_keeps_options_of_subscribed_type() {
        let bus = HybridEventBus::builder().build().unwrap();
        bus.subscribe::<Tallied, _>(Arc::new(Ignore));

        // 未登记类型经信封入口首先建通道
        let envelope = EventEnvelope::wrap(&Tallied { n: 1 }).unwrap();
        bus.publish_envelope_local(envelope).await.unwrap();

        let options = bus.local().channel_options("Tallied").unwrap();
        assert!(options.single_writer);
        assert_eq!(bus.channel_options_for("Tallied"), Tallied::channel_options());
        assert!(!bus.types().is_registered("Tallied"));
    }

    #[test]
    fn channel_name_uses_configured_prefix() {
        let bus = HybridEventBus::builder().build().unwrap();
        assert_eq!(bus.channel_name::<Noted>(), "lexi:Noted");

        let mut options = EventBusOptions::default();
        options.redis.prefix = None;
        let bare = HybridEventBus::builder().options(options).build().unwrap();
        assert_eq!(bare.channel_name::<Noted>(), "Noted");
    }
}
