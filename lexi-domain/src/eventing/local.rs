//! 本地通道注册表与分发器（LocalEventBus）
//!
//! 每个事件名对应一条无界 FIFO 通道，首次发布时惰性创建，并派生唯一的后台消费任务：
//! - 通道创建经 `DashMap::entry` 原子完成，并发首发只会产生一条通道；
//! - 消费任务按发布顺序逐条取出，依次调用该事件的全部处理器并等待完成；
//! - 不同事件名的通道相互独立，没有跨类型的全局锁；
//! - 关闭信号触发后不再取出新消息，通道内残留消息直接丢弃（内存通道不持久）。
//!
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use super::handler::{HandlerRegistry, dispatch};
use crate::domain_event::{ChannelOptions, DeliveryContext, EventEnvelope};
use crate::error::{EventBusError, EventBusResult as Result};

struct ChannelMessage {
    envelope: Arc<EventEnvelope>,
    ctx: DeliveryContext,
}

struct LocalChannel {
    sender: mpsc::UnboundedSender<ChannelMessage>,
    options: ChannelOptions,
    // 单写者通道串行化发布方
    writer: Option<Mutex<()>>,
}

pub struct LocalEventBus {
    channels: DashMap<String, Arc<LocalChannel>>,
    handlers: Arc<HandlerRegistry>,
    token: CancellationToken,
    consumers: TaskTracker,
}

impl LocalEventBus {
    pub fn new(handlers: Arc<HandlerRegistry>, token: CancellationToken) -> Self {
        Self {
            channels: DashMap::new(),
            handlers,
            token,
            consumers: TaskTracker::new(),
        }
    }

    /// 投递信封到对应事件名的通道；通道不存在时按 `options` 创建。
    ///
    /// 关闭后投递返回 `ChannelClosed`。
    pub async fn publish(
        &self,
        envelope: EventEnvelope,
        options: ChannelOptions,
        ctx: DeliveryContext,
    ) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(EventBusError::ChannelClosed {
                channel: envelope.full_name().to_string(),
            });
        }

        let channel = self.channel(envelope.full_name(), options);
        let _guard = match &channel.writer {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        channel
            .sender
            .send(ChannelMessage {
                envelope: Arc::new(envelope),
                ctx,
            })
            .map_err(|e| EventBusError::ChannelClosed {
                channel: e.0.envelope.full_name().to_string(),
            })
    }

    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn has_channel(&self, event_name: &str) -> bool {
        self.channels.contains_key(event_name)
    }

    /// 已创建通道的生效配置；通道配置在首次创建时确定
    pub fn channel_options(&self, event_name: &str) -> Option<ChannelOptions> {
        self.channels.get(event_name).map(|c| c.options)
    }

    /// 发出关闭信号：消费任务在当前处理器完成后退出
    pub fn shutdown(&self) {
        self.token.cancel();
        self.consumers.close();
    }

    /// 等待所有消费任务退出
    pub async fn join(&self) {
        self.consumers.close();
        self.consumers.wait().await;
    }

    fn channel(&self, event_name: &str, options: ChannelOptions) -> Arc<LocalChannel> {
        if let Some(existing) = self.channels.get(event_name) {
            return Arc::clone(existing.value());
        }

        // entry 持有分片写锁：并发首发时只有一个闭包会执行
        self.channels
            .entry(event_name.to_string())
            .or_insert_with(|| self.open_channel(event_name, options))
            .value()
            .clone()
    }

    fn open_channel(&self, event_name: &str, options: ChannelOptions) -> Arc<LocalChannel> {
        let (sender, receiver) = mpsc::unbounded_channel();

        self.consumers.spawn(consume(
            event_name.to_string(),
            options,
            receiver,
            self.handlers.clone(),
            self.token.clone(),
        ));

        debug!(
            event = event_name,
            single_reader = options.single_reader,
            single_writer = options.single_writer,
            synchronous_continuations = options.allow_synchronous_continuations,
            "local channel created"
        );

        Arc::new(LocalChannel {
            sender,
            options,
            writer: options.single_writer.then(|| Mutex::new(())),
        })
    }
}

async fn consume(
    event_name: String,
    options: ChannelOptions,
    mut receiver: mpsc::UnboundedReceiver<ChannelMessage>,
    handlers: Arc<HandlerRegistry>,
    token: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            message = receiver.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let registered = handlers.handlers_for(&event_name);
        if registered.is_empty() {
            debug!(event = %event_name, "no handler registered, event dropped");
            continue;
        }

        dispatch(&registered, message.envelope, &message.ctx, options, &token).await;
    }

    receiver.close();
    let mut dropped = 0usize;
    while receiver.try_recv().is_ok() {
        dropped += 1;
    }
    info!(event = %event_name, dropped, "local channel consumer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_event::Event;
    use crate::eventing::EventHandler;
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Foo {
        value: u32,
    }
    impl Event for Foo {
        fn event_name() -> &'static str {
            "Foo"
        }
    }

    struct Collect {
        seen: Arc<StdMutex<Vec<u32>>>,
        started: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl EventHandler<Foo> for Collect {
        async fn handle(&self, event: Foo, _ctx: &DeliveryContext) -> anyhow::Result<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.seen.lock().unwrap().push(event.value);
            Ok(())
        }
    }

    type Seen = Arc<StdMutex<Vec<u32>>>;

    fn bus_with_collector(delay: Duration) -> (LocalEventBus, Seen, Arc<AtomicUsize>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let started = Arc::new(AtomicUsize::new(0));
        let handlers = Arc::new(HandlerRegistry::new());
        handlers.register::<Foo, _>(Arc::new(Collect {
            seen: seen.clone(),
            started: started.clone(),
            delay,
        }));
        (
            LocalEventBus::new(handlers, CancellationToken::new()),
            seen,
            started,
        )
    }

    async fn publish(bus: &LocalEventBus, value: u32) {
        let env = EventEnvelope::wrap(&Foo { value }).unwrap();
        bus.publish(env, ChannelOptions::default(), DeliveryContext::local())
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_first_publishes_share_one_channel() {
        let (bus, seen, _) = bus_with_collector(Duration::ZERO);
        let bus = Arc::new(bus);

        let mut set = tokio::task::JoinSet::new();
        for i in 0..32 {
            let bus = bus.clone();
            set.spawn(async move { publish(&bus, i).await });
        }
        while set.join_next().await.is_some() {}

        assert_eq!(bus.channel_count(), 1);
        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            while seen.lock().unwrap().len() < 32 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert_eq!(seen.lock().unwrap().len(), 32);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_stops_consumer_and_rejects_publish() {
        let (bus, seen, started) = bus_with_collector(Duration::from_millis(100));
        publish(&bus, 1).await;
        publish(&bus, 2).await;
        publish(&bus, 3).await;

        // 第一个处理器正在执行时关闭
        tokio::time::timeout(Duration::from_secs(2), async {
            while started.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("first handler should start");
        bus.shutdown();
        tokio::time::timeout(Duration::from_secs(2), bus.join())
            .await
            .expect("consumers should stop");

        // 进行中的处理器跑完，剩余消息被丢弃
        assert_eq!(*seen.lock().unwrap(), vec![1]);

        let env = EventEnvelope::wrap(&Foo { value: 4 }).unwrap();
        let err = bus
            .publish(env, ChannelOptions::default(), DeliveryContext::local())
            .await
            .unwrap_err();
        assert!(matches!(err, EventBusError::ChannelClosed { .. }));
    }

    #[tokio::test]
    async fn events_without_handlers_are_dropped_quietly() {
        let bus = LocalEventBus::new(Arc::new(HandlerRegistry::new()), CancellationToken::new());
        bus.publish(
            EventEnvelope::new("Orphan", "{}"),
            ChannelOptions::default(),
            DeliveryContext::local(),
        )
        .await
        .unwrap();
        assert!(bus.has_channel("Orphan"));
    }
}
