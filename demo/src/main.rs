//! 混合事件总线演示服务
//!
//! 加载配置、安装日志、构建总线并注册处理器，发布一次复习会话的事件，
//! 随后通过回放命令重建学习进度；收到 Ctrl-C 后优雅退出。
//!
mod config;
mod events;
mod handlers;

use lexi_application::command_bus::CommandBus;
use lexi_application::context::AppContext;
use lexi_application::{InMemoryCommandBus, ReplayEventsCommand, ReplayEventsHandler};
use lexi_domain::eventing::{
    EventReplayer, HybridEventBus, IdempotencyStore, InMemoryIdempotencyStore, ReplayTarget,
};
use lexi_domain::persist::{EventStore, EventStoreExt, InMemoryEventStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::events::{Grade, ReviewSessionScheduled, ReviewSessionStarted, WordReviewed};
use crate::handlers::{ProgressProjection, ScheduleLogger, SessionScheduler};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let config = config::load()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    info!(?config, "configuration loaded");

    let bus = Arc::new(HybridEventBus::connect(config.event_bus.clone()).await?);
    bus.register_event::<WordReviewed>()
        .register_integration_event::<ReviewSessionStarted>()
        .register_integration_event::<ReviewSessionScheduled>();

    let dedupe: Arc<dyn IdempotencyStore> = Arc::new(InMemoryIdempotencyStore::new(
        config.event_bus.idempotency_ttl(),
    ));
    bus.subscribe::<WordReviewed, _>(Arc::new(ProgressProjection { dedupe }))
        .subscribe::<ReviewSessionStarted, _>(Arc::new(SessionScheduler::new(&bus)))
        .subscribe::<ReviewSessionScheduled, _>(Arc::new(ScheduleLogger));
    bus.start();

    // 启用 Redis 时集成事件经 Broker 回流，否则直接走本地通道
    bus.publish(&ReviewSessionStarted {
        correlation_id: Uuid::new_v4(),
        learner_id: config.replay_stream.clone(),
        words: vec!["serendipity".into(), "ephemeral".into()],
    })
    .await?;

    // 事件存储中的历史复习记录，经回放命令重建进度
    let store = Arc::new(InMemoryEventStore::new());
    let history: Vec<WordReviewed> = [
        ("ubiquitous", Grade::Hard),
        ("laconic", Grade::Easy),
        ("ubiquitous", Grade::Good),
    ]
    .into_iter()
    .map(|(word, grade)| WordReviewed {
        learner_id: config.replay_stream.clone(),
        word: word.into(),
        grade,
    })
    .collect();
    store.append(&config.replay_stream, &history, None).await?;

    let replayer = EventReplayer::builder()
        .store(store as Arc<dyn EventStore>)
        .bus(bus.clone())
        .build();
    let commands = InMemoryCommandBus::new();
    commands.register::<ReplayEventsCommand, _>(Arc::new(ReplayEventsHandler::new(Arc::new(
        replayer,
    ))));

    let ctx = AppContext::builder()
        .correlation_id(Uuid::new_v4())
        .actor_id("demo".into())
        .build();
    let replay = ReplayEventsCommand::new(config.replay_stream.clone(), ReplayTarget::DomainEvent);
    commands.dispatch(&ctx, replay.clone()).await?;
    // 重复回放：投影按消息 ID 去重
    commands.dispatch(&ctx, replay).await?;

    info!("running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    bus.shutdown();
    bus.join().await;
    info!("bye");
    Ok(())
}
