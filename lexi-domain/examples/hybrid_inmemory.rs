/// 混合事件总线（内存版）示例
/// 展示本地发布、经内存 Broker 的分布式投递、Saga 关联传递与事件回放
use anyhow::Result as AnyResult;
use lexi_domain::domain_event::{
    DeliveryContext, Event, IntegrationEvent, create_next_event,
};
use lexi_domain::eventing::{
    DistributedTransport, EventBusOptions, EventHandler, EventReplayer, HybridEventBus,
    InMemoryTransport, ReplayTarget,
};
use lexi_domain::persist::{EventStore, EventStoreExt, InMemoryEventStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// 事件定义
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardReviewed {
    card_id: u32,
    grade: u8,
}

impl Event for CardReviewed {
    fn event_name() -> &'static str {
        "CardReviewed"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeckPublished {
    correlation_id: Uuid,
    deck_id: u32,
}

impl Event for DeckPublished {
    fn event_name() -> &'static str {
        "DeckPublished"
    }
    fn as_integration(&self) -> Option<&dyn IntegrationEvent> {
        Some(self)
    }
}

impl IntegrationEvent for DeckPublished {
    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeckIndexed {
    correlation_id: Uuid,
    deck_id: u32,
}

impl Event for DeckIndexed {
    fn event_name() -> &'static str {
        "DeckIndexed"
    }
    fn as_integration(&self) -> Option<&dyn IntegrationEvent> {
        Some(self)
    }
}

impl IntegrationEvent for DeckIndexed {
    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

// ============================================================================
// 示例处理器
// ============================================================================

struct PrintReview;

#[async_trait::async_trait]
impl EventHandler<CardReviewed> for PrintReview {
    async fn handle(&self, event: CardReviewed, ctx: &DeliveryContext) -> AnyResult<()> {
        println!(
            "review card={} grade={} origin={:?} version={:?}",
            event.card_id,
            event.grade,
            ctx.origin(),
            ctx.replay_metadata().map(|m| m.version())
        );
        Ok(())
    }
}

struct IndexDeck {
    bus: Arc<HybridEventBus>,
}

#[async_trait::async_trait]
impl EventHandler<DeckPublished> for IndexDeck {
    async fn handle(&self, event: DeckPublished, ctx: &DeliveryContext) -> AnyResult<()> {
        println!(
            "deck published id={} correlation={} origin={:?}",
            event.deck_id,
            event.correlation_id,
            ctx.origin()
        );
        let next = create_next_event(&event, |correlation_id| DeckIndexed {
            correlation_id,
            deck_id: event.deck_id,
        })?;
        self.bus.publish(&next).await?;
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> AnyResult<()> {
    println!("=== 混合事件总线（内存版）示例 ===\n");

    let broker = Arc::new(InMemoryTransport::new(1024));
    let bus = Arc::new(
        HybridEventBus::builder()
            .options(EventBusOptions::with_redis("redis://in-memory"))
            .transport(broker.clone() as Arc<dyn DistributedTransport>)
            .build()?,
    );
    bus.register_event::<CardReviewed>()
        .register_integration_event::<DeckPublished>()
        .register_integration_event::<DeckIndexed>();
    bus.subscribe::<CardReviewed, _>(Arc::new(PrintReview));
    bus.subscribe::<DeckPublished, _>(Arc::new(IndexDeck { bus: bus.clone() }));
    bus.start();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // 本地领域事件
    bus.publish(&CardReviewed { card_id: 1, grade: 4 }).await?;
    // Saga 集成事件经 Broker 回到本进程
    bus.publish(&DeckPublished {
        correlation_id: Uuid::new_v4(),
        deck_id: 7,
    })
    .await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // 回放
    let store = Arc::new(InMemoryEventStore::new());
    let reviews: Vec<CardReviewed> = (1..=3)
        .map(|grade| CardReviewed { card_id: 2, grade })
        .collect();
    store.append("card-2", &reviews, None).await?;
    let replayer = EventReplayer::builder()
        .store(store as Arc<dyn EventStore>)
        .bus(bus.clone())
        .build();
    let report = replayer
        .replay("card-2", 0, None, ReplayTarget::DomainEvent)
        .await?;
    println!("replay report: {report:?}");
    tokio::time::sleep(Duration::from_millis(200)).await;

    println!("\nbroker traffic:");
    for m in broker.published() {
        println!("  {} -> {}", m.channel, m.payload);
    }

    bus.shutdown();
    bus.join().await;
    println!("\n=== 示例结束 ===");
    Ok(())
}
