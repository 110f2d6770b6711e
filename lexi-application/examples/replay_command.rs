use async_trait::async_trait;
use lexi_application::command_bus::CommandBus;
use lexi_application::context::AppContext;
use lexi_application::error::AppError;
use lexi_application::{InMemoryCommandBus, ReplayEventsCommand, ReplayEventsHandler};
use lexi_domain::domain_event::{DeliveryContext, Event};
use lexi_domain::eventing::{EventHandler, EventReplayer, HybridEventBus};
use lexi_domain::persist::{EventStore, EventStoreExt, InMemoryEventStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WordAdded {
    word: String,
}

impl Event for WordAdded {
    fn event_name() -> &'static str {
        "WordAdded"
    }
}

struct PrintWord;

#[async_trait]
impl EventHandler<WordAdded> for PrintWord {
    async fn handle(&self, event: WordAdded, ctx: &DeliveryContext) -> anyhow::Result<()> {
        let version = ctx.replay_metadata().map(|m| m.version()).unwrap_or_default();
        println!("v{version}: {}", event.word);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(InMemoryEventStore::new());
    let words: Vec<WordAdded> = ["apple", "banana", "cherry"]
        .into_iter()
        .map(|w| WordAdded { word: w.into() })
        .collect();
    store.append("vocab-1", &words, None).await?;

    let bus = Arc::new(HybridEventBus::builder().build()?);
    bus.register_event::<WordAdded>();
    bus.subscribe::<WordAdded, _>(Arc::new(PrintWord));

    let replayer = EventReplayer::builder()
        .store(store as Arc<dyn EventStore>)
        .bus(bus.clone())
        .build();
    let commands = InMemoryCommandBus::new();
    commands.register::<ReplayEventsCommand, _>(Arc::new(ReplayEventsHandler::new(Arc::new(
        replayer,
    ))));

    // 外部端点收到的请求体
    let body = r#"{"streamId":"vocab-1","target":"DomainEvent"}"#;
    let cmd: ReplayEventsCommand = serde_json::from_str(body)?;
    commands.dispatch(&AppContext::default(), cmd).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // 非法区间 -> Validation
    let bad = r#"{"streamId":"vocab-1","fromVersion":3,"toVersion":1,"target":"DomainEvent"}"#;
    if let Err(AppError::Validation(reason)) = commands
        .dispatch(&AppContext::default(), serde_json::from_str::<ReplayEventsCommand>(bad)?)
        .await
    {
        eprintln!("rejected as expected: {reason}");
    }

    bus.shutdown();
    bus.join().await;
    Ok(())
}
