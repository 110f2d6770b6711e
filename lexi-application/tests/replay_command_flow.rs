use anyhow::Result as AnyResult;
use async_trait::async_trait;
use lexi_application::command_bus::CommandBus;
use lexi_application::context::AppContext;
use lexi_application::error::AppError;
use lexi_application::{InMemoryCommandBus, ReplayEventsCommand, ReplayEventsHandler};
use lexi_domain::domain_event::{DeliveryContext, Event};
use lexi_domain::eventing::{EventHandler, EventReplayer, HybridEventBus, ReplayTarget};
use lexi_domain::persist::{EventStore, EventStoreExt, InMemoryEventStore};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LessonFinished {
    lesson: u32,
}
impl Event for LessonFinished {
    fn event_name() -> &'static str {
        "LessonFinished"
    }
}

struct Progress(Arc<Mutex<Vec<u32>>>);

#[async_trait]
impl EventHandler<LessonFinished> for Progress {
    async fn handle(&self, event: LessonFinished, _ctx: &DeliveryContext) -> AnyResult<()> {
        self.0.lock().unwrap().push(event.lesson);
        Ok(())
    }
}

async fn setup() -> AnyResult<(InMemoryCommandBus, Arc<Mutex<Vec<u32>>>)> {
    let store = Arc::new(InMemoryEventStore::new());
    let lessons: Vec<LessonFinished> = (1..=5).map(|lesson| LessonFinished { lesson }).collect();
    store.append("learner-1", &lessons, None).await?;

    let bus = Arc::new(HybridEventBus::builder().build()?);
    bus.register_event::<LessonFinished>();
    let seen = Arc::new(Mutex::new(Vec::new()));
    bus.subscribe::<LessonFinished, _>(Arc::new(Progress(seen.clone())));

    let replayer = EventReplayer::builder()
        .store(store as Arc<dyn EventStore>)
        .bus(bus)
        .build();
    let commands = InMemoryCommandBus::new();
    commands.register::<ReplayEventsCommand, _>(Arc::new(ReplayEventsHandler::new(Arc::new(
        replayer,
    ))));
    Ok((commands, seen))
}

#[tokio::test(flavor = "multi_thread")]
async fn replay_command_from_json_drives_the_replayer() -> AnyResult<()> {
    let (commands, seen) = setup().await?;

    let cmd: ReplayEventsCommand = serde_json::from_str(
        r#"{"StreamId":"learner-1","FromVersion":2,"ToVersion":4,"Target":"DomainEvent"}"#,
    )?;
    let ctx = AppContext::builder().actor_id("ops".into()).build();
    commands.dispatch(&ctx, cmd).await?;

    let _ = tokio::time::timeout(Duration::from_secs(2), async {
        while seen.lock().unwrap().len() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert_eq!(*seen.lock().unwrap(), vec![2, 3, 4]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_window_is_rejected_before_reading_the_store() -> AnyResult<()> {
    let (commands, seen) = setup().await?;

    let mut cmd = ReplayEventsCommand::new("learner-1", ReplayTarget::DomainEvent);
    cmd.from_version = 4;
    cmd.to_version = Some(1);
    let err = commands
        .dispatch(&AppContext::default(), cmd)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(seen.lock().unwrap().is_empty());
    Ok(())
}
