//! 内存版事件存储（InMemoryEventStore）
//!
//! 满足 `EventStore` 协议的轻量实现：每个流一个有序向量，版本从 1 开始无空洞。
//! 典型用途：测试环境、示例与本地开发。
//!
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{EventStore, StoredEvent};
use crate::domain_event::EventEnvelope;
use crate::error::{EventBusError, EventBusResult as Result};

#[derive(Default)]
pub struct InMemoryEventStore {
    streams: DashMap<String, Vec<StoredEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前流的最新版本，空流为 0
    pub fn current_version(&self, stream_id: &str) -> i64 {
        self.streams
            .get(stream_id)
            .and_then(|s| s.last().map(StoredEvent::version))
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append_events(
        &self,
        stream_id: &str,
        events: &[EventEnvelope],
        metadata: Option<&str>,
    ) -> Result<i64> {
        if stream_id.is_empty() {
            return Err(EventBusError::event_store("stream id must not be empty"));
        }

        // entry 持有分片锁，保证同一流的并发追加按序分配版本
        let mut stream = self.streams.entry(stream_id.to_string()).or_default();
        let mut version = stream.last().map(StoredEvent::version).unwrap_or(0);

        for env in events {
            version += 1;
            stream.push(
                StoredEvent::builder()
                    .event_type(env.full_name().to_string())
                    .data(env.data().to_string())
                    .version(version)
                    .timestamp(Utc::now())
                    .maybe_metadata(metadata.map(str::to_string))
                    .build(),
            );
        }

        Ok(version)
    }

    async fn read_stored_events(
        &self,
        stream_id: &str,
        from_version: i64,
        to_version: Option<i64>,
    ) -> Result<Vec<StoredEvent>> {
        let Some(stream) = self.streams.get(stream_id) else {
            return Ok(Vec::new());
        };

        Ok(stream
            .iter()
            .filter(|e| {
                e.version() >= from_version && to_version.is_none_or(|to| e.version() <= to)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envs(n: usize) -> Vec<EventEnvelope> {
        (1..=n)
            .map(|i| EventEnvelope::new("Foo", format!(r#"{{"value":{i}}}"#)))
            .collect()
    }

    #[tokio::test]
    async fn versions_are_gapless_per_stream() {
        let store = InMemoryEventStore::new();
        assert_eq!(store.append_events("s1", &envs(3), None).await.unwrap(), 3);
        assert_eq!(store.append_events("s1", &envs(2), Some("m")).await.unwrap(), 5);
        assert_eq!(store.append_events("s2", &envs(1), None).await.unwrap(), 1);

        let all = store.read_stored_events("s1", 0, None).await.unwrap();
        let versions: Vec<i64> = all.iter().map(StoredEvent::version).collect();
        assert_eq!(versions, vec![1, 2, 3, 4, 5]);
        assert_eq!(all[4].metadata(), Some("m"));
        assert_eq!(store.current_version("s2"), 1);
        assert_eq!(store.current_version("missing"), 0);
    }

    #[tokio::test]
    async fn read_range_is_inclusive() {
        let store = InMemoryEventStore::new();
        store.append_events("s1", &envs(5), None).await.unwrap();

        let ranged = store.read_stored_events("s1", 2, Some(4)).await.unwrap();
        let versions: Vec<i64> = ranged.iter().map(StoredEvent::version).collect();
        assert_eq!(versions, vec![2, 3, 4]);

        assert!(store.read_stored_events("nope", 0, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_stream_id_is_rejected() {
        let store = InMemoryEventStore::new();
        assert!(store.append_events("", &envs(1), None).await.is_err());
    }
}
