//! 事件存储端口（EventStore）
//!
//! 仅定义追加与按版本区间读取两个操作；持久化实现由基础设施层提供并注入。
//! 存储对每个流只追加、严格按 `version` 排序。
//!
use async_trait::async_trait;
use std::sync::Arc;

use super::StoredEvent;
use crate::domain_event::{Event, EventEnvelope};
use crate::error::EventBusResult as Result;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// 追加事件到流末尾，返回最后一条的版本号
    async fn append_events(
        &self,
        stream_id: &str,
        events: &[EventEnvelope],
        metadata: Option<&str>,
    ) -> Result<i64>;

    /// 读取 `[from_version, to_version]`（闭区间）内的事件，`to_version` 为空表示读到最新
    async fn read_stored_events(
        &self,
        stream_id: &str,
        from_version: i64,
        to_version: Option<i64>,
    ) -> Result<Vec<StoredEvent>>;
}

#[async_trait]
impl<T> EventStore for Arc<T>
where
    T: EventStore + ?Sized,
{
    async fn append_events(
        &self,
        stream_id: &str,
        events: &[EventEnvelope],
        metadata: Option<&str>,
    ) -> Result<i64> {
        (**self).append_events(stream_id, events, metadata).await
    }

    async fn read_stored_events(
        &self,
        stream_id: &str,
        from_version: i64,
        to_version: Option<i64>,
    ) -> Result<Vec<StoredEvent>> {
        (**self)
            .read_stored_events(stream_id, from_version, to_version)
            .await
    }
}

/// 便捷扩展：直接追加强类型事件
#[async_trait]
pub trait EventStoreExt: EventStore {
    async fn append<E: Event>(
        &self,
        stream_id: &str,
        events: &[E],
        metadata: Option<&str>,
    ) -> Result<i64> {
        let envelopes = events
            .iter()
            .map(EventEnvelope::wrap)
            .collect::<Result<Vec<_>>>()?;
        self.append_events(stream_id, &envelopes, metadata).await
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}
