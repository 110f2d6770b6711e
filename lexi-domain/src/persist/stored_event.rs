//! 事件存储中的历史事件（StoredEvent）
//!
//! 事件存储为外部协作方所有；回放器只读消费该形态。
//! 同一流内 `version` 单调递增且无空洞。
//!
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain_event::{EventEnvelope, ReplayMetadata};

#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    /// 事件类型名，与信封中的 `fullName` 对应
    event_type: String,
    /// JSON 序列化的事件载荷
    data: String,
    /// 流内版本号，从 1 开始
    version: i64,
    /// 事件写入时间
    #[builder(default = Utc::now())]
    timestamp: DateTime<Utc>,
    /// 追加时附带的元数据（原样保存）
    metadata: Option<String>,
}

impl StoredEvent {
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    /// 该历史事件的稳定消息 ID
    pub fn message_id(&self, stream_id: &str) -> String {
        format!("{stream_id}:{}", self.version)
    }

    /// 生成回放元数据
    pub fn replay_metadata(&self, stream_id: &str) -> ReplayMetadata {
        ReplayMetadata::builder()
            .message_id(self.message_id(stream_id))
            .stream_id(stream_id.to_string())
            .version(self.version)
            .occurred_at(self.timestamp)
            .maybe_metadata(self.metadata.clone())
            .build()
    }

    /// 以给定事件名重新封装为带回放标记的信封
    pub fn to_replay_envelope(&self, stream_id: &str, full_name: &str) -> EventEnvelope {
        EventEnvelope::new(full_name, self.data.clone())
            .with_replay(self.replay_metadata(stream_id))
    }
}
