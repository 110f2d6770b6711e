use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 回放元数据：随回放流量一并投递，消费者可据 `message_id`/`version` 去重
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayMetadata {
    /// 原始消息 ID（`{stream_id}:{version}`，对同一条历史事件稳定不变）
    message_id: String,
    stream_id: String,
    /// 事件在流中的版本号
    version: i64,
    /// 原始事件发生时间
    occurred_at: DateTime<Utc>,
    /// 本次回放时间
    #[builder(default = Utc::now())]
    replayed_at: DateTime<Utc>,
    /// 事件存储中的原始元数据（原样透传）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<String>,
}

impl ReplayMetadata {
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn occurred_at(&self) -> &DateTime<Utc> {
        &self.occurred_at
    }

    pub fn replayed_at(&self) -> &DateTime<Utc> {
        &self.replayed_at
    }

    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }
}
