//! 演示用事件：一次复习会话的 Saga 与单词复习的领域事件
//!
use lexi_domain::domain_event::{ChannelOptions, Event, IntegrationEvent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordReviewed {
    pub learner_id: String,
    pub word: String,
    pub grade: Grade,
}

impl Event for WordReviewed {
    fn event_name() -> &'static str {
        "WordReviewed"
    }

    // 同一学习者的复习记录由单一写入方产生
    fn channel_options() -> ChannelOptions {
        ChannelOptions::builder().single_writer(true).build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSessionStarted {
    pub correlation_id: Uuid,
    pub learner_id: String,
    pub words: Vec<String>,
}

impl Event for ReviewSessionStarted {
    fn event_name() -> &'static str {
        "ReviewSessionStarted"
    }

    fn as_integration(&self) -> Option<&dyn IntegrationEvent> {
        Some(self)
    }
}

impl IntegrationEvent for ReviewSessionStarted {
    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSessionScheduled {
    pub correlation_id: Uuid,
    pub learner_id: String,
    pub due_in_hours: u32,
}

impl Event for ReviewSessionScheduled {
    fn event_name() -> &'static str {
        "ReviewSessionScheduled"
    }

    fn as_integration(&self) -> Option<&dyn IntegrationEvent> {
        Some(self)
    }
}

impl IntegrationEvent for ReviewSessionScheduled {
    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
