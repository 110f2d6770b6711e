//! 演示用事件处理器
//!
use async_trait::async_trait;
use lexi_domain::domain_event::{DeliveryContext, create_next_event};
use lexi_domain::eventing::{EventHandler, HybridEventBus, IdempotencyStore};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

use crate::events::{Grade, ReviewSessionScheduled, ReviewSessionStarted, WordReviewed};

/// 学习进度投影：回放流量按消息 ID 去重
pub struct ProgressProjection {
    pub dedupe: Arc<dyn IdempotencyStore>,
}

#[async_trait]
impl EventHandler<WordReviewed> for ProgressProjection {
    fn handler_name(&self) -> &str {
        "progress-projection"
    }

    async fn handle(&self, event: WordReviewed, ctx: &DeliveryContext) -> anyhow::Result<()> {
        if let Some(meta) = ctx.replay_metadata()
            && !self.dedupe.try_acquire(meta.message_id()).await?
        {
            info!(message_id = meta.message_id(), "duplicate replay ignored");
            return Ok(());
        }

        info!(
            learner = %event.learner_id,
            word = %event.word,
            grade = ?event.grade,
            origin = ?ctx.origin(),
            version = ?ctx.replay_metadata().map(|m| m.version()),
            "progress updated"
        );
        Ok(())
    }
}

/// Saga 第二步：会话开始后安排下一次复习
///
/// 处理器注册在它所发布的总线上，持弱引用避免引用环。
pub struct SessionScheduler {
    bus: Weak<HybridEventBus>,
}

impl SessionScheduler {
    pub fn new(bus: &Arc<HybridEventBus>) -> Self {
        Self {
            bus: Arc::downgrade(bus),
        }
    }
}

#[async_trait]
impl EventHandler<ReviewSessionStarted> for SessionScheduler {
    fn handler_name(&self) -> &str {
        "session-scheduler"
    }

    async fn handle(
        &self,
        event: ReviewSessionStarted,
        ctx: &DeliveryContext,
    ) -> anyhow::Result<()> {
        let Some(bus) = self.bus.upgrade() else {
            debug!(
                correlation_id = %event.correlation_id,
                "bus dropped, session not scheduled"
            );
            return Ok(());
        };

        info!(
            correlation_id = %event.correlation_id,
            words = event.words.len(),
            origin = ?ctx.origin(),
            "review session started"
        );

        for word in &event.words {
            bus.publish(&WordReviewed {
                learner_id: event.learner_id.clone(),
                word: word.clone(),
                grade: Grade::Good,
            })
            .await?;
        }

        let next = create_next_event(&event, |correlation_id| ReviewSessionScheduled {
            correlation_id,
            learner_id: event.learner_id.clone(),
            due_in_hours: 24,
        })?;
        bus.publish(&next).await?;
        Ok(())
    }
}

pub struct ScheduleLogger;

#[async_trait]
impl EventHandler<ReviewSessionScheduled> for ScheduleLogger {
    async fn handle(
        &self,
        event: ReviewSessionScheduled,
        ctx: &DeliveryContext,
    ) -> anyhow::Result<()> {
        info!(
            correlation_id = %event.correlation_id,
            learner = %event.learner_id,
            due_in_hours = event.due_in_hours,
            origin = ?ctx.origin(),
            "next review scheduled"
        );
        Ok(())
    }
}
