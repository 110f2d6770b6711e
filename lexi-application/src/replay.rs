//! 事件流回放命令（ReplayEventsCommand）
//!
//! 外部端点（HTTP/RPC）接收 `{ streamId, fromVersion, toVersion, target }`，
//! 反序列化为命令后经命令总线分发给 `ReplayEventsHandler`。
//! 字段名兼容 camelCase 与 PascalCase。
//!
use async_trait::async_trait;
use lexi_domain::eventing::{EventReplayer, ReplayTarget};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::{
    command::Command, command_handler::CommandHandler, context::AppContext, error::AppError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayEventsCommand {
    #[serde(alias = "StreamId")]
    pub stream_id: String,
    #[serde(default, alias = "FromVersion")]
    pub from_version: i64,
    #[serde(default, alias = "ToVersion")]
    pub to_version: Option<i64>,
    #[serde(alias = "Target")]
    pub target: ReplayTarget,
}

impl Command for ReplayEventsCommand {
    const NAME: &'static str = "ReplayEvents";
}

impl ReplayEventsCommand {
    pub fn new(stream_id: impl Into<String>, target: ReplayTarget) -> Self {
        Self {
            stream_id: stream_id.into(),
            from_version: 0,
            to_version: None,
            target,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.stream_id.trim().is_empty() {
            return Err(AppError::Validation("streamId must not be empty".into()));
        }
        if self.from_version < 0 {
            return Err(AppError::Validation("fromVersion must not be negative".into()));
        }
        if let Some(to) = self.to_version
            && to < self.from_version
        {
            return Err(AppError::Validation(format!(
                "toVersion {to} is below fromVersion {}",
                self.from_version
            )));
        }
        Ok(())
    }
}

pub struct ReplayEventsHandler {
    replayer: Arc<EventReplayer>,
}

impl ReplayEventsHandler {
    pub fn new(replayer: Arc<EventReplayer>) -> Self {
        Self { replayer }
    }
}

#[async_trait]
impl CommandHandler<ReplayEventsCommand> for ReplayEventsHandler {
    async fn handle(&self, ctx: &AppContext, cmd: ReplayEventsCommand) -> Result<(), AppError> {
        cmd.validate()?;

        let report = self
            .replayer
            .replay(&cmd.stream_id, cmd.from_version, cmd.to_version, cmd.target)
            .await?;

        info!(
            stream_id = %report.stream_id,
            replayed = report.replayed,
            skipped = report.skipped,
            last_version = ?report.last_version,
            actor_id = ctx.actor_id.as_deref().unwrap_or("-"),
            correlation_id = ?ctx.correlation_id,
            "replay command handled"
        );
        Ok(())
    }
}
