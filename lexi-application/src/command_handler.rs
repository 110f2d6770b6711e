use crate::{command::Command, context::AppContext, error::AppError};
use async_trait::async_trait;

/// 命令处理器：每种命令在 `InMemoryCommandBus` 上至多注册一个，重复注册时后者覆盖前者。
///
/// 处理器通常委托给领域层组件（如 `EventReplayer`），领域错误经 `AppError::EventBus` 透传。
#[async_trait]
pub trait CommandHandler<C>: Send + Sync
where
    C: Command,
{
    async fn handle(&self, ctx: &AppContext, cmd: C) -> Result<(), AppError>;
}
