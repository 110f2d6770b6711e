use crate::{
    command::Command, command_bus::CommandBus, command_handler::CommandHandler,
    context::AppContext, error::AppError,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

type CmdHandlerFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send>>;

type CmdHandlerFn = Arc<dyn Fn(Box<dyn Any + Send>, AppContext) -> CmdHandlerFuture + Send + Sync>;

/// 基于内存的 CommandBus 实现
/// - 通过 TypeId 注册不同 Command 对应的 Handler
/// - 运行时以类型擦除（Any）方式进行调度
#[derive(Default)]
pub struct InMemoryCommandBus {
    handlers: DashMap<TypeId, CmdHandlerFn>,
}

impl InMemoryCommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册命令处理器；重复注册时后者覆盖前者
    pub fn register<C, H>(&self, handler: Arc<H>)
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let f: CmdHandlerFn = Arc::new(
            move |boxed_cmd: Box<dyn Any + Send>, ctx: AppContext| -> CmdHandlerFuture {
                let handler = handler.clone();

                Box::pin(async move {
                    // 键与闭包同属泛型 C，downcast 不会失败
                    match boxed_cmd.downcast::<C>() {
                        Ok(cmd) => handler.handle(&ctx, *cmd).await,
                        Err(_) => Err(AppError::TypeMismatch {
                            expected: C::NAME,
                            found: "unknown",
                        }),
                    }
                })
            },
        );

        if self.handlers.insert(TypeId::of::<C>(), f).is_some() {
            warn!(command = C::NAME, "command handler replaced");
        } else {
            debug!(command = C::NAME, "command handler registered");
        }
    }

    pub fn is_registered<C: Command>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<C>())
    }
}

#[async_trait]
impl CommandBus for InMemoryCommandBus {
    async fn dispatch<C: Command>(&self, ctx: &AppContext, cmd: C) -> Result<(), AppError> {
        let Some(f) = self.handlers.get(&TypeId::of::<C>()).map(|h| h.clone()) else {
            return Err(AppError::HandlerNotFound(C::NAME));
        };

        debug!(command = C::NAME, correlation_id = ?ctx.correlation_id, "dispatching command");
        (f)(Box::new(cmd), ctx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Ping;
    impl Command for Ping {
        const NAME: &'static str = "Ping";
    }

    struct Pong;
    impl Command for Pong {
        const NAME: &'static str = "Pong";
    }

    struct Count(AtomicUsize);

    #[async_trait]
    impl CommandHandler<Ping> for Count {
        async fn handle(&self, _ctx: &AppContext, _cmd: Ping) -> Result<(), AppError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn routes_by_command_type() {
        let bus = InMemoryCommandBus::new();
        let counter = Arc::new(Count(AtomicUsize::new(0)));
        bus.register::<Ping, _>(counter.clone());
        assert!(bus.is_registered::<Ping>());

        bus.dispatch(&AppContext::default(), Ping).await.unwrap();
        bus.dispatch(&AppContext::default(), Ping).await.unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);

        let err = bus.dispatch(&AppContext::default(), Pong).await.unwrap_err();
        assert!(matches!(err, AppError::HandlerNotFound("Pong")));
    }
}
