//! 事件处理器（EventHandler）与处理器注册表
//!
//! 处理器按事件名登记；注册时将强类型处理器擦除为统一闭包，
//! 闭包内部完成载荷反序列化，因此本地与分布式投递走的是同一套调用代码。
//!
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::domain_event::{ChannelOptions, DeliveryContext, Event, EventEnvelope};

/// 事件处理器：处理某一类型的事件
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    /// 处理器名称（用于日志与审计）
    fn handler_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 处理事件；返回的错误只会被记录，不会影响发布方与其它处理器
    async fn handle(&self, event: E, ctx: &DeliveryContext) -> anyhow::Result<()>;
}

type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

type HandlerFn = Arc<dyn Fn(Arc<EventEnvelope>, DeliveryContext) -> HandlerFuture + Send + Sync>;

#[derive(Clone)]
pub(crate) struct RegisteredHandler {
    name: Arc<str>,
    call: HandlerFn,
}

/// 处理器注册表：事件名 -> 处理器列表
#[derive(Default)]
pub struct HandlerRegistry {
    by_event: DashMap<String, Vec<RegisteredHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为事件类型 `E` 注册处理器，同一事件可注册多个处理器，按注册顺序调用
    pub fn register<E, H>(&self, handler: Arc<H>)
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        let name: Arc<str> = Arc::from(handler.handler_name());

        let call: HandlerFn = Arc::new(
            move |envelope: Arc<EventEnvelope>, ctx: DeliveryContext| -> HandlerFuture {
                let handler = handler.clone();

                Box::pin(async move {
                    let event: E = envelope.decode()?;
                    handler.handle(event, &ctx).await
                })
            },
        );

        debug!(event = E::event_name(), handler = %name, "event handler registered");
        self.by_event
            .entry(E::event_name().to_string())
            .or_default()
            .push(RegisteredHandler { name, call });
    }

    /// 某事件名下已注册的处理器数量
    pub fn handler_count(&self, event_name: &str) -> usize {
        self.by_event.get(event_name).map(|h| h.len()).unwrap_or(0)
    }

    /// 已注册处理器的事件名列表
    pub fn event_names(&self) -> Vec<String> {
        self.by_event.iter().map(|e| e.key().clone()).collect()
    }

    pub(crate) fn handlers_for(&self, event_name: &str) -> Vec<RegisteredHandler> {
        self.by_event
            .get(event_name)
            .map(|h| h.value().clone())
            .unwrap_or_default()
    }
}

/// 依次调用处理器，逐个等待完成；单个处理器的错误或 panic 只记录日志。
/// 关闭信号触发后不再发起新的调用。
pub(crate) async fn dispatch(
    handlers: &[RegisteredHandler],
    envelope: Arc<EventEnvelope>,
    ctx: &DeliveryContext,
    options: ChannelOptions,
    token: &CancellationToken,
) {
    for h in handlers {
        if token.is_cancelled() {
            debug!(
                event = envelope.full_name(),
                "shutdown in progress, remaining handlers skipped"
            );
            break;
        }

        let fut = (h.call)(envelope.clone(), ctx.clone());
        let outcome = if options.allow_synchronous_continuations {
            AssertUnwindSafe(fut)
                .catch_unwind()
                .await
                .map_err(|p| panic_message(p.as_ref()))
        } else {
            tokio::spawn(fut).await.map_err(|e| match e.try_into_panic() {
                Ok(p) => panic_message(p.as_ref()),
                Err(e) => e.to_string(),
            })
        };

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(
                event = envelope.full_name(),
                handler = %h.name,
                origin = ?ctx.origin(),
                error = %err,
                "event handler failed"
            ),
            Err(panic) => error!(
                event = envelope.full_name(),
                handler = %h.name,
                origin = ?ctx.origin(),
                panic = %panic,
                "event handler panicked"
            ),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ping {
        n: u32,
    }
    impl Event for Ping {
        fn event_name() -> &'static str {
            "Ping"
        }
    }

    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<(&'static str, u32)>>>,
        fail: bool,
        panic: bool,
    }

    #[async_trait]
    impl EventHandler<Ping> for Recorder {
        fn handler_name(&self) -> &str {
            self.name
        }

        async fn handle(&self, event: Ping, _ctx: &DeliveryContext) -> anyhow::Result<()> {
            if self.panic {
                panic!("boom");
            }
            self.seen.lock().unwrap().push((self.name, event.n));
            if self.fail {
                anyhow::bail!("requested failure");
            }
            Ok(())
        }
    }

    fn recorder(
        name: &'static str,
        seen: &Arc<Mutex<Vec<(&'static str, u32)>>>,
        fail: bool,
        panic: bool,
    ) -> Arc<Recorder> {
        Arc::new(Recorder {
            name,
            seen: seen.clone(),
            fail,
            panic,
        })
    }

    async fn run(registry: &HandlerRegistry, options: ChannelOptions, n: u32) {
        let env = Arc::new(EventEnvelope::wrap(&Ping { n }).unwrap());
        let handlers = registry.handlers_for("Ping");
        dispatch(
            &handlers,
            env,
            &DeliveryContext::local(),
            options,
            &CancellationToken::new(),
        )
        .await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failing_and_panicking_handlers_do_not_stop_the_rest() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let registry = HandlerRegistry::new();
        registry.register::<Ping, _>(recorder("panics", &seen, false, true));
        registry.register::<Ping, _>(recorder("fails", &seen, true, false));
        registry.register::<Ping, _>(recorder("ok", &seen, false, false));
        assert_eq!(registry.handler_count("Ping"), 3);

        run(&registry, ChannelOptions::default(), 1).await;
        let detached = ChannelOptions::builder()
            .allow_synchronous_continuations(false)
            .build();
        run(&registry, detached, 2).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("fails", 1), ("ok", 1), ("fails", 2), ("ok", 2)]
        );
    }

    #[tokio::test]
    async fn cancelled_token_skips_invocation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let registry = HandlerRegistry::new();
        registry.register::<Ping, _>(recorder("ok", &seen, false, false));

        let token = CancellationToken::new();
        token.cancel();
        let env = Arc::new(EventEnvelope::wrap(&Ping { n: 1 }).unwrap());
        dispatch(
            &registry.handlers_for("Ping"),
            env,
            &DeliveryContext::local(),
            ChannelOptions::default(),
            &token,
        )
        .await;

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_event_has_no_handlers() {
        let registry = HandlerRegistry::new();
        assert_eq!(registry.handler_count("Nope"), 0);
        assert!(registry.handlers_for("Nope").is_empty());
        assert!(registry.event_names().is_empty());
    }
}
