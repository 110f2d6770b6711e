//! 事件子系统（eventing）
//!
//! 提供混合（本地 + 分布式）事件总线的运行时：
//! - `LocalEventBus`：按事件名惰性创建的 FIFO 通道与后台分发；
//! - `EventHandler`/`HandlerRegistry`：处理器协议与注册表，各投递路径共用；
//! - `EventTypeRegistry`：事件名到类型信息的显式登记表；
//! - `DistributedTransport`：跨进程发布/订阅协议，含 Redis 与内存实现；
//! - `DistributedSubscriber`：把分布式消息转入本地通道的长驻任务；
//! - `HybridEventBus`：按配置与事件种类选择投递路径的统一入口；
//! - `EventReplayer`：从事件存储回放历史事件；
//! - `IdempotencyStore`：供消费端按消息 ID 去重。
//!
mod handler;
mod hybrid;
mod idempotency;
mod local;
mod options;
mod registry;
mod replay;
mod subscriber;
mod transport;
mod transport_inmemory;
#[cfg(feature = "redis")]
mod transport_redis;

pub use handler::{EventHandler, HandlerRegistry};
pub use hybrid::HybridEventBus;
#[cfg(feature = "redis")]
pub use idempotency::RedisIdempotencyStore;
pub use idempotency::{IdempotencyStore, InMemoryIdempotencyStore};
pub use local::LocalEventBus;
pub use options::{
    DEFAULT_IDEMPOTENCY_EXPIRE_SECONDS, DEFAULT_REDIS_PREFIX, EventBusOptions, RedisOptions,
};
pub use registry::{EventRegistration, EventTypeRegistry};
pub use replay::{EventReplayer, ReplayReport, ReplayTarget};
pub use subscriber::{DEFAULT_RECONNECT_DELAY, DistributedSubscriber};
pub use transport::{DistributedTransport, TransportMessage, channel_name, subscribe_pattern};
pub use transport_inmemory::InMemoryTransport;
#[cfg(feature = "redis")]
pub use transport_redis::RedisTransport;
