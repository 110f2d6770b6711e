//! 混合事件总线领域层（lexi-domain）
//!
//! 为应用提供统一的事件发布入口，按配置与事件种类在进程内通道与 Redis Pub/Sub 之间选择投递路径：
//! - 事件契约（`domain_event`）：`Event`/`IntegrationEvent`、线上信封、通道配置、Saga 关联；
//! - 事件存储端口（`persist`）：回放所依赖的追加/读取协议与内存实现；
//! - 事件运行时（`eventing`）：本地通道、分布式传输与订阅、混合总线、回放与幂等守卫；
//! - 统一错误（`error`）。
//!
//! 典型用法：
//! 1. 为事件实现 `Event`（Saga 事件另实现 `IntegrationEvent`）；
//! 2. 以 `EventBusOptions` 构建 `HybridEventBus`，登记事件类型并注册处理器；
//! 3. 调用 `start` 启动分布式订阅，通过 `publish` 发布事件；
//! 4. 需要重建读模型时，用 `EventReplayer` 从事件存储回放某条流。
//!
pub mod domain_event;
pub mod error;
pub mod eventing;
pub mod persist;
