//! 事件契约（Event Contracts）
//!
//! 定义可发布事件需要实现的最小接口（`Event`）、Saga 集成事件标记
//! （`IntegrationEvent`）、线上信封 `EventEnvelope`、按类型声明的通道配置，
//! 以及投递上下文与 Saga 关联辅助函数。

mod channel_options;
mod domain_event_trait;
mod event_context;
mod event_envelope;
mod metadata;
mod saga;

pub use channel_options::ChannelOptions;
pub use domain_event_trait::{Event, EventKind, IntegrationEvent};
pub use event_context::{DeliveryContext, DeliveryOrigin};
pub use event_envelope::EventEnvelope;
pub use metadata::ReplayMetadata;
pub use saga::create_next_event;
