//! 事件类型注册表（EventTypeRegistry）
//!
//! 启动时显式登记 `事件名 -> {种类, 通道配置, 载荷校验}`，
//! 供分布式订阅与事件回放按名称解析类型；未登记的名称一律视为未知类型。
//! 仅订阅而未登记的类型也会记下通道配置，各投递路径创建通道时取值一致。
//!
use dashmap::DashMap;
use tracing::warn;

use crate::domain_event::{ChannelOptions, Event, EventKind, IntegrationEvent};
use crate::error::EventBusResult;

/// 单个事件类型的登记信息
#[derive(Clone, Copy)]
pub struct EventRegistration {
    name: &'static str,
    kind: EventKind,
    options: ChannelOptions,
    validate: fn(&str) -> EventBusResult<()>,
}

impl EventRegistration {
    fn of<E: Event>(kind: EventKind) -> Self {
        Self {
            name: E::event_name(),
            kind,
            options: E::channel_options(),
            validate: validate_payload::<E>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn options(&self) -> ChannelOptions {
        self.options
    }

    /// 校验载荷可被反序列化为登记的类型
    pub fn validate(&self, data: &str) -> EventBusResult<()> {
        (self.validate)(data)
    }
}

impl std::fmt::Debug for EventRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistration")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn validate_payload<E: Event>(data: &str) -> EventBusResult<()> {
    serde_json::from_str::<E>(data)?;
    Ok(())
}

#[derive(Default)]
pub struct EventTypeRegistry {
    by_name: DashMap<String, EventRegistration>,
    declared_options: DashMap<String, ChannelOptions>,
}

impl EventTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记进程内领域事件
    pub fn register<E: Event>(&self) -> &Self {
        self.insert(EventRegistration::of::<E>(EventKind::Domain))
    }

    /// 登记 Saga 集成事件
    pub fn register_integration<E: Event + IntegrationEvent>(&self) -> &Self {
        self.insert(EventRegistration::of::<E>(EventKind::Integration))
    }

    fn insert(&self, registration: EventRegistration) -> &Self {
        if let Some(previous) = self
            .by_name
            .insert(registration.name.to_string(), registration)
            && previous.kind != registration.kind
        {
            warn!(
                event = registration.name,
                previous = ?previous.kind,
                current = ?registration.kind,
                "event type re-registered with a different kind"
            );
        }
        self
    }

    /// 记下 `E` 声明的通道配置，不改变其登记状态
    pub fn declare_options<E: Event>(&self) -> &Self {
        self.declared_options
            .insert(E::event_name().to_string(), E::channel_options());
        self
    }

    pub fn resolve(&self, event_name: &str) -> Option<EventRegistration> {
        self.by_name.get(event_name).map(|r| *r.value())
    }

    pub fn is_registered(&self, event_name: &str) -> bool {
        self.by_name.contains_key(event_name)
    }

    /// 通道配置：登记值优先，其次是订阅时记下的声明，否则取默认配置
    pub fn options_for(&self, event_name: &str) -> ChannelOptions {
        if let Some(registration) = self.resolve(event_name) {
            return registration.options();
        }
        self.declared_options
            .get(event_name)
            .map(|o| *o.value())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
