//! 事件溯源存储端口（persist）
//!
//! 定义回放所依赖的事件存储协议与历史事件形态：
//! - 追加与按版本区间读取（`EventStore`/`EventStoreExt`）；
//! - 存储中的历史事件（`StoredEvent`）及其回放元数据生成；
//! - 内存实现（`InMemoryEventStore`），用于测试与示例。
//!
//! 持久化后端（如 Postgres）由上层提供实现并注入，本模块不绑定具体存储。
//!
mod event_store;
mod in_memory;
mod stored_event;

pub use event_store::{EventStore, EventStoreExt};
pub use in_memory::InMemoryEventStore;
pub use stored_event::StoredEvent;
