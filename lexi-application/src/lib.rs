//! 应用层（lexi-application）
//!
//! 以命令总线承接外部触发的写操作：
//! - `Command`/`CommandHandler`/`CommandBus`：命令协议与路由；
//! - `InMemoryCommandBus`：进程内按类型分发的实现；
//! - `ReplayEventsCommand`：事件流回放的触发命令，由 HTTP/RPC 端点反序列化后分发。
//!
pub mod command;
pub mod command_bus;
pub mod command_handler;
pub mod context;
pub mod error;
pub mod inmemory_command_bus;
pub mod replay;

pub use inmemory_command_bus::InMemoryCommandBus;
pub use replay::{ReplayEventsCommand, ReplayEventsHandler};
