use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::channel_options::ChannelOptions;

/// 可发布事件需要满足的通用能力边界
///
/// 载荷按约定使用 camelCase 字段与字符串枚举（`#[serde(rename_all = "camelCase")]`），
/// 以便与其它服务的消费者互通。
pub trait Event: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 事件名：既是本地通道键，也是分布式频道名的后缀。
    ///
    /// 默认取完整类型路径；跨服务传递的事件应覆盖为稳定短名，
    /// 因为它必须在所有订阅存续期间唯一且稳定地标识载荷结构。
    fn event_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// 该事件类型的通道配置，仅在首次创建通道时读取一次
    fn channel_options() -> ChannelOptions
    where
        Self: Sized,
    {
        ChannelOptions::default()
    }

    /// Saga 集成事件返回 `Some(self)`，普通事件保持默认 `None`
    fn as_integration(&self) -> Option<&dyn IntegrationEvent> {
        None
    }
}

/// Saga 集成事件：携带跨服务多步流程的关联 ID
///
/// 实现该 trait 的事件还需在 [`Event::as_integration`] 中返回 `Some(self)`，
/// 混合总线据此决定是否走分布式路径。
pub trait IntegrationEvent: Send + Sync {
    /// 关联 ID，事件构造后不可变
    fn correlation_id(&self) -> Uuid;
}

/// 事件种类，在类型注册时声明，回放时据此判断投递目标是否匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// 进程内领域事件
    Domain,
    /// 跨服务 Saga 集成事件
    Integration,
}
