use uuid::Uuid;

use super::domain_event_trait::IntegrationEvent;
use crate::error::{EventBusError, EventBusResult};

/// 由因果事件派生 Saga 中的下一个事件，沿用同一关联 ID
///
/// 工厂拿到因果事件的关联 ID 构造后续事件；若产物未携带该 ID 则返回
/// `CorrelationMismatch`，保证关联链不会在中途被重新生成。
pub fn create_next_event<C, N, F>(causal: &C, factory: F) -> EventBusResult<N>
where
    C: IntegrationEvent + ?Sized,
    N: IntegrationEvent,
    F: FnOnce(Uuid) -> N,
{
    let correlation_id = causal.correlation_id();
    let next = factory(correlation_id);

    if next.correlation_id() != correlation_id {
        return Err(EventBusError::CorrelationMismatch {
            expected: correlation_id,
            found: next.correlation_id(),
        });
    }

    Ok(next)
}
