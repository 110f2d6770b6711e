use bon::Builder;
use uuid::Uuid;

/// 应用层上下文（Application Context）
///
/// 承载一次命令调用的横切信息：
/// - 关联 ID（`correlation_id`）：用于串联日志与 Saga 链路；
/// - 执行者（`actor_id`）：审计主体；
/// - 幂等键（`idempotency_key`）：用于在基础设施层实现请求幂等（如 API 层重复提交保护）。
///
/// 典型用法：
/// ```rust
/// use lexi_application::context::AppContext;
///
/// let ctx = AppContext::builder()
///     .correlation_id(uuid::Uuid::new_v4())
///     .actor_id("ops-1".into())
///     .idempotency_key("idem-xyz".into())
///     .build();
/// assert_eq!(ctx.actor_id.as_deref(), Some("ops-1"));
/// ```
#[derive(Builder, Clone, Debug, Default)]
pub struct AppContext {
    pub correlation_id: Option<Uuid>,
    pub actor_id: Option<String>,
    /// 幂等键（可选）：为空则由上层或基础设施决定是否参与幂等
    pub idempotency_key: Option<String>,
}
