/// 应用层命令（Command）
///
/// 外部端点触发的写操作请求，例如要求事件总线回放某条事件流的 `ReplayEvents`。
/// 命令只表达执行结果（成功/失败），回放统计等细节写入日志。
///
/// `NAME` 是命令的稳定名称，用于日志字段与 `AppError::HandlerNotFound`。
pub trait Command: Send + Sync + 'static {
    const NAME: &'static str;
}
