use bon::Builder;

/// 单个事件类型的本地通道配置
///
/// 通道容量恒为无界：发布永不因背压阻塞，代价是消费跟不上时内存持续增长，
/// 调用方不得在没有消费者跟进的情况下无限速率发布。
#[derive(Builder, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOptions {
    /// 单读者声明；本地通道恒由一个后台任务消费，取 false 也不会并发读取
    #[builder(default = true)]
    pub single_reader: bool,
    /// 单写者：为 true 时总线会串行化该通道上的并发发布
    #[builder(default = false)]
    pub single_writer: bool,
    /// 允许同步续延：为 true 时处理器直接在消费任务内执行，否则各自派生任务执行
    #[builder(default = true)]
    pub allow_synchronous_continuations: bool,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            single_reader: true,
            single_writer: false,
            allow_synchronous_continuations: true,
        }
    }
}
