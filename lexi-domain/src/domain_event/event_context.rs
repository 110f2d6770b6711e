use super::metadata::ReplayMetadata;

/// 事件的投递来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOrigin {
    /// 本进程内发布
    Local,
    /// 经分布式 Broker 转入
    Distributed,
    /// 事件溯源回放
    Replay,
}

/// 投递上下文：处理器据此区分实时流量与回放历史
#[derive(Debug, Clone)]
pub struct DeliveryContext {
    origin: DeliveryOrigin,
    replay: Option<ReplayMetadata>,
}

impl DeliveryContext {
    pub fn local() -> Self {
        Self {
            origin: DeliveryOrigin::Local,
            replay: None,
        }
    }

    pub fn distributed() -> Self {
        Self {
            origin: DeliveryOrigin::Distributed,
            replay: None,
        }
    }

    pub fn replay(metadata: ReplayMetadata) -> Self {
        Self {
            origin: DeliveryOrigin::Replay,
            replay: Some(metadata),
        }
    }

    pub fn origin(&self) -> DeliveryOrigin {
        self.origin
    }

    pub fn is_replay(&self) -> bool {
        self.origin == DeliveryOrigin::Replay
    }

    pub fn replay_metadata(&self) -> Option<&ReplayMetadata> {
        self.replay.as_ref()
    }
}
