//! 演示服务配置
//!
//! 合并顺序（后者覆盖前者）：
//! 1. 内置默认值；
//! 2. TOML 文件：`LEXI_CONFIG` 指定的路径，否则为当前目录下的 `lexi.toml`（不存在则跳过）；
//! 3. 以 `LEXI_` 为前缀的环境变量，`__` 分隔嵌套键，如 `LEXI_EVENT_BUS__ENABLE_REDIS=true`。
//!
use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use lexi_domain::eventing::EventBusOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "LEXI_";
pub const CONFIG_PATH_ENV: &str = "LEXI_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "lexi.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// `RUST_LOG` 未设置时使用的日志过滤
    pub log_level: String,
    pub event_bus: EventBusOptions,
    /// 演示回放的流 ID
    pub replay_stream: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            event_bus: EventBusOptions::default(),
            replay_stream: "learner-1".to_string(),
        }
    }
}

fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub fn figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DemoConfig::default()))
        .merge(Toml::file(config_path()))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["CONFIG"]).split("__"))
}

/// 加载并校验配置；配置错误在启动期直接失败
pub fn load() -> anyhow::Result<DemoConfig> {
    let config: DemoConfig = figment()
        .extract()
        .context("failed to extract configuration")?;
    config
        .event_bus
        .validate()
        .context("invalid [event_bus] configuration")?;
    Ok(config)
}
