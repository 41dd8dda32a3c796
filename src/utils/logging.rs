//! 日志初始化

use tracing_subscriber::EnvFilter;

use crate::config::TunerConfig;

/// 安装全局 fmt 订阅器
///
/// `RUST_LOG` 优先于 `level`；已安装过订阅器时返回 `false`。
pub fn init(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("reading_tuner={}", level)))
        .unwrap_or_else(|_| EnvFilter::new("reading_tuner=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

pub fn init_from_config(config: &TunerConfig) -> bool {
    init(&config.log_level)
}
