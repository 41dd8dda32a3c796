//! # 工具模块
//!
//! - `logging` - 日志订阅器初始化

pub mod logging;

pub use logging::{init as init_logging, init_from_config};
