//! # Reading Tuner
//!
//! 把网页上选中的内容交给语言模型，按读者的年龄和职业改写，
//! 再把结果插回到选区起点。
//!
//! ## 模块组织
//!
//! - `core` - 调用流程、顶层错误和最新调用优先的票据槽
//! - `extraction` - 可见性判断、文本节点收集和选区捕获
//! - `rewrite` - 改写请求、后端和限流重试
//! - `builders` - 结果容器的构建和插入
//! - `messaging` - 触发消息和监听器注册
//! - `parsers` - HTML 文档模型和内联样式解析
//! - `config` / `env` - 配置文件与环境变量
//! - `utils` - 日志初始化

pub mod builders;
pub mod config;
pub mod core;
pub mod env;
pub mod extraction;
pub mod messaging;
pub mod parsers;
pub mod rewrite;
pub mod utils;

pub use crate::config::{ConfigManager, TunerConfig};
pub use crate::core::{InvocationSlot, InvocationState, ReadingTuner, TunerError, TunerResult};
pub use crate::messaging::{ContentScript, MessageHub, PageResponse, TriggerMessage};
pub use crate::parsers::html::Document;
pub use crate::rewrite::{RewriteClient, RewriteError};
