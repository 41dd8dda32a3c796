//! 改写模块统一错误处理

use std::fmt;

use thiserror::Error;

/// 改写错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RewriteError {
    /// 速率限制错误（HTTP 429）
    #[error("请求速率过快，已达到限制")]
    RateLimited {
        /// 服务端建议的等待秒数，仅用于日志
        retry_after: Option<u64>,
    },

    /// 服务端返回的其它错误状态
    #[error("改写服务返回错误 (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// 网络错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 超时错误
    #[error("请求超时: {0}")]
    Timeout(String),

    /// 响应缺少文本或格式无法解析
    #[error("响应格式无效: {0}")]
    MalformedResponse(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),
}

impl RewriteError {
    /// 是否为速率限制，只有这类错误会被重试
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RewriteError::RateLimited { .. })
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        let wrap = |msg: String| format!("{} (上下文: {})", msg, context);

        match self {
            RewriteError::Api { status, message } => RewriteError::Api {
                status,
                message: wrap(message),
            },
            RewriteError::Network(msg) => RewriteError::Network(wrap(msg)),
            RewriteError::Timeout(msg) => RewriteError::Timeout(wrap(msg)),
            RewriteError::MalformedResponse(msg) => RewriteError::MalformedResponse(wrap(msg)),
            RewriteError::Config(msg) => RewriteError::Config(wrap(msg)),
            RewriteError::InvalidInput(msg) => RewriteError::InvalidInput(wrap(msg)),
            rate_limited @ RewriteError::RateLimited { .. } => rate_limited,
        }
    }
}

impl From<serde_json::Error> for RewriteError {
    fn from(error: serde_json::Error) -> Self {
        RewriteError::MalformedResponse(format!("JSON解析错误: {}", error))
    }
}

impl From<tokio::time::error::Elapsed> for RewriteError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        RewriteError::Timeout(format!("异步操作超时: {}", error))
    }
}

#[cfg(feature = "openai")]
impl From<reqwest::Error> for RewriteError {
    fn from(error: reqwest::Error) -> Self {
        if error.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            RewriteError::RateLimited { retry_after: None }
        } else if error.is_timeout() {
            RewriteError::Timeout(error.to_string())
        } else if error.is_decode() {
            RewriteError::MalformedResponse(error.to_string())
        } else {
            RewriteError::Network(error.to_string())
        }
    }
}

/// 错误结果类型别名
pub type RewriteResult<T> = Result<T, RewriteError>;
