//! 环境变量管理
//!
//! 每个变量一个类型，带名称、默认值、说明和解析校验。
//! `ConfigManager` 用这里的访问器覆盖配置文件中的值。

use std::env;
use std::fmt;

/// 环境变量解析错误
#[derive(Debug, Clone, PartialEq)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl EnvError {
    fn new(variable: &str, message: impl Into<String>) -> Self {
        Self {
            variable: variable.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    /// 已设置时解析，未设置时返回 `None`
    fn lookup() -> EnvResult<Option<T>> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value).map(Some),
            Err(_) => Ok(None),
        }
    }

    fn get() -> EnvResult<T> {
        match Self::lookup()? {
            Some(value) => Ok(value),
            None => Self::DEFAULT.ok_or_else(|| {
                EnvError::new(Self::NAME, "Required environment variable not set")
            }),
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 日志级别
pub struct LogLevel;
impl EnvVar<String> for LogLevel {
    const NAME: &'static str = "READING_TUNER_LOG_LEVEL";
    const DEFAULT: Option<String> = None;
    const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

    fn get() -> EnvResult<String> {
        Ok(Self::lookup()?.unwrap_or_else(|| "info".to_string()))
    }

    fn parse(value: &str) -> EnvResult<String> {
        let level = value.trim().to_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(level),
            _ => Err(EnvError::new(
                Self::NAME,
                format!(
                    "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                    value
                ),
            )),
        }
    }
}

/// 改写服务地址
pub struct ApiBaseUrl;
impl EnvVar<String> for ApiBaseUrl {
    const NAME: &'static str = "READING_TUNER_API_BASE_URL";
    const DEFAULT: Option<String> = None;
    const DESCRIPTION: &'static str = "Base URL of the OpenAI compatible API";

    fn parse(value: &str) -> EnvResult<String> {
        let url = value.trim();
        if url.starts_with("http://") || url.starts_with("https://") {
            Ok(url.to_string())
        } else {
            Err(EnvError::new(
                Self::NAME,
                "API URL must start with http:// or https://",
            ))
        }
    }
}

/// 单次请求超时
pub struct RequestTimeoutSecs;
impl EnvVar<u64> for RequestTimeoutSecs {
    const NAME: &'static str = "READING_TUNER_REQUEST_TIMEOUT_SECS";
    const DEFAULT: Option<u64> = Some(60);
    const DESCRIPTION: &'static str = "Timeout of a single rewrite request in seconds";

    fn parse(value: &str) -> EnvResult<u64> {
        parse_bounded_u64(value, Self::NAME, 1, 600)
    }
}

/// 限流后的最大重试次数
pub struct MaxRetries;
impl EnvVar<u32> for MaxRetries {
    const NAME: &'static str = "READING_TUNER_MAX_RETRIES";
    const DEFAULT: Option<u32> = Some(3);
    const DESCRIPTION: &'static str = "Retries after a rate-limited rewrite request";

    fn parse(value: &str) -> EnvResult<u32> {
        parse_bounded_u64(value, Self::NAME, 0, 10).map(|n| n as u32)
    }
}

/// 限流重试的等待时间
pub struct RetryBackoffSecs;
impl EnvVar<u64> for RetryBackoffSecs {
    const NAME: &'static str = "READING_TUNER_RETRY_BACKOFF_SECS";
    const DEFAULT: Option<u64> = Some(5);
    const DESCRIPTION: &'static str = "Fixed wait between rate-limited attempts in seconds";

    fn parse(value: &str) -> EnvResult<u64> {
        parse_bounded_u64(value, Self::NAME, 0, 300)
    }
}

fn parse_bounded_u64(value: &str, var_name: &str, min: u64, max: u64) -> EnvResult<u64> {
    let num: u64 = value
        .trim()
        .parse()
        .map_err(|_| EnvError::new(var_name, "Must be a valid non-negative number"))?;

    if num < min {
        return Err(EnvError::new(
            var_name,
            format!("Value {} is below minimum {}", num, min),
        ));
    }

    if num > max {
        return Err(EnvError::new(
            var_name,
            format!("Value {} exceeds maximum {}", num, max),
        ));
    }

    Ok(num)
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables\n\n");

    let entries: [(&str, &str, String); 5] = [
        (LogLevel::NAME, LogLevel::DESCRIPTION, "\"info\"".to_string()),
        (ApiBaseUrl::NAME, ApiBaseUrl::DESCRIPTION, "none".to_string()),
        (
            RequestTimeoutSecs::NAME,
            RequestTimeoutSecs::DESCRIPTION,
            format!("{:?}", RequestTimeoutSecs::DEFAULT),
        ),
        (
            MaxRetries::NAME,
            MaxRetries::DESCRIPTION,
            format!("{:?}", MaxRetries::DEFAULT),
        ),
        (
            RetryBackoffSecs::NAME,
            RetryBackoffSecs::DESCRIPTION,
            format!("{:?}", RetryBackoffSecs::DEFAULT),
        ),
    ];

    for (name, description, default) in entries {
        docs.push_str(&format!("- `{}`: {} (default: {})\n", name, description, default));
    }

    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parsing() {
        assert_eq!(LogLevel::parse("DEBUG").unwrap(), "debug");
        assert_eq!(LogLevel::parse(" warn ").unwrap(), "warn");
        assert!(LogLevel::parse("verbose").is_err());
    }

    #[test]
    fn url_validation() {
        assert!(ApiBaseUrl::parse("https://api.openai.com/v1").is_ok());
        assert!(ApiBaseUrl::parse("http://localhost:8080").is_ok());
        assert!(ApiBaseUrl::parse("ftp://example.com").is_err());
        assert!(ApiBaseUrl::parse("not-a-url").is_err());
    }

    #[test]
    fn numeric_validation() {
        assert_eq!(MaxRetries::parse("3").unwrap(), 3);
        assert_eq!(MaxRetries::parse("0").unwrap(), 0);
        assert!(MaxRetries::parse("11").is_err());
        assert!(RequestTimeoutSecs::parse("0").is_err());
        assert!(RetryBackoffSecs::parse("-1").is_err());
        assert_eq!(RetryBackoffSecs::parse("5").unwrap(), 5);
    }

    #[test]
    fn error_display_names_variable() {
        let error = EnvError::new("X", "broken");
        assert_eq!(error.to_string(), "Environment variable 'X': broken");
    }

    #[test]
    fn docs_list_every_variable() {
        let docs = generate_env_docs();
        for name in [
            LogLevel::NAME,
            ApiBaseUrl::NAME,
            RequestTimeoutSecs::NAME,
            MaxRetries::NAME,
            RetryBackoffSecs::NAME,
        ] {
            assert!(docs.contains(name));
        }
    }
}
