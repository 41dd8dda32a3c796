//! 配置管理模块
//!
//! 加载顺序：内置默认值 → 配置文件 → 环境变量。

use std::path::Path;
use std::time::Duration;

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::{TunerError, TunerResult};
use crate::env::{self, EnvVar};

/// 配置常量
pub mod constants {
    pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_RETRY_BACKOFF_SECS: u64 = 5;
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    pub const COMPLETIONS_PATH: &str = "chat/completions";

    pub const CONFIG_PATHS: &[&str] = &[
        "reading-tuner.toml",
        ".reading-tuner.toml",
        "~/.config/reading-tuner/config.toml",
        "/etc/reading-tuner/config.toml",
    ];

    pub const ENV_FILES: &[&str] = &[".env.local", ".env"];
}

/// 运行配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TunerConfig {
    /// OpenAI 兼容接口的基础地址
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// 限流后最多重试的次数
    pub max_retries: u32,
    pub retry_backoff_secs: u64,
    pub log_level: String,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            api_base_url: constants::DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: constants::DEFAULT_MAX_RETRIES,
            retry_backoff_secs: constants::DEFAULT_RETRY_BACKOFF_SECS,
            log_level: constants::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl TunerConfig {
    pub fn from_toml_str(text: &str) -> TunerResult<Self> {
        let config: TunerConfig = toml::from_str(text)
            .map_err(|e| TunerError::Config(format!("解析配置失败: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> TunerResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TunerError::Config(format!("序列化配置失败: {}", e)))
    }

    pub fn validate(&self) -> TunerResult<()> {
        self.completions_endpoint()
            .map_err(|e| TunerError::Config(format!("API 地址无效 {}: {}", self.api_base_url, e)))?;

        if self.request_timeout_secs == 0 {
            return Err(TunerError::Config("请求超时必须大于 0".to_string()));
        }

        if env::LogLevel::parse(&self.log_level).is_err() {
            return Err(TunerError::Config(format!(
                "日志级别无效: {}",
                self.log_level
            )));
        }

        Ok(())
    }

    /// chat completions 接口的完整地址
    pub fn completions_endpoint(&self) -> Result<Url, url::ParseError> {
        let base = self.api_base_url.trim().trim_end_matches('/');
        Url::parse(&format!("{}/{}", base, constants::COMPLETIONS_PATH))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    /// 用 `READING_TUNER_*` 环境变量覆盖字段
    pub fn apply_env_overrides(&mut self) -> TunerResult<()> {
        let invalid = |e: env::EnvError| TunerError::Config(e.to_string());

        if let Some(level) = env::LogLevel::lookup().map_err(invalid)? {
            self.log_level = level;
        }
        if let Some(url) = env::ApiBaseUrl::lookup().map_err(invalid)? {
            tracing::info!("环境变量覆盖 API 地址: {}", url);
            self.api_base_url = url;
        }
        if let Some(secs) = env::RequestTimeoutSecs::lookup().map_err(invalid)? {
            self.request_timeout_secs = secs;
        }
        if let Some(retries) = env::MaxRetries::lookup().map_err(invalid)? {
            self.max_retries = retries;
        }
        if let Some(secs) = env::RetryBackoffSecs::lookup().map_err(invalid)? {
            self.retry_backoff_secs = secs;
        }

        Ok(())
    }
}

/// 配置加载器
pub struct ConfigManager;

impl ConfigManager {
    /// 按默认搜索路径加载配置
    pub fn load() -> TunerResult<TunerConfig> {
        Self::load_dotenv();

        let path = constants::CONFIG_PATHS
            .iter()
            .map(|path| shellexpand::tilde(path).into_owned())
            .find(|path| Path::new(path).exists());

        Self::load_with(path.as_deref())
    }

    /// 从指定文件加载，文件必须存在
    pub fn from_file(path: &str) -> TunerResult<TunerConfig> {
        let expanded = shellexpand::tilde(path).into_owned();
        if !Path::new(&expanded).exists() {
            return Err(TunerError::Config(format!("配置文件不存在: {}", expanded)));
        }
        Self::load_with(Some(&expanded))
    }

    fn load_with(path: Option<&str>) -> TunerResult<TunerConfig> {
        let mut builder = Config::builder().add_source(Config::try_from(&TunerConfig::default())?);

        if let Some(path) = path {
            tracing::info!("加载配置文件: {}", path);
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        let mut config: TunerConfig = builder.build()?.try_deserialize()?;
        config.apply_env_overrides()?;
        config.validate()?;

        tracing::debug!(
            "配置: API {}, 超时 {}s, 重试 {} 次, 间隔 {}s",
            config.api_base_url,
            config.request_timeout_secs,
            config.max_retries,
            config.retry_backoff_secs
        );

        Ok(config)
    }

    fn load_dotenv() {
        for env_file in constants::ENV_FILES {
            if Path::new(env_file).exists() {
                match dotenv::from_filename(env_file) {
                    Ok(_) => {
                        tracing::info!("已加载环境变量文件: {}", env_file);
                        return;
                    }
                    Err(e) => tracing::warn!("无法加载环境变量文件 {}: {}", env_file, e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TunerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff(), Duration::from_secs(5));
        assert_eq!(
            config.completions_endpoint().unwrap().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let config = TunerConfig {
            api_base_url: "http://localhost:8080/v1/".to_string(),
            ..TunerConfig::default()
        };
        assert_eq!(
            config.completions_endpoint().unwrap().as_str(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = TunerConfig::from_toml_str("max_retries = 1\nlog_level = \"debug\"").unwrap();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(TunerConfig::from_toml_str("request_timeout_secs = 0").is_err());
        assert!(TunerConfig::from_toml_str("api_base_url = \"not a url\"").is_err());
        assert!(TunerConfig::from_toml_str("log_level = \"loud\"").is_err());
        assert!(TunerConfig::from_toml_str("max_retries = \"many\"").is_err());
    }

    #[test]
    fn toml_round_trip() {
        let config = TunerConfig {
            retry_backoff_secs: 2,
            ..TunerConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(TunerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(matches!(
            ConfigManager::from_file("/definitely/not/here/reading-tuner.toml"),
            Err(TunerError::Config(_))
        ));
    }

    #[test]
    fn loads_file_through_config_builder() {
        let path = std::env::temp_dir().join(format!(
            "reading-tuner-test-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "request_timeout_secs = 12\n").unwrap();

        let config = ConfigManager::from_file(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        if std::env::var(env::RequestTimeoutSecs::NAME).is_err() {
            assert_eq!(config.request_timeout_secs, 12);
        }
    }
}
