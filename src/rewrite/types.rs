//! 改写请求的参数类型
//!
//! 模型档位和职业都是封闭的枚举，线上格式沿用弹出页发送的字符串。

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::error::RewriteError;

/// 模型档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelTier {
    /// 便宜但质量一般
    #[serde(rename = "gpt-3.5-turbo")]
    Cheap,
    /// 昂贵但质量较高
    #[serde(rename = "gpt-4-turbo-preview")]
    Premium,
    /// 不调用远程服务，直接回显选区内容
    #[serde(rename = "dryrun")]
    DryRun,
}

impl ModelTier {
    /// 远程服务使用的模型标识，空跑模式没有
    pub fn model_id(self) -> Option<&'static str> {
        match self {
            ModelTier::Cheap => Some("gpt-3.5-turbo"),
            ModelTier::Premium => Some("gpt-4-turbo-preview"),
            ModelTier::DryRun => None,
        }
    }

    pub fn is_dry_run(self) -> bool {
        matches!(self, ModelTier::DryRun)
    }

    pub fn as_str(self) -> &'static str {
        self.model_id().unwrap_or("dryrun")
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 读者的职业
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profession {
    /// 未选择
    #[default]
    #[serde(rename = "")]
    Unspecified,
    Student,
    Sales,
    Engineer,
    Designer,
    Hr,
    Other,
}

impl Profession {
    pub fn as_str(self) -> &'static str {
        match self {
            Profession::Unspecified => "",
            Profession::Student => "student",
            Profession::Sales => "sales",
            Profession::Engineer => "engineer",
            Profession::Designer => "designer",
            Profession::Hr => "hr",
            Profession::Other => "other",
        }
    }

    pub fn is_specified(self) -> bool {
        !matches!(self, Profession::Unspecified)
    }
}

impl fmt::Display for Profession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 弹出页的滑块有时以数字、有时以字符串发送年龄
#[derive(Deserialize)]
#[serde(untagged)]
enum AgeRepr {
    Number(u32),
    Text(String),
}

/// 读者年龄，取值范围 16..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u32")]
pub struct Age(u8);

impl Age {
    pub const MIN: u8 = 16;
    pub const MAX: u8 = 100;

    pub fn new(value: u32) -> Result<Self, RewriteError> {
        if (Self::MIN as u32..=Self::MAX as u32).contains(&value) {
            Ok(Age(value as u8))
        } else {
            Err(RewriteError::InvalidInput(format!(
                "年龄必须在 {} 到 {} 之间: {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Age {
    fn default() -> Self {
        Age(18)
    }
}

impl TryFrom<u32> for Age {
    type Error = RewriteError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Age::new(value)
    }
}

impl<'de> Deserialize<'de> for Age {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = match AgeRepr::deserialize(deserializer)? {
            AgeRepr::Number(value) => value,
            AgeRepr::Text(text) => text
                .trim()
                .parse::<u32>()
                .map_err(|_| serde::de::Error::custom(format!("年龄不是数字: {:?}", text)))?,
        };
        Age::new(value).map_err(serde::de::Error::custom)
    }
}

impl From<Age> for u32 {
    fn from(age: Age) -> Self {
        age.0 as u32
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 一次改写调用需要的全部参数
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteParams {
    pub api_key: String,
    pub model: ModelTier,
    pub age: Age,
    pub profession: Profession,
    /// 预览 (`false`) 还是最终应用 (`true`)
    pub commit: bool,
}
