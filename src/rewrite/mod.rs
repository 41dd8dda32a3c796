//! 改写服务模块
//!
//! 把选区 HTML 连同读者画像发送给远程语言模型，取回改写后的文本。

pub mod backend;
pub mod client;
pub mod error;
pub mod prompt;
pub mod types;

#[cfg(feature = "openai")]
pub use backend::OpenAiBackend;
pub use backend::RewriteBackend;
pub use client::{RetryPolicy, RewriteClient};
pub use error::{RewriteError, RewriteResult};
pub use prompt::{system_instruction, RewriteRequest};
pub use types::{Age, ModelTier, Profession, RewriteParams};
