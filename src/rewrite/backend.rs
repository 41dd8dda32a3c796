//! 改写服务后端
//!
//! `RewriteBackend` 只负责一次请求；重试策略在 `RewriteClient` 中。
//! `OpenAiBackend` 对接 OpenAI 兼容的 chat completions 接口。

use serde::{Deserialize, Serialize};

use super::error::{RewriteError, RewriteResult};
use super::prompt::RewriteRequest;

/// 单次改写调用
///
/// 速率限制必须以 [`RewriteError::RateLimited`] 返回，其余失败用别的变体。
#[allow(async_fn_in_trait)]
pub trait RewriteBackend {
    async fn complete(&self, request: &RewriteRequest) -> RewriteResult<String>;
}

impl<B: RewriteBackend + ?Sized> RewriteBackend for std::rc::Rc<B> {
    async fn complete(&self, request: &RewriteRequest) -> RewriteResult<String> {
        (**self).complete(request).await
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

impl<'a> From<&'a RewriteRequest> for ChatCompletionRequest<'a> {
    fn from(request: &'a RewriteRequest) -> Self {
        Self {
            model: &request.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_content,
                },
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// 从响应体中取出第一个选项的文本
///
/// 没有选项、没有内容或内容为空都视为格式错误。
pub fn extract_content(body: &str) -> RewriteResult<String> {
    let response: ChatCompletionResponse = serde_json::from_str(body)?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RewriteError::MalformedResponse("响应中没有 choices".to_string()))?;

    match choice.message.content {
        Some(content) if !content.is_empty() => Ok(content),
        _ => Err(RewriteError::MalformedResponse(
            "响应中没有文本内容".to_string(),
        )),
    }
}

/// 从错误响应体中提取可读的错误信息
pub fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

#[cfg(feature = "openai")]
pub use self::openai::OpenAiBackend;

#[cfg(feature = "openai")]
mod openai {
    use reqwest::header::RETRY_AFTER;
    use reqwest::{Client, StatusCode};
    use url::Url;

    use super::*;
    use crate::config::TunerConfig;

    /// OpenAI 兼容接口
    #[derive(Debug, Clone)]
    pub struct OpenAiBackend {
        client: Client,
        endpoint: Url,
    }

    impl OpenAiBackend {
        pub fn new(config: &TunerConfig) -> RewriteResult<Self> {
            let endpoint = config
                .completions_endpoint()
                .map_err(|e| RewriteError::Config(e.to_string()))?;
            let client = Client::builder()
                .timeout(config.request_timeout())
                .build()?;

            Ok(Self { client, endpoint })
        }

        pub fn endpoint(&self) -> &Url {
            &self.endpoint
        }
    }

    impl RewriteBackend for OpenAiBackend {
        async fn complete(&self, request: &RewriteRequest) -> RewriteResult<String> {
            let body = ChatCompletionRequest::from(request);

            let response = self
                .client
                .post(self.endpoint.clone())
                .bearer_auth(&request.api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<u64>().ok());
                tracing::warn!("改写服务限流, Retry-After: {:?}", retry_after);
                return Err(RewriteError::RateLimited { retry_after });
            }

            let text = response.text().await?;
            if !status.is_success() {
                return Err(RewriteError::Api {
                    status: status.as_u16(),
                    message: api_error_message(&text),
                });
            }

            extract_content(&text)
        }
    }

}
