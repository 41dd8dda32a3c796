//! 带限流重试的改写客户端

use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use super::backend::RewriteBackend;
use super::error::RewriteResult;
use super::prompt::RewriteRequest;
use super::types::RewriteParams;
use crate::config::TunerConfig;

/// 重试策略
///
/// 只有速率限制会触发重试，每次等待固定时长。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 首次请求之外最多重试的次数
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// 最多发出的请求总数
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_BACKOFF)
    }
}

impl From<&TunerConfig> for RetryPolicy {
    fn from(config: &TunerConfig) -> Self {
        Self::new(config.max_retries, config.retry_backoff())
    }
}

/// 改写客户端
pub struct RewriteClient<B> {
    backend: B,
    policy: RetryPolicy,
}

impl<B: RewriteBackend> RewriteClient<B> {
    pub fn new(backend: B) -> Self {
        Self::with_policy(backend, RetryPolicy::default())
    }

    pub fn with_policy(backend: B, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// 改写一段选区 HTML
    pub async fn rewrite(
        &self,
        serialized_html: &str,
        params: &RewriteParams,
    ) -> RewriteResult<String> {
        let request = RewriteRequest::new(serialized_html, params)?;
        self.submit(&request).await
    }

    /// 发送请求，遇到速率限制时等待后重发同一个请求
    ///
    /// 重试耗尽后返回最后一次的限流错误；其它错误立即返回。
    pub async fn submit(&self, request: &RewriteRequest) -> RewriteResult<String> {
        let mut retries = 0;

        loop {
            match self.backend.complete(request).await {
                Ok(text) => {
                    info!(
                        "改写完成: 模型 {}, 第 {} 次请求, {} 字符",
                        request.model,
                        retries + 1,
                        text.chars().count()
                    );
                    return Ok(text);
                }
                Err(e) if e.is_rate_limited() && retries < self.policy.max_retries => {
                    retries += 1;
                    warn!(
                        "触发速率限制，{:?} 后进行第 {}/{} 次重试",
                        self.policy.backoff, retries, self.policy.max_retries
                    );
                    sleep(self.policy.backoff).await;
                }
                Err(e) => {
                    if e.is_rate_limited() {
                        error!("重试 {} 次后仍被限流，放弃", retries);
                    } else {
                        error!("改写请求失败: {}", e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl<B> RewriteClient<B> {
    /// 限流错误需要调用方等待的最长时间
    pub fn worst_case_delay(&self) -> Duration {
        self.policy.backoff * self.policy.max_retries
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use tokio::time::Instant;

    use super::*;
    use crate::rewrite::error::RewriteError;
    use crate::rewrite::types::{Age, ModelTier, Profession};

    /// 前 `failures` 次返回限流，之后成功
    struct FlakyBackend {
        failures: usize,
        error: RewriteError,
        calls: Cell<usize>,
        seen: RefCell<Vec<(RewriteRequest, Instant)>>,
    }

    impl FlakyBackend {
        fn rate_limited(failures: usize) -> Self {
            Self::failing_with(failures, RewriteError::RateLimited { retry_after: None })
        }

        fn failing_with(failures: usize, error: RewriteError) -> Self {
            Self {
                failures,
                error,
                calls: Cell::new(0),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl RewriteBackend for FlakyBackend {
        async fn complete(&self, request: &RewriteRequest) -> RewriteResult<String> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            self.seen
                .borrow_mut()
                .push((request.clone(), Instant::now()));

            if call < self.failures {
                Err(self.error.clone())
            } else {
                Ok("rewritten".to_string())
            }
        }
    }

    fn params() -> RewriteParams {
        RewriteParams {
            api_key: "sk-test".to_string(),
            model: ModelTier::Cheap,
            age: Age::new(25).unwrap(),
            profession: Profession::Student,
            commit: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_rate_limits_within_budget() {
        for failures in 0..=3 {
            let client = RewriteClient::new(FlakyBackend::rate_limited(failures));
            let result = client.rewrite("<p>x</p>", &params()).await;

            assert_eq!(result, Ok("rewritten".to_string()));
            assert_eq!(client.backend().calls.get(), failures + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_retries() {
        let client = RewriteClient::new(FlakyBackend::rate_limited(10));
        let result = client.rewrite("<p>x</p>", &params()).await;

        assert_eq!(result, Err(RewriteError::RateLimited { retry_after: None }));
        assert_eq!(client.backend().calls.get(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_are_not_retried() {
        let error = RewriteError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        let client = RewriteClient::new(FlakyBackend::failing_with(10, error.clone()));

        assert_eq!(client.rewrite("<p>x</p>", &params()).await, Err(error));
        assert_eq!(client.backend().calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_fixed_backoff_and_resends_same_request() {
        let client = RewriteClient::new(FlakyBackend::rate_limited(2));
        let start = Instant::now();
        client.rewrite("<p>same</p>", &params()).await.unwrap();
        let finished = Instant::now();

        let seen = client.backend().seen.borrow();
        assert_eq!(seen.len(), 3);
        // 首次请求不等待，成功后也不再等待
        assert_eq!(seen[0].1, start);
        let total = finished - start;
        assert!(total >= Duration::from_secs(10) && total < Duration::from_millis(10_001));
        assert_eq!(finished, seen[2].1);
        for pair in seen.windows(2) {
            let gap = pair[1].1 - pair[0].1;
            assert!(gap >= Duration::from_secs(5) && gap < Duration::from_secs(6));
            assert_eq!(pair[0].0, pair[1].0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn custom_policy_is_honoured() {
        let policy = RetryPolicy::new(1, Duration::from_millis(100));
        let client = RewriteClient::with_policy(FlakyBackend::rate_limited(5), policy);

        assert!(client.rewrite("<p>x</p>", &params()).await.is_err());
        assert_eq!(client.backend().calls.get(), 2);
        assert_eq!(client.worst_case_delay(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn dry_run_never_reaches_backend() {
        let client = RewriteClient::new(FlakyBackend::rate_limited(0));
        let mut dry = params();
        dry.model = ModelTier::DryRun;

        assert!(matches!(
            client.rewrite("<p>x</p>", &dry).await,
            Err(RewriteError::Config(_))
        ));
        assert_eq!(client.backend().calls.get(), 0);
    }
}
