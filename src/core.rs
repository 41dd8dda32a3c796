//! 核心处理流程
//!
//! 一次调用：捕获选区 → 清除旧结果 → 改写（或空跑）→ 插入结果 → 返回页面标题。

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use chrono::{SecondsFormat, Utc};
use markup5ever_rcdom::Handle;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::builders::splice::{clear_markers, splice_result};
use crate::extraction::collector::{TextCollector, TextNodeIndex};
use crate::extraction::render::{InlineRenderView, RenderView};
use crate::extraction::selection::capture_selection;
use crate::messaging::{PageResponse, TriggerMessage};
use crate::parsers::html::Document;
use crate::rewrite::backend::RewriteBackend;
use crate::rewrite::client::RewriteClient;
use crate::rewrite::error::RewriteError;

/// 顶层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TunerError {
    /// 页面上没有选区
    #[error("没有选中的内容")]
    NoSelection,

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    /// 更新的调用已经开始，本次结果被丢弃
    #[error("调用 #{0} 已被更新的调用取代")]
    Superseded(u64),

    #[error("配置错误: {0}")]
    Config(String),

    /// 触发消息无法解析或字段不合法
    #[error("消息无效: {0}")]
    InvalidMessage(String),
}

impl From<config::ConfigError> for TunerError {
    fn from(error: config::ConfigError) -> Self {
        TunerError::Config(error.to_string())
    }
}

impl From<serde_json::Error> for TunerError {
    fn from(error: serde_json::Error) -> Self {
        TunerError::InvalidMessage(error.to_string())
    }
}

pub type TunerResult<T> = Result<T, TunerError>;

/// 单次调用所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Idle,
    SelectionCaptured,
    DryRun,
    ExtractionInFlight,
    ResultReady,
    Spliced,
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvocationState::Idle => "idle",
            InvocationState::SelectionCaptured => "selection-captured",
            InvocationState::DryRun => "dry-run",
            InvocationState::ExtractionInFlight => "extraction-in-flight",
            InvocationState::ResultReady => "result-ready",
            InvocationState::Spliced => "spliced",
        };
        f.write_str(name)
    }
}

/// 只保留最新一次调用的票据槽
///
/// 每次调用领取一张递增的票据；结果返回时票据不再是最新的，就不插入。
#[derive(Debug, Default)]
pub struct InvocationSlot {
    generation: Cell<u64>,
}

impl InvocationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始一次新调用，之前的票据全部失效
    pub fn begin(&self) -> u64 {
        let ticket = self.generation.get() + 1;
        self.generation.set(ticket);
        ticket
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.generation.get() == ticket
    }

    pub fn current(&self) -> u64 {
        self.generation.get()
    }
}

/// 页面内的改写处理器
pub struct ReadingTuner<B, R = InlineRenderView> {
    document: Rc<Document>,
    client: RewriteClient<B>,
    render: R,
    slot: InvocationSlot,
}

impl<B: RewriteBackend> ReadingTuner<B, InlineRenderView> {
    pub fn new(document: Rc<Document>, client: RewriteClient<B>) -> Self {
        Self::with_render(document, client, InlineRenderView)
    }
}

#[cfg(feature = "openai")]
impl ReadingTuner<crate::rewrite::backend::OpenAiBackend, InlineRenderView> {
    /// 按配置创建连接 OpenAI 接口的处理器
    pub fn from_config(
        document: Rc<Document>,
        config: &crate::config::TunerConfig,
    ) -> TunerResult<Self> {
        let backend = crate::rewrite::backend::OpenAiBackend::new(config)?;
        let client = RewriteClient::with_policy(backend, config.into());
        Ok(Self::new(document, client))
    }
}

impl<B: RewriteBackend, R: RenderView> ReadingTuner<B, R> {
    pub fn with_render(document: Rc<Document>, client: RewriteClient<B>, render: R) -> Self {
        Self {
            document,
            client,
            render,
            slot: InvocationSlot::new(),
        }
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    pub fn client(&self) -> &RewriteClient<B> {
        &self.client
    }

    pub fn slot(&self) -> &InvocationSlot {
        &self.slot
    }

    /// `root` 子树中的可见文本节点
    pub fn visible_text_nodes(&self, root: &Handle) -> TextNodeIndex {
        TextCollector::new(&self.render).index(root)
    }

    /// 处理一条触发消息
    ///
    /// 没有选区时返回 [`TunerError::NoSelection`]，不做任何修改。
    /// 结果返回前有更新的调用开始时返回 [`TunerError::Superseded`]，不插入结果。
    pub async fn handle_trigger(&self, message: &TriggerMessage) -> TunerResult<PageResponse> {
        let params = message.rewrite_params();
        let page = self.document.url().unwrap_or("-");

        // 没有选区的调用不领取票据，不影响进行中的调用
        let captured = match capture_selection(&self.document.selection()) {
            Ok(captured) => captured,
            Err(e) => {
                error!("调用中止 (页面 {}): {}", page, e);
                return Err(e);
            }
        };
        let ticket = self.slot.begin();

        info!(
            "[{}] 调用 #{}: 模型 {}, 年龄 {}, commit {}, 页面 {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            ticket,
            params.model,
            params.age,
            params.commit,
            page
        );
        self.transition(ticket, InvocationState::SelectionCaptured);

        let visible = self.visible_text_nodes(&captured.range.common_ancestor());
        debug!(
            "选区所在子树有 {} 个可见文本节点: {:?}",
            visible.len(),
            visible.joined_text(" | ")
        );

        clear_markers(&self.document);

        let text = if params.model.is_dry_run() {
            self.transition(ticket, InvocationState::DryRun);
            captured.serialized_html
        } else {
            self.transition(ticket, InvocationState::ExtractionInFlight);
            self.client
                .rewrite(&captured.serialized_html, &params)
                .await?
        };
        self.transition(ticket, InvocationState::ResultReady);

        if !self.slot.is_current(ticket) {
            warn!(
                "调用 #{} 的结果被丢弃，最新调用为 #{}",
                ticket,
                self.slot.current()
            );
            return Err(TunerError::Superseded(ticket));
        }

        if splice_result(&self.document, &text).is_some() {
            self.transition(ticket, InvocationState::Spliced);
        }
        self.transition(ticket, InvocationState::Idle);

        Ok(PageResponse {
            title: self.document.title(),
        })
    }

    fn transition(&self, ticket: u64, state: InvocationState) {
        debug!("调用 #{} -> {}", ticket, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_ticket_wins() {
        let slot = InvocationSlot::new();
        let first = slot.begin();
        assert!(slot.is_current(first));

        let second = slot.begin();
        assert!(!slot.is_current(first));
        assert!(slot.is_current(second));
        assert_eq!(slot.current(), second);
    }

    #[test]
    fn rewrite_errors_convert_transparently() {
        let error: TunerError = RewriteError::RateLimited { retry_after: None }.into();
        assert_eq!(error.to_string(), "请求速率过快，已达到限制");
        assert!(matches!(error, TunerError::Rewrite(ref e) if e.is_rate_limited()));
    }

    #[test]
    fn json_errors_are_invalid_messages() {
        let error: TunerError = serde_json::from_str::<serde_json::Value>("[")
            .unwrap_err()
            .into();
        assert!(matches!(error, TunerError::InvalidMessage(_)));
    }

    #[test]
    fn states_have_readable_names() {
        assert_eq!(InvocationState::ExtractionInFlight.to_string(), "extraction-in-flight");
        assert_eq!(InvocationState::Spliced.to_string(), "spliced");
    }
}
