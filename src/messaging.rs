//! 消息通道
//!
//! 弹出页发送触发消息，内容脚本在页面中处理后回复页面标题。
//! `MessageHub` 模拟宿主的监听器注册表。

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{join_all, LocalBoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::core::{ReadingTuner, TunerError, TunerResult};
use crate::extraction::render::RenderView;
use crate::rewrite::backend::RewriteBackend;
use crate::rewrite::types::{Age, ModelTier, Profession, RewriteParams};

/// 触发一次改写的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerMessage {
    /// 消息类型标签，弹出页固定发送 `GET_DOM`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub api_key: String,
    pub model: ModelTier,
    #[serde(default)]
    pub age: Age,
    #[serde(default)]
    pub commit: bool,
    #[serde(default)]
    pub job: Profession,
}

impl TriggerMessage {
    pub fn from_json(text: &str) -> TunerResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn rewrite_params(&self) -> RewriteParams {
        RewriteParams {
            api_key: self.api_key.clone(),
            model: self.model,
            age: self.age,
            profession: self.job,
            commit: self.commit,
        }
    }
}

/// 回复给弹出页的内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    pub title: String,
}

/// 消息监听器
///
/// 返回 `None` 表示不回复。
pub trait MessageListener {
    fn on_message(&self, message: &TriggerMessage) -> LocalBoxFuture<'static, Option<PageResponse>>;
}

static NEXT_HUB_ID: AtomicU64 = AtomicU64::new(1);

/// 注册表标识，进程内唯一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HubId(u64);

/// 监听器标识，带上所属注册表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId {
    hub: HubId,
    seq: u64,
}

impl ListenerId {
    pub fn hub(&self) -> HubId {
        self.hub
    }
}

/// 监听器注册表
pub struct MessageHub {
    id: HubId,
    listeners: RefCell<Vec<(ListenerId, Rc<dyn MessageListener>)>>,
    next_seq: Cell<u64>,
}

impl Default for MessageHub {
    fn default() -> Self {
        Self {
            id: HubId(NEXT_HUB_ID.fetch_add(1, Ordering::Relaxed)),
            listeners: RefCell::new(Vec::new()),
            next_seq: Cell::new(0),
        }
    }
}

impl MessageHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> HubId {
        self.id
    }

    pub fn add_listener(&self, listener: Rc<dyn MessageListener>) -> ListenerId {
        let id = ListenerId {
            hub: self.id,
            seq: self.next_seq.get(),
        };
        self.next_seq.set(id.seq + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// 把消息交给所有监听器，收集回复
    pub async fn dispatch(&self, message: &TriggerMessage) -> Vec<PageResponse> {
        let pending: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.on_message(message))
            .collect();

        join_all(pending).await.into_iter().flatten().collect()
    }

    pub async fn dispatch_json(&self, text: &str) -> TunerResult<Vec<PageResponse>> {
        let message = TriggerMessage::from_json(text)?;
        Ok(self.dispatch(&message).await)
    }
}

struct TunerListener<B, R> {
    tuner: Rc<ReadingTuner<B, R>>,
}

impl<B, R> MessageListener for TunerListener<B, R>
where
    B: RewriteBackend + 'static,
    R: RenderView + 'static,
{
    fn on_message(&self, message: &TriggerMessage) -> LocalBoxFuture<'static, Option<PageResponse>> {
        let tuner = Rc::clone(&self.tuner);
        let message = message.clone();

        async move {
            match tuner.handle_trigger(&message).await {
                Ok(response) => Some(response),
                Err(e @ TunerError::Superseded(_)) => {
                    tracing::debug!("不回复: {}", e);
                    None
                }
                Err(e) => {
                    tracing::error!("处理触发消息失败: {}", e);
                    None
                }
            }
        }
        .boxed_local()
    }
}

/// 页面内的内容脚本
///
/// 同一页面在每个注册表中最多登记一次，重复调用 `register` 不会新增监听器。
pub struct ContentScript<B, R> {
    tuner: Rc<ReadingTuner<B, R>>,
    registrations: RefCell<Vec<ListenerId>>,
}

impl<B, R> ContentScript<B, R>
where
    B: RewriteBackend + 'static,
    R: RenderView + 'static,
{
    pub fn new(tuner: ReadingTuner<B, R>) -> Self {
        Self {
            tuner: Rc::new(tuner),
            registrations: RefCell::new(Vec::new()),
        }
    }

    pub fn tuner(&self) -> &Rc<ReadingTuner<B, R>> {
        &self.tuner
    }

    fn registration_in(&self, hub: &MessageHub) -> Option<ListenerId> {
        self.registrations
            .borrow()
            .iter()
            .copied()
            .find(|id| id.hub() == hub.id())
    }

    pub fn register(&self, hub: &MessageHub) -> ListenerId {
        if let Some(id) = self.registration_in(hub) {
            tracing::debug!("监听器已注册: {:?}", id);
            return id;
        }

        let listener = TunerListener {
            tuner: Rc::clone(&self.tuner),
        };
        let id = hub.add_listener(Rc::new(listener));
        self.registrations.borrow_mut().push(id);
        tracing::info!("注册消息监听器: {:?}", id);
        id
    }

    /// 只注销在 `hub` 中的登记，其它注册表不受影响
    pub fn unregister(&self, hub: &MessageHub) -> bool {
        let Some(id) = self.registration_in(hub) else {
            return false;
        };
        self.registrations.borrow_mut().retain(|existing| *existing != id);
        tracing::info!("注销消息监听器: {:?}", id);
        hub.remove_listener(id)
    }

    pub fn is_registered(&self) -> bool {
        !self.registrations.borrow().is_empty()
    }

    pub fn is_registered_with(&self, hub: &MessageHub) -> bool {
        self.registration_in(hub).is_some()
    }
}
