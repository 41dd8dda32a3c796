// 集成测试公共模块
//
// 提供脚本化的改写后端和文档辅助函数

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use markup5ever_rcdom::Handle;

use reading_tuner::builders::RESULT_MARKER_CLASS;
use reading_tuner::extraction::SelectionRange;
use reading_tuner::parsers::html::dom::{find_nodes, get_node_text};
use reading_tuner::rewrite::{RewriteBackend, RewriteError, RewriteRequest, RewriteResult};
use reading_tuner::{Document, ReadingTuner, RewriteClient, TriggerMessage};

/// 按预设顺序返回结果的后端
///
/// 脚本用完后重复返回 `fallback`。
pub struct ScriptedBackend {
    script: RefCell<VecDeque<(Duration, RewriteResult<String>)>>,
    fallback: RewriteResult<String>,
    calls: Cell<usize>,
    requests: RefCell<Vec<RewriteRequest>>,
}

impl ScriptedBackend {
    pub fn always(result: RewriteResult<String>) -> Rc<Self> {
        Rc::new(Self {
            script: RefCell::new(VecDeque::new()),
            fallback: result,
            calls: Cell::new(0),
            requests: RefCell::new(Vec::new()),
        })
    }

    pub fn rate_limited() -> Rc<Self> {
        Self::always(Err(RewriteError::RateLimited { retry_after: None }))
    }

    pub fn replying(text: &str) -> Rc<Self> {
        Self::always(Ok(text.to_string()))
    }

    /// 依次返回的结果，每个带一个返回前的等待时间
    pub fn scripted(steps: Vec<(Duration, RewriteResult<String>)>) -> Rc<Self> {
        let backend = Self::always(Err(RewriteError::Network("script exhausted".to_string())));
        backend.script.borrow_mut().extend(steps);
        backend
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn requests(&self) -> Vec<RewriteRequest> {
        self.requests.borrow().clone()
    }
}

impl RewriteBackend for ScriptedBackend {
    async fn complete(&self, request: &RewriteRequest) -> RewriteResult<String> {
        self.calls.set(self.calls.get() + 1);
        self.requests.borrow_mut().push(request.clone());

        let step = self.script.borrow_mut().pop_front();
        match step {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => self.fallback.clone(),
        }
    }
}

pub type TestTuner = ReadingTuner<Rc<ScriptedBackend>>;

pub fn tuner(html: &str, backend: &Rc<ScriptedBackend>) -> TestTuner {
    let document = Rc::new(Document::parse(html).with_url("https://example.com/article"));
    ReadingTuner::new(document, RewriteClient::new(Rc::clone(backend)))
}

pub fn nth(document: &Document, name: &str, n: usize) -> Handle {
    find_nodes(&document.root(), name).remove(n)
}

/// 选中第 `n` 个 `name` 元素的全部内容
pub fn select_contents(document: &Document, name: &str, n: usize) -> Handle {
    let node = nth(document, name, n);
    document.select(SelectionRange::select_node_contents(&node));
    node
}

pub fn message(model: &str) -> TriggerMessage {
    TriggerMessage::from_json(&format!(
        r#"{{"type":"GET_DOM","apiKey":"sk-test","model":"{}","age":30,"commit":false,"job":"engineer"}}"#,
        model
    ))
    .expect("valid trigger message")
}

/// 文档中所有结果容器的文本
pub fn marker_texts(document: &Document) -> Vec<String> {
    document
        .find_by_class(RESULT_MARKER_CLASS)
        .iter()
        .map(|marker| {
            marker
                .children
                .borrow()
                .iter()
                .filter_map(get_node_text)
                .collect::<String>()
        })
        .collect()
}

pub const ARTICLE: &str = "<html><head><title>Understanding Rust</title></head><body>\
    <nav style=\"display:none\">Home | About</nav>\
    <article><h1>Ownership</h1><p>Hello world</p><p>Borrowing is temporary access.</p></article>\
    <script>track();</script>\
    </body></html>";
