//! 选区模型与选区内容捕获
//!
//! 边界点由 (容器节点, 偏移) 组成：元素/文档容器的偏移是子节点下标，
//! 文本容器的偏移是字符下标。`Document` 在增删节点时会同步调整这些边界，
//! 行为与浏览器的 live range 一致。

use std::fmt;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use crate::core::{TunerError, TunerResult};
use crate::parsers::html::dom::{
    append_child, char_slice, create_element, get_node_name, get_node_text, get_parent_node,
    index_in_parent, is_character_data, is_inclusive_ancestor, node_length, set_node_text,
    shallow_clone, deep_clone,
};
use crate::parsers::html::serializer::serialize_children;

/// 选区边界点
#[derive(Clone)]
pub struct Boundary {
    pub node: Handle,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: &Handle, offset: usize) -> Self {
        Self {
            node: node.clone(),
            offset,
        }
    }

    /// 紧挨在节点之前的位置
    pub fn before(node: &Handle) -> Option<Self> {
        let (parent, index) = index_in_parent(node)?;
        Some(Self::new(&parent, index))
    }

    /// 紧挨在节点之后的位置
    pub fn after(node: &Handle) -> Option<Self> {
        let (parent, index) = index_in_parent(node)?;
        Some(Self::new(&parent, index + 1))
    }
}

impl PartialEq for Boundary {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node) && self.offset == other.offset
    }
}

impl fmt::Debug for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = get_node_name(&self.node).unwrap_or("#text");
        write!(f, "Boundary({}, {})", name, self.offset)
    }
}

/// 单个选区范围，`start` 不晚于 `end` 由调用方保证
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl SelectionRange {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// 折叠在某一点的范围
    pub fn collapsed_at(at: Boundary) -> Self {
        Self {
            start: at.clone(),
            end: at,
        }
    }

    /// 选中节点本身
    pub fn select_node(node: &Handle) -> Option<Self> {
        Some(Self::new(Boundary::before(node)?, Boundary::after(node)?))
    }

    /// 选中节点的全部内容
    pub fn select_node_contents(node: &Handle) -> Self {
        Self::new(Boundary::new(node, 0), Boundary::new(node, node_length(node)))
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// 起止边界的最近公共祖先
    pub fn common_ancestor(&self) -> Handle {
        let mut candidate = self.start.node.clone();
        loop {
            if is_inclusive_ancestor(&candidate, &self.end.node) {
                return candidate;
            }
            match get_parent_node(&candidate) {
                Some(parent) => candidate = parent,
                None => return candidate,
            }
        }
    }

    /// 克隆范围内容到一个游离的 `div` 容器中
    ///
    /// 与 DOM `Range.cloneContents()` 相同：边界处的文本按偏移截断，
    /// 部分选中的元素只做浅拷贝并带上其选中的后代。
    pub fn clone_contents(&self) -> Handle {
        let container = create_element("div", &[]);
        for node in clone_between(&self.start, &self.end) {
            append_child(&container, &node);
        }
        container
    }
}

fn clone_text_slice(node: &Handle, start: usize, end: usize) -> Handle {
    let copy = shallow_clone(node);
    let text = get_node_text(node).unwrap_or_default();
    set_node_text(&copy, &char_slice(&text, start, end));
    copy
}

/// 找到 `ancestor` 的直接子节点中包含 `node` 的那个
fn child_containing(ancestor: &Handle, node: &Handle) -> Option<(Handle, usize)> {
    let mut current = node.clone();
    loop {
        let (parent, index) = index_in_parent(&current)?;
        if Rc::ptr_eq(&parent, ancestor) {
            return Some((current, index));
        }
        current = parent;
    }
}

fn clone_between(start: &Boundary, end: &Boundary) -> Vec<Handle> {
    let mut cloned = Vec::new();

    if start == end {
        return cloned;
    }

    if Rc::ptr_eq(&start.node, &end.node) && is_character_data(&start.node) {
        cloned.push(clone_text_slice(&start.node, start.offset, end.offset));
        return cloned;
    }

    let common = SelectionRange::new(start.clone(), end.clone()).common_ancestor();

    let first_partial = if is_inclusive_ancestor(&start.node, &end.node) {
        None
    } else {
        child_containing(&common, &start.node)
    };
    let last_partial = if is_inclusive_ancestor(&end.node, &start.node) {
        None
    } else {
        child_containing(&common, &end.node)
    };

    let contained_from = match &first_partial {
        Some((_, index)) => index + 1,
        None => start.offset,
    };
    let contained_to = match &last_partial {
        Some((_, index)) => *index,
        None => end.offset,
    };

    if let Some((child, _)) = &first_partial {
        if is_character_data(child) {
            cloned.push(clone_text_slice(child, start.offset, node_length(child)));
        } else {
            let copy = shallow_clone(child);
            let inner_end = Boundary::new(child, node_length(child));
            for node in clone_between(start, &inner_end) {
                append_child(&copy, &node);
            }
            cloned.push(copy);
        }
    }

    {
        let children = common.children.borrow();
        for child in children
            .iter()
            .skip(contained_from)
            .take(contained_to.saturating_sub(contained_from))
        {
            cloned.push(deep_clone(child));
        }
    }

    if let Some((child, _)) = &last_partial {
        if is_character_data(child) {
            cloned.push(clone_text_slice(child, 0, end.offset));
        } else {
            let copy = shallow_clone(child);
            let inner_start = Boundary::new(child, 0);
            for node in clone_between(&inner_start, end) {
                append_child(&copy, &node);
            }
            cloned.push(copy);
        }
    }

    cloned
}

/// 文档的当前选区
#[derive(Clone, Debug, Default)]
pub struct Selection {
    ranges: Vec<SelectionRange>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn range_at(&self, index: usize) -> Option<&SelectionRange> {
        self.ranges.get(index)
    }

    pub fn add_range(&mut self, range: SelectionRange) {
        self.ranges.push(range);
    }

    pub fn remove_all_ranges(&mut self) {
        self.ranges.clear();
    }

    /// 把选区折叠到某一点，只保留一个范围
    pub fn collapse(&mut self, at: Boundary) {
        self.ranges = vec![SelectionRange::collapsed_at(at)];
    }

    /// 没有范围或首个范围为空时视为折叠
    pub fn is_collapsed(&self) -> bool {
        self.ranges.first().map_or(true, SelectionRange::is_collapsed)
    }

    pub(crate) fn boundaries_mut(&mut self) -> impl Iterator<Item = &mut Boundary> {
        self.ranges
            .iter_mut()
            .flat_map(|range| [&mut range.start, &mut range.end])
    }
}

/// 捕获的选区：原始范围加上序列化后的游离副本
#[derive(Clone, Debug)]
pub struct CapturedSelection {
    pub range: SelectionRange,
    pub serialized_html: String,
}

/// 捕获当前选区
///
/// 没有任何范围时返回 [`TunerError::NoSelection`]。只使用第一个范围，
/// 其内容被克隆到游离容器后再序列化，之后对文档的修改不会影响结果。
pub fn capture_selection(selection: &Selection) -> TunerResult<CapturedSelection> {
    let range = selection.range_at(0).ok_or(TunerError::NoSelection)?.clone();
    let container = range.clone_contents();
    let serialized_html = serialize_children(&container);

    tracing::debug!(
        "捕获选区: {} 个范围, 序列化长度 {}",
        selection.range_count(),
        serialized_html.len()
    );

    Ok(CapturedSelection {
        range,
        serialized_html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{find_nodes, html_to_dom};

    fn first(root: &Handle, name: &str) -> Handle {
        find_nodes(root, name).remove(0)
    }

    #[test]
    fn no_ranges_means_no_selection() {
        let result = capture_selection(&Selection::new());
        assert!(matches!(result, Err(TunerError::NoSelection)));
    }

    #[test]
    fn selecting_a_paragraph() {
        let dom = html_to_dom(b"<p>Hello world</p><p>Other</p>", "utf-8");
        let p = first(&dom.document, "p");
        let mut selection = Selection::new();
        selection.add_range(SelectionRange::select_node(&p).unwrap());

        let captured = capture_selection(&selection).unwrap();
        assert_eq!(captured.serialized_html, "<p>Hello world</p>");
    }

    #[test]
    fn partial_text_inside_one_node() {
        let dom = html_to_dom(b"<p>Hello world</p>", "utf-8");
        let text = first(&dom.document, "p").children.borrow()[0].clone();
        let range = SelectionRange::new(Boundary::new(&text, 6), Boundary::new(&text, 11));

        assert_eq!(serialize_children(&range.clone_contents()), "world");
    }

    #[test]
    fn partial_selection_across_elements() {
        let dom = html_to_dom(b"<p>one <b>two</b></p><p>three four</p>", "utf-8");
        let paragraphs = find_nodes(&dom.document, "p");
        let start_text = paragraphs[0].children.borrow()[0].clone();
        let end_text = paragraphs[1].children.borrow()[0].clone();
        let range = SelectionRange::new(Boundary::new(&start_text, 2), Boundary::new(&end_text, 5));

        assert_eq!(
            serialize_children(&range.clone_contents()),
            "<p>e <b>two</b></p><p>three</p>"
        );
    }

    #[test]
    fn clone_is_detached_from_document() {
        let dom = html_to_dom(b"<p>Hello world</p>", "utf-8");
        let p = first(&dom.document, "p");
        let range = SelectionRange::select_node(&p).unwrap();
        let copy = range.clone_contents();

        set_node_text(&p.children.borrow()[0], "changed");
        assert_eq!(serialize_children(&copy), "<p>Hello world</p>");
    }

    #[test]
    fn collapsed_range_clones_nothing() {
        let dom = html_to_dom(b"<p>Hello</p>", "utf-8");
        let p = first(&dom.document, "p");
        let mut selection = Selection::new();
        selection.add_range(SelectionRange::collapsed_at(Boundary::new(&p, 0)));

        assert!(selection.is_collapsed());
        assert_eq!(capture_selection(&selection).unwrap().serialized_html, "");
    }

    #[test]
    fn empty_selection_counts_as_collapsed() {
        assert!(Selection::new().is_collapsed());
    }
}
