//! 页面文档
//!
//! 持有 DOM 树、当前选区和页面地址。所有会改变树结构的操作都经过这里，
//! 以便同步调整选区边界（live range 语义）。

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use markup5ever_rcdom::{Handle, RcDom};

use crate::extraction::selection::{Boundary, Selection, SelectionRange};

use super::dom::{
    char_slice, create_text_node, detach_node, find_nodes, get_node_text, has_class, html_to_dom,
    index_in_parent, insert_child_at, is_inclusive_ancestor, is_text_node, set_node_text,
};
use super::metadata::get_title;
use super::serializer::serialize_document;

/// 活动页面
pub struct Document {
    dom: RcDom,
    selection: RefCell<Selection>,
    url: Option<String>,
}

impl Document {
    /// 解析 UTF-8 HTML 文本
    pub fn parse(html: &str) -> Self {
        Self::from_bytes(html.as_bytes(), "utf-8")
    }

    /// 按声明的字符集解析 HTML 字节
    pub fn from_bytes(data: &[u8], document_encoding: &str) -> Self {
        Self {
            dom: html_to_dom(data, document_encoding),
            selection: RefCell::new(Selection::new()),
            url: None,
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// 文档根节点
    pub fn root(&self) -> Handle {
        self.dom.document.clone()
    }

    pub fn body(&self) -> Option<Handle> {
        find_nodes(&self.dom.document, "body").into_iter().next()
    }

    /// 文档标题，没有 `<title>` 时为空字符串
    pub fn title(&self) -> String {
        get_title(&self.dom.document).unwrap_or_default()
    }

    pub fn selection(&self) -> Ref<'_, Selection> {
        self.selection.borrow()
    }

    pub fn selection_mut(&self) -> RefMut<'_, Selection> {
        self.selection.borrow_mut()
    }

    /// 用单个范围替换当前选区
    pub fn select(&self, range: SelectionRange) {
        let mut selection = self.selection.borrow_mut();
        selection.remove_all_ranges();
        selection.add_range(range);
    }

    /// 查找带有指定类名的所有元素
    pub fn find_by_class(&self, class_name: &str) -> Vec<Handle> {
        let mut found = Vec::new();
        collect_by_class(&self.dom.document, class_name, &mut found);
        found
    }

    /// 从树中移除节点
    ///
    /// 位于被移除子树内的边界被移到原位置，同一父节点中靠后的边界偏移减一。
    pub fn remove_node(&self, node: &Handle) -> bool {
        let Some((parent, index)) = detach_node(node) else {
            return false;
        };

        for boundary in self.selection.borrow_mut().boundaries_mut() {
            if is_inclusive_ancestor(node, &boundary.node) {
                *boundary = Boundary::new(&parent, index);
            } else if Rc::ptr_eq(&boundary.node, &parent) && boundary.offset > index {
                boundary.offset -= 1;
            }
        }

        true
    }

    /// 在边界点插入节点，语义同 `Range.insertNode()`
    ///
    /// 边界位于文本内部时先拆分文本节点，新节点放在两段之间。
    pub fn insert_node(&self, at: &Boundary, node: &Handle) -> bool {
        let (parent, index) = if is_text_node(&at.node) {
            let Some(split_off) = self.split_text(&at.node, at.offset) else {
                return false;
            };
            match index_in_parent(&split_off) {
                Some(position) => position,
                None => return false,
            }
        } else {
            (at.node.clone(), at.offset)
        };

        self.insert_child(&parent, index, node);
        true
    }

    /// 把选区折叠到某一点
    pub fn collapse_selection(&self, at: Boundary) {
        self.selection.borrow_mut().collapse(at);
    }

    pub fn to_html(&self) -> String {
        serialize_document(&self.dom.document)
    }

    fn insert_child(&self, parent: &Handle, index: usize, child: &Handle) {
        let index = index.min(parent.children.borrow().len());
        insert_child_at(parent, index, child);

        for boundary in self.selection.borrow_mut().boundaries_mut() {
            if Rc::ptr_eq(&boundary.node, parent) && boundary.offset > index {
                boundary.offset += 1;
            }
        }
    }

    /// 在字符偏移处拆分文本节点，返回新产生的后半段
    fn split_text(&self, text_node: &Handle, offset: usize) -> Option<Handle> {
        let text = get_node_text(text_node)?;
        let length = text.chars().count();
        let offset = offset.min(length);
        let (parent, index) = index_in_parent(text_node)?;

        let split_off = create_text_node(&char_slice(&text, offset, length));
        self.insert_child(&parent, index + 1, &split_off);

        for boundary in self.selection.borrow_mut().boundaries_mut() {
            if Rc::ptr_eq(&boundary.node, text_node) && boundary.offset > offset {
                boundary.node = split_off.clone();
                boundary.offset -= offset;
            } else if Rc::ptr_eq(&boundary.node, &parent) && boundary.offset == index + 1 {
                boundary.offset += 1;
            }
        }

        set_node_text(text_node, &char_slice(&text, 0, offset));
        Some(split_off)
    }
}

fn collect_by_class(node: &Handle, class_name: &str, found: &mut Vec<Handle>) {
    if has_class(node, class_name) {
        found.push(node.clone());
    }
    for child in node.children.borrow().iter() {
        collect_by_class(child, class_name, found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::create_element;

    fn paragraph(document: &Document, n: usize) -> Handle {
        find_nodes(&document.root(), "p").remove(n)
    }

    #[test]
    fn title_and_url() {
        let document = Document::parse("<title>Page</title><p>x</p>").with_url("https://example.com/a");
        assert_eq!(document.title(), "Page");
        assert_eq!(document.url(), Some("https://example.com/a"));
        assert_eq!(Document::parse("<p>x</p>").title(), "");
    }

    #[test]
    fn removal_moves_contained_boundaries() {
        let document = Document::parse("<p>a</p><p>b</p><p>c</p>");
        let body = document.body().unwrap();
        let middle = paragraph(&document, 1);
        let text = middle.children.borrow()[0].clone();

        document.select(SelectionRange::new(
            Boundary::new(&text, 0),
            Boundary::new(&body, 3),
        ));
        assert!(document.remove_node(&middle));

        let selection = document.selection();
        let range = selection.range_at(0).unwrap();
        assert_eq!(range.start, Boundary::new(&body, 1));
        assert_eq!(range.end, Boundary::new(&body, 2));
    }

    #[test]
    fn insertion_inside_text_splits_it() {
        let document = Document::parse("<p>Hello world</p>");
        let p = paragraph(&document, 0);
        let text = p.children.borrow()[0].clone();
        document.select(SelectionRange::new(
            Boundary::new(&text, 6),
            Boundary::new(&text, 11),
        ));

        let marker = create_element("span", &[]);
        assert!(document.insert_node(&Boundary::new(&text, 6), &marker));

        assert_eq!(p.children.borrow().len(), 3);
        assert_eq!(get_node_text(&p.children.borrow()[0]).as_deref(), Some("Hello "));
        assert!(Rc::ptr_eq(&p.children.borrow()[1], &marker));
        assert_eq!(get_node_text(&p.children.borrow()[2]).as_deref(), Some("world"));

        let selection = document.selection();
        let range = selection.range_at(0).unwrap();
        let tail = p.children.borrow()[2].clone();
        assert_eq!(range.end, Boundary::new(&tail, 5));
    }

    #[test]
    fn insertion_shifts_later_boundaries() {
        let document = Document::parse("<p>a</p><p>b</p>");
        let body = document.body().unwrap();
        document.select(SelectionRange::new(Boundary::new(&body, 0), Boundary::new(&body, 2)));

        let marker = create_element("div", &[]);
        assert!(document.insert_node(&Boundary::new(&body, 0), &marker));

        let selection = document.selection();
        let range = selection.range_at(0).unwrap();
        assert_eq!(range.start, Boundary::new(&body, 0));
        assert_eq!(range.end, Boundary::new(&body, 3));
    }

    #[test]
    fn finds_elements_by_class() {
        let document = Document::parse("<div class=\"a b\"></div><span class=\"b\"></span><p class=\"ab\"></p>");
        assert_eq!(document.find_by_class("b").len(), 2);
        assert_eq!(document.find_by_class("ab").len(), 1);
    }
}
