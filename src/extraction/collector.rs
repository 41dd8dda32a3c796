//! 文本收集器模块
//!
//! 深度优先遍历 DOM，找出真正对读者可见的文本节点

use std::collections::HashMap;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, Node, NodeData};

use crate::parsers::html::dom::get_parent_node;

use super::filters::{has_size, is_content_like, is_visible};
use super::render::RenderView;

/// 一个可见文本节点
#[derive(Debug, Clone)]
pub struct TextNodeRecord {
    /// 发现顺序，同一次遍历内唯一且递增
    pub index: usize,
    /// DOM节点引用
    pub node: Handle,
    /// 去除首尾空白后的字符数
    pub trimmed_len: usize,
}

impl TextNodeRecord {
    /// 节点当前的文本内容
    pub fn text(&self) -> String {
        match &self.node.data {
            NodeData::Text { contents } => contents.borrow().to_string(),
            _ => String::new(),
        }
    }
}

/// 节点身份到发现序号的映射
///
/// 遍历结果不写回 DOM 节点，需要按节点查询序号时使用这里的映射。
#[derive(Debug, Default)]
pub struct TextNodeIndex {
    records: Vec<TextNodeRecord>,
    positions: HashMap<*const Node, usize>,
}

impl TextNodeIndex {
    pub fn from_records(records: Vec<TextNodeRecord>) -> Self {
        let positions = records
            .iter()
            .map(|record| (Rc::as_ptr(&record.node), record.index))
            .collect();
        Self { records, positions }
    }

    /// 查询节点的发现序号
    pub fn index_of(&self, node: &Handle) -> Option<usize> {
        self.positions.get(&Rc::as_ptr(node)).copied()
    }

    pub fn records(&self) -> &[TextNodeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按文档顺序拼接所有文本
    pub fn joined_text(&self, separator: &str) -> String {
        self.records
            .iter()
            .map(|record| record.text().trim().to_string())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// 文本收集器
pub struct TextCollector<R> {
    render: R,
}

impl<R: RenderView> TextCollector<R> {
    pub fn new(render: R) -> Self {
        Self { render }
    }

    /// 收集 `root` 子树中的可见文本节点，保持文档顺序
    pub fn find_text_nodes(&self, root: &Handle) -> Vec<TextNodeRecord> {
        let mut records = Vec::new();
        self.walk(root, &mut records);
        tracing::debug!("收集到 {} 个可见文本节点", records.len());
        records
    }

    /// 收集并建立节点到序号的映射
    pub fn index(&self, root: &Handle) -> TextNodeIndex {
        TextNodeIndex::from_records(self.find_text_nodes(root))
    }

    fn walk(&self, node: &Handle, records: &mut Vec<TextNodeRecord>) {
        if !is_visible(&self.render, node) {
            return;
        }

        if let NodeData::Text { ref contents } = node.data {
            let trimmed_len = contents.borrow().trim().chars().count();
            let parent_has_size = get_parent_node(node)
                .map(|parent| has_size(&self.render, &parent))
                .unwrap_or(false);

            if trimmed_len > 0 && parent_has_size {
                records.push(TextNodeRecord {
                    index: records.len(),
                    node: node.clone(),
                    trimmed_len,
                });
            }
        } else if is_content_like(node) {
            for child in node.children.borrow().iter() {
                self.walk(child, records);
            }
        }
    }
}
