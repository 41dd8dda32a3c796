use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{format_tendril, StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> RcDom {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.to_string()
        }
        None => String::from_utf8_lossy(data).to_string(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .unwrap_or_default()
}

/// 查找具有指定名称的所有元素（先序）
pub fn find_nodes(node: &Handle, node_name: &str) -> Vec<Handle> {
    let mut found_nodes = Vec::new();

    if get_node_name(node).is_some_and(|name| name.eq_ignore_ascii_case(node_name)) {
        found_nodes.push(node.clone());
    }

    for child_node in node.children.borrow().iter() {
        found_nodes.append(&mut find_nodes(child_node, node_name));
    }

    found_nodes
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点
///
/// 节点已脱离文档树时返回 `None`。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 设置节点属性，`None` 表示删除该属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.clone() {
                    attrs_mut[i].value.clear();
                    attrs_mut[i].value.push_slice(attr_value.as_str());
                } else {
                    // Remove attr completely if attr_value is not defined
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            if let Some(attr_value) = attr_value {
                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}

/// 检查元素的 class 列表是否包含指定类名
pub fn has_class(node: &Handle, class_name: &str) -> bool {
    get_node_attr(node, "class")
        .map(|classes| classes.split_ascii_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

/// 创建游离的 HTML 元素
pub fn create_element(name: &str, attrs: &[(&str, &str)]) -> Handle {
    let attrs = attrs
        .iter()
        .map(|(attr_name, attr_value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*attr_name)),
            value: format_tendril!("{}", attr_value),
        })
        .collect();

    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(name)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// 创建游离的文本节点
pub fn create_text_node(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

/// 是否为文本节点
pub fn is_text_node(node: &Handle) -> bool {
    matches!(node.data, NodeData::Text { .. })
}

/// 是否为字符数据节点（文本、注释、处理指令）
pub fn is_character_data(node: &Handle) -> bool {
    matches!(
        node.data,
        NodeData::Text { .. } | NodeData::Comment { .. } | NodeData::ProcessingInstruction { .. }
    )
}

/// 读取字符数据节点的内容
pub fn get_node_text(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        NodeData::Comment { contents } => Some(contents.to_string()),
        NodeData::ProcessingInstruction { contents, .. } => Some(contents.to_string()),
        _ => None,
    }
}

/// 替换文本节点内容，非文本节点不做任何事
pub fn set_node_text(node: &Handle, text: &str) {
    if let NodeData::Text { contents } = &node.data {
        *contents.borrow_mut() = StrTendril::from_slice(text);
    }
}

/// 按字符偏移截取子串
pub fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

/// 节点长度：字符数据为字符数，其余为子节点数
pub fn node_length(node: &Handle) -> usize {
    match get_node_text(node) {
        Some(text) => text.chars().count(),
        None => node.children.borrow().len(),
    }
}

/// 节点在父节点子列表中的位置
pub fn index_in_parent(node: &Handle) -> Option<(Handle, usize)> {
    let parent = get_parent_node(node)?;
    let index = parent
        .children
        .borrow()
        .iter()
        .position(|child| Rc::ptr_eq(child, node))?;
    Some((parent, index))
}

/// 将节点从父节点中摘除，返回原父节点和原位置
pub fn detach_node(node: &Handle) -> Option<(Handle, usize)> {
    let (parent, index) = index_in_parent(node)?;
    parent.children.borrow_mut().remove(index);
    node.parent.set(None);
    Some((parent, index))
}

/// 在指定位置插入子节点（超出范围时追加）
pub fn insert_child_at(parent: &Handle, index: usize, child: &Handle) {
    detach_node(child);
    let mut children = parent.children.borrow_mut();
    let index = index.min(children.len());
    children.insert(index, child.clone());
    child.parent.set(Some(Rc::downgrade(parent)));
}

/// 追加子节点
pub fn append_child(parent: &Handle, child: &Handle) {
    let len = parent.children.borrow().len();
    insert_child_at(parent, len, child);
}

/// `ancestor` 是否为 `node` 的祖先或其本身
pub fn is_inclusive_ancestor(ancestor: &Handle, node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if Rc::ptr_eq(&candidate, ancestor) {
            return true;
        }
        current = get_parent_node(&candidate);
    }
    false
}

/// 节点是否挂在某个文档节点之下
pub fn is_attached(node: &Handle) -> bool {
    let mut current = node.clone();
    loop {
        if let NodeData::Document = current.data {
            return true;
        }
        match get_parent_node(&current) {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}

/// 浅拷贝节点（不含子节点）
pub fn shallow_clone(node: &Handle) -> Handle {
    let data = match &node.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            name,
            attrs,
            template_contents,
            mathml_annotation_xml_integration_point,
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(template_contents.borrow().as_ref().map(deep_clone)),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            }
        }
    };

    Node::new(data)
}

/// 深拷贝节点及其全部后代
pub fn deep_clone(node: &Handle) -> Handle {
    let copy = shallow_clone(node);
    for child in node.children.borrow().iter() {
        append_child(&copy, &deep_clone(child));
    }
    copy
}
