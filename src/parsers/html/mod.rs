//! HTML解析和处理模块
//!
//! - `utils`: 基础常量和工具函数
//! - `dom`: 基础DOM操作
//! - `document`: 活动页面与选区同步
//! - `metadata`: 文档元数据处理
//! - `serializer`: 序列化功能

pub mod document;
pub mod dom;
pub mod metadata;
pub mod serializer;
pub mod utils;

pub use document::Document;
pub use dom::{
    create_element, create_text_node, find_nodes, get_child_node_by_name, get_node_attr,
    get_node_name, get_parent_node, html_to_dom, set_node_attr,
};
pub use metadata::get_title;
pub use serializer::{serialize_children, serialize_document, serialize_node};
pub use utils::{is_non_content_element, NON_CONTENT_ELEMENTS, WHITESPACES};
