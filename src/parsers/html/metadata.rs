use markup5ever_rcdom::{Handle, NodeData};

use super::dom::find_nodes;
use super::utils::collapse_whitespace;

/// 获取文档标题
///
/// 与浏览器的 `document.title` 一致：取文档中第一个 `<title>` 元素的文本，
/// 并折叠其中的空白字符。
pub fn get_title(node: &Handle) -> Option<String> {
    let title_node = find_nodes(node, "title").into_iter().next()?;
    let mut title = String::new();

    for child_node in title_node.children.borrow().iter() {
        if let NodeData::Text { ref contents } = child_node.data {
            title.push_str(&contents.borrow());
        }
    }

    Some(collapse_whitespace(&title))
}
