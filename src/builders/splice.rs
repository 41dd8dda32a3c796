//! 结果容器的构建与插入

use markup5ever_rcdom::Handle;

use crate::extraction::selection::Boundary;
use crate::parsers::html::dom::{append_child, create_element, create_text_node};
use crate::parsers::html::Document;

/// 结果容器的类名，用来在下一次调用前找到并清除旧结果
pub const RESULT_MARKER_CLASS: &str = "readingTunerInfoDiv";

/// 结果容器的固定内联样式
pub const RESULT_CONTAINER_STYLE: &str = "background-color: #f2f4f8; \
    border: 2px solid #99ccff; \
    border-radius: 10px; \
    color: #333333; \
    font-family: 'Arial', sans-serif; \
    font-size: 18px; \
    padding: 15px; \
    margin: 10px 0; \
    box-shadow: 0 4px 8px rgba(0, 0, 0, 0.1); \
    transition: all 0.3s ease; \
    cursor: pointer;";

/// 移除文档中所有结果容器，返回移除的数量
pub fn clear_markers(document: &Document) -> usize {
    let markers = document.find_by_class(RESULT_MARKER_CLASS);
    let removed = markers
        .iter()
        .filter(|marker| document.remove_node(marker))
        .count();

    if removed > 0 {
        tracing::debug!("清除了 {} 个旧结果容器", removed);
    }
    removed
}

/// 创建结果容器
///
/// 结果作为纯文本放入，即使内容看起来像 HTML 也不会被解析。
pub fn build_result_container(text: &str) -> Handle {
    let container = create_element(
        "div",
        &[("class", RESULT_MARKER_CLASS), ("style", RESULT_CONTAINER_STYLE)],
    );
    append_child(&container, &create_text_node(text));
    container
}

/// 在当前选区起点插入结果容器
///
/// 选区为空或已折叠时不做任何修改并返回 `None`。原选中的内容保留，
/// 插入后选区折叠到容器之后。
pub fn splice_result(document: &Document, text: &str) -> Option<Handle> {
    let start = {
        let selection = document.selection();
        if selection.is_collapsed() {
            tracing::debug!("选区已折叠，跳过插入");
            return None;
        }
        selection.range_at(0)?.start.clone()
    };

    let container = build_result_container(text);
    if !document.insert_node(&start, &container) {
        tracing::warn!("无法在选区起点插入结果容器: {:?}", start);
        return None;
    }

    let after = Boundary::after(&container)?;
    document.collapse_selection(after);
    tracing::info!("已插入结果容器, {} 字符", text.chars().count());

    Some(container)
}
