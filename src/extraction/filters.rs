//! 节点过滤器
//!
//! 判断节点是否可见、是否可能承载内容、是否占据渲染面积

use markup5ever_rcdom::Handle;

use crate::parsers::html::dom::get_node_name;
use crate::parsers::html::utils::is_non_content_element;

use super::render::{RenderView, Visibility};

/// 节点是否可见
///
/// 计算样式失败时（非元素节点、脱离文档的节点）默认可见。
pub fn is_visible<R: RenderView + ?Sized>(render: &R, node: &Handle) -> bool {
    match render.computed_style(node) {
        Ok(style) => {
            style.display != "none"
                && style.visibility != Visibility::Hidden
                && style.opacity != 0.0
        }
        Err(error) => {
            tracing::trace!("无法计算样式，按可见处理: {}", error);
            true
        }
    }
}

/// 节点是否可能承载用户可见内容
///
/// 非元素节点一律视为可能承载内容。
pub fn is_content_like(node: &Handle) -> bool {
    match get_node_name(node) {
        Some(name) => !is_non_content_element(name),
        None => true,
    }
}

/// 节点渲染后的宽高是否都大于 0
///
/// 几何计算失败时按没有面积处理。
pub fn has_size<R: RenderView + ?Sized>(render: &R, node: &Handle) -> bool {
    match render.bounding_rect(node) {
        Ok(rect) => rect.width > 0.0 && rect.height > 0.0,
        Err(error) => {
            tracing::trace!("无法计算边界框，按无面积处理: {}", error);
            false
        }
    }
}
