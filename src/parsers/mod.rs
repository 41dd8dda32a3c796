//! # 解析器模块
//!
//! - `html` - HTML文档解析、DOM操作、序列化
//! - `css` - 内联样式声明解析

pub mod css;
pub mod html;

// Re-export commonly used items for convenience
pub use css::{parse_inline_style, CssValue, InlineStyle};
pub use html::{html_to_dom, serialize_children, Document};
