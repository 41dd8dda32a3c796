//! # 内容提取模块
//!
//! 判断节点是否可见、收集可见文本节点、捕获并序列化当前选区。
//!
//! - `render` - 计算样式和几何信息的来源
//! - `filters` - 可见性、内容类元素和尺寸判断
//! - `collector` - 可见文本节点收集
//! - `selection` - 选区模型与捕获

pub mod collector;
pub mod filters;
pub mod render;
pub mod selection;

pub use collector::{TextCollector, TextNodeIndex, TextNodeRecord};
pub use filters::{has_size, is_content_like, is_visible};
pub use render::{ComputedStyle, InlineRenderView, Rect, RenderError, RenderView, Visibility};
pub use selection::{capture_selection, Boundary, CapturedSelection, Selection, SelectionRange};
