//! 渲染信息来源
//!
//! 提取器需要计算样式和布局几何信息，这些由宿主环境提供。`RenderView`
//! 是这一协作方的接口；`InlineRenderView` 是不依赖布局引擎的默认实现，
//! 根据内联 `style`、`hidden` 属性和用户代理默认样式推断结果。

use markup5ever_rcdom::{Handle, NodeData};
use thiserror::Error;

use crate::parsers::css::{parse_inline_style, InlineStyle};
use crate::parsers::html::dom::{get_node_attr, get_node_name, get_parent_node, is_attached};
use crate::parsers::html::utils::{REPLACED_ELEMENTS, UA_BLOCK_ELEMENTS, UA_HIDDEN_ELEMENTS};

/// 默认块级盒子宽度（像素）
pub const DEFAULT_BLOCK_WIDTH: f64 = 800.0;
/// 行内内容每个字符的估算宽度（像素）
pub const DEFAULT_CHAR_WIDTH: f64 = 8.0;
/// 默认行高（像素）
pub const DEFAULT_LINE_HEIGHT: f64 = 18.0;

/// 样式或几何计算失败
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("节点不是元素: {0}")]
    NotAnElement(String),

    #[error("节点已脱离文档")]
    Detached,

    #[error("样式计算失败: {0}")]
    Style(String),
}

/// `visibility` 计算值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    Collapse,
}

impl Visibility {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "visible" => Some(Visibility::Visible),
            "hidden" => Some(Visibility::Hidden),
            "collapse" => Some(Visibility::Collapse),
            _ => None,
        }
    }
}

/// 与可见性判断相关的计算样式
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: Visibility,
    pub opacity: f32,
}

/// 渲染后的边界框
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// 计算样式与布局的提供方
pub trait RenderView {
    /// 节点的计算样式，非元素节点应返回错误
    fn computed_style(&self, node: &Handle) -> Result<ComputedStyle, RenderError>;

    /// 节点渲染后的边界框
    fn bounding_rect(&self, node: &Handle) -> Result<Rect, RenderError>;
}

impl<T: RenderView + ?Sized> RenderView for &T {
    fn computed_style(&self, node: &Handle) -> Result<ComputedStyle, RenderError> {
        (**self).computed_style(node)
    }

    fn bounding_rect(&self, node: &Handle) -> Result<Rect, RenderError> {
        (**self).bounding_rect(node)
    }
}

/// 基于内联样式的渲染视图
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineRenderView;

impl InlineRenderView {
    pub fn new() -> Self {
        Self
    }

    fn element_name(node: &Handle) -> Result<String, RenderError> {
        match &node.data {
            NodeData::Element { name, .. } => Ok(name.local.to_string().to_ascii_lowercase()),
            NodeData::Text { .. } => Err(RenderError::NotAnElement("#text".to_string())),
            NodeData::Comment { .. } => Err(RenderError::NotAnElement("#comment".to_string())),
            NodeData::Document => Err(RenderError::NotAnElement("#document".to_string())),
            NodeData::Doctype { .. } => Err(RenderError::NotAnElement("#doctype".to_string())),
            NodeData::ProcessingInstruction { .. } => {
                Err(RenderError::NotAnElement("#processing-instruction".to_string()))
            }
        }
    }

    fn inline_style(node: &Handle) -> InlineStyle {
        get_node_attr(node, "style")
            .map(|style| parse_inline_style(&style))
            .unwrap_or_default()
    }

    fn display_of(node: &Handle, name: &str, style: &InlineStyle) -> String {
        if let Some(display) = style.keyword("display") {
            return display.to_string();
        }
        if get_node_attr(node, "hidden").is_some() || UA_HIDDEN_ELEMENTS.contains(&name) {
            return "none".to_string();
        }
        if UA_BLOCK_ELEMENTS.contains(&name) {
            "block".to_string()
        } else {
            "inline".to_string()
        }
    }

    /// `visibility` 会继承，向上查找最近的显式声明
    fn visibility_of(node: &Handle) -> Visibility {
        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            let declared = Self::inline_style(&candidate)
                .keyword("visibility")
                .and_then(Visibility::from_keyword);
            if let Some(visibility) = declared {
                return visibility;
            }
            current = get_parent_node(&candidate);
        }
        Visibility::Visible
    }

    fn opacity_of(style: &InlineStyle) -> Result<f32, RenderError> {
        use crate::parsers::css::CssValue;

        match style.get("opacity") {
            None => Ok(1.0),
            Some(CssValue::Number(value)) => Ok(value.clamp(0.0, 1.0)),
            Some(CssValue::Percentage(value)) => Ok(value.clamp(0.0, 1.0)),
            Some(other) => Err(RenderError::Style(format!("无法识别的 opacity: {:?}", other))),
        }
    }

    /// 节点自身或任一祖先为 `display: none`
    fn is_display_none(&self, node: &Handle) -> bool {
        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if let Ok(style) = self.computed_style(&candidate) {
                if style.display == "none" {
                    return true;
                }
            }
            current = get_parent_node(&candidate);
        }
        false
    }

    /// 估算内容占据的宽度；没有可渲染内容时为 0
    fn content_width(node: &Handle) -> f64 {
        match &node.data {
            NodeData::Text { contents } => {
                contents.borrow().trim().chars().count() as f64 * DEFAULT_CHAR_WIDTH
            }
            NodeData::Element { .. } => {
                let name = get_node_name(node).unwrap_or_default().to_ascii_lowercase();
                if REPLACED_ELEMENTS.contains(&name.as_str()) {
                    return DEFAULT_BLOCK_WIDTH / 4.0;
                }
                node.children
                    .borrow()
                    .iter()
                    .map(Self::content_width)
                    .sum()
            }
            _ => 0.0,
        }
    }
}

impl RenderView for InlineRenderView {
    fn computed_style(&self, node: &Handle) -> Result<ComputedStyle, RenderError> {
        let name = Self::element_name(node)?;
        if !is_attached(node) {
            return Err(RenderError::Detached);
        }

        let style = Self::inline_style(node);

        Ok(ComputedStyle {
            display: Self::display_of(node, &name, &style),
            visibility: Self::visibility_of(node),
            opacity: Self::opacity_of(&style)?,
        })
    }

    fn bounding_rect(&self, node: &Handle) -> Result<Rect, RenderError> {
        let name = Self::element_name(node)?;
        if !is_attached(node) {
            return Err(RenderError::Detached);
        }
        if self.is_display_none(node) {
            return Ok(Rect::default());
        }

        let style = Self::inline_style(node);
        let content_width = Self::content_width(node);
        let has_content = content_width > 0.0;

        let default_width = if !has_content {
            0.0
        } else if UA_BLOCK_ELEMENTS.contains(&name.as_str()) {
            DEFAULT_BLOCK_WIDTH
        } else {
            content_width.min(DEFAULT_BLOCK_WIDTH)
        };
        let default_height = if has_content {
            DEFAULT_LINE_HEIGHT
        } else {
            0.0
        };

        Ok(Rect {
            x: 0.0,
            y: 0.0,
            width: style
                .get("width")
                .and_then(|value| value.as_px())
                .unwrap_or(default_width),
            height: style
                .get("height")
                .and_then(|value| value.as_px())
                .unwrap_or(default_height),
        })
    }
}
