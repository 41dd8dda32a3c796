//! # 内联样式解析
//!
//! 使用 cssparser 的分词器读取 `style` 属性中的声明。只保留每个声明的第一个
//! 组件值，足以判断 `display`、`visibility`、`opacity`、`width`、`height`
//! 这类单值属性。后出现的同名声明覆盖先前的声明，与层叠规则一致。

use cssparser::{Parser, ParserInput, ToCss, Token};

/// 单个组件值
#[derive(Debug, Clone, PartialEq)]
pub enum CssValue {
    Keyword(String),
    Number(f32),
    Length { value: f32, unit: String },
    Percentage(f32),
    Other(String),
}

impl CssValue {
    fn from_token(token: &Token) -> Self {
        match token {
            Token::Ident(ident) => CssValue::Keyword(ident.to_ascii_lowercase()),
            Token::Number { value, .. } => CssValue::Number(*value),
            Token::Dimension { value, unit, .. } => CssValue::Length {
                value: *value,
                unit: unit.to_ascii_lowercase(),
            },
            Token::Percentage { unit_value, .. } => CssValue::Percentage(*unit_value),
            other => CssValue::Other(other.to_css_string()),
        }
    }

    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            CssValue::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }

    /// 以像素表示的长度；无单位的 0 也视为长度
    pub fn as_px(&self) -> Option<f64> {
        match self {
            CssValue::Length { value, unit } if unit == "px" => Some(*value as f64),
            CssValue::Number(value) if *value == 0.0 => Some(0.0),
            _ => None,
        }
    }
}

/// 解析后的内联样式
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineStyle {
    declarations: Vec<(String, CssValue)>,
}

impl InlineStyle {
    /// 读取属性值，同名时取最后一个
    pub fn get(&self, name: &str) -> Option<&CssValue> {
        self.declarations
            .iter()
            .rev()
            .find(|(property, _)| property == name)
            .map(|(_, value)| value)
    }

    pub fn keyword(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(CssValue::as_keyword)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// 解析 `style` 属性
pub fn parse_inline_style(style: &str) -> InlineStyle {
    let mut input = ParserInput::new(style);
    let mut parser = Parser::new(&mut input);
    let mut declarations = Vec::new();

    let mut name: Option<String> = None;
    let mut value: Option<CssValue> = None;
    let mut after_colon = false;

    loop {
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::Semicolon => {
                if let (Some(property), Some(v)) = (name.take(), value.take()) {
                    declarations.push((property, v));
                }
                after_colon = false;
            }
            Token::Colon if name.is_some() && !after_colon => after_colon = true,
            Token::Ident(ref ident) if !after_colon => {
                name = Some(ident.to_ascii_lowercase());
            }
            ref other if after_colon && value.is_none() => {
                value = Some(CssValue::from_token(other));
            }
            _ => {}
        }
    }

    if let (Some(property), Some(v)) = (name, value) {
        declarations.push((property, v));
    }

    InlineStyle { declarations }
}
