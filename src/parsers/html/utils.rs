/// ASCII 空白字符
pub const WHITESPACES: &[char] = &[' ', '\t', '\n', '\x0c', '\r'];

/// 不承载用户可见内容的元素（结构性或非文本媒体）
///
/// 遍历时遇到这些元素会直接剪枝，不再深入其子节点。
pub const NON_CONTENT_ELEMENTS: &[&str] = &[
    "META", "LINK", "HEAD", "CANVAS", "SVG", "AUDIO", "VIDEO", "SOURCE", "TRACK", "PATH",
    "SCRIPT", "NOSCRIPT", "STYLE", "OBJECT", "EMBED",
];

/// 用户代理样式表中默认 `display: none` 的元素
pub const UA_HIDDEN_ELEMENTS: &[&str] = &[
    "head", "script", "style", "meta", "link", "title", "template", "base", "noscript",
];

/// 用户代理样式表中默认为块级的元素
pub const UA_BLOCK_ELEMENTS: &[&str] = &[
    "html", "body", "div", "p", "section", "article", "aside", "header", "footer", "nav", "main",
    "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "dl", "dt", "dd", "blockquote", "pre",
    "figure", "figcaption", "form", "fieldset", "table", "address", "hr",
];

/// 即使没有文本也会占据空间的替换元素
pub const REPLACED_ELEMENTS: &[&str] = &[
    "img", "video", "canvas", "iframe", "input", "textarea", "select", "button", "svg", "embed",
    "object",
];

/// 检查元素名是否属于非内容元素（大小写不敏感）
pub fn is_non_content_element(name: &str) -> bool {
    NON_CONTENT_ELEMENTS
        .iter()
        .any(|tag| tag.eq_ignore_ascii_case(name))
}

/// 将文本中的连续空白折叠为单个空格
pub fn collapse_whitespace(text: &str) -> String {
    text.split(WHITESPACES)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_content_lookup_ignores_case() {
        assert!(is_non_content_element("script"));
        assert!(is_non_content_element("NoScript"));
        assert!(is_non_content_element("path"));
        assert!(!is_non_content_element("p"));
        assert!(!is_non_content_element("iframe"));
    }

    #[test]
    fn collapses_runs_of_whitespace() {
        assert_eq!(collapse_whitespace("  Reading \n\t Tuner  "), "Reading Tuner");
        assert_eq!(collapse_whitespace(""), "");
    }
}
