use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use markup5ever_rcdom::{Handle, SerializableHandle};

fn serialize_with_scope(node: &Handle, traversal_scope: TraversalScope) -> String {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = node.clone().into();
    let opts = SerializeOpts {
        traversal_scope,
        ..Default::default()
    };

    if let Err(error) = serialize(&mut buf, &serializable, opts) {
        tracing::error!("DOM 序列化失败: {}", error);
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// 序列化节点的子节点，等价于 `innerHTML`
pub fn serialize_children(node: &Handle) -> String {
    serialize_with_scope(node, TraversalScope::ChildrenOnly(None))
}

/// 序列化节点本身及其子树，等价于 `outerHTML`
pub fn serialize_node(node: &Handle) -> String {
    serialize_with_scope(node, TraversalScope::IncludeNode)
}

/// 序列化整个文档
pub fn serialize_document(document: &Handle) -> String {
    serialize_children(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{create_element, create_text_node, append_child};

    #[test]
    fn inner_and_outer_markup() {
        let div = create_element("div", &[("class", "box")]);
        let p = create_element("p", &[]);
        append_child(&p, &create_text_node("Hello & bye"));
        append_child(&div, &p);

        assert_eq!(serialize_children(&div), "<p>Hello &amp; bye</p>");
        assert_eq!(
            serialize_node(&div),
            "<div class=\"box\"><p>Hello &amp; bye</p></div>"
        );
    }
}
