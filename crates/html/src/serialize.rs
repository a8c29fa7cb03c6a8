use crate::entities::{escape_attr, escape_text};
use crate::tokenizer::{is_void_element, text_only_element};
use crate::types::Node;

/// Serialize a node the way `outerHTML` would.
pub fn to_html(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, false, &mut out);
    out
}

/// Serialize the children of a node the way `innerHTML` would.
pub fn inner_html(node: &Node) -> String {
    serialize_children(node.children(), raw_text_parent(node))
}

/// Serialize a list of sibling nodes. `raw` keeps text unescaped (script/style bodies).
pub fn serialize_children(nodes: &[Node], raw: bool) -> String {
    let mut out = String::new();
    for n in nodes {
        write_node(n, raw, &mut out);
    }
    out
}

fn raw_text_parent(node: &Node) -> bool {
    node.tag_name()
        .and_then(text_only_element)
        .is_some_and(|decodes| !decodes)
}

fn write_node(node: &Node, raw: bool, out: &mut String) {
    match node {
        Node::Document {
            doctype, children, ..
        } => {
            if let Some(dt) = doctype {
                out.push_str("<!");
                out.push_str(dt);
                out.push('>');
            }
            for c in children {
                write_node(c, false, out);
            }
        }
        Node::Element {
            name,
            attributes,
            children,
            ..
        } => {
            out.push('<');
            out.push_str(name);
            for (k, v) in attributes {
                out.push(' ');
                out.push_str(k);
                if let Some(v) = v {
                    out.push_str("=\"");
                    escape_attr(v, out);
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(name) {
                return;
            }
            let raw_children = raw_text_parent(node);
            for c in children {
                write_node(c, raw_children, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Node::Text { text, .. } => {
            if raw {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        Node::Comment { text, .. } => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
    }
}
