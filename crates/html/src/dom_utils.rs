use crate::{Id, Node};
use std::collections::BTreeMap;

pub fn attr<'a>(node: &'a Node, name: &str) -> Option<&'a str> {
    node.attr(name)
}

pub fn has_attr(node: &Node, name: &str) -> bool {
    node.has_attr(name)
}

/// Set (or replace) an attribute. Returns false for non-elements.
pub fn set_attr(node: &mut Node, name: &str, value: Option<&str>) -> bool {
    let Node::Element { attributes, .. } = node else {
        return false;
    };
    let value = value.map(str::to_string);
    match attributes.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some((_, v)) => *v = value,
        None => attributes.push((name.to_ascii_lowercase(), value)),
    }
    true
}

pub fn remove_attr(node: &mut Node, name: &str) -> bool {
    let Node::Element { attributes, .. } = node else {
        return false;
    };
    let before = attributes.len();
    attributes.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    attributes.len() != before
}

pub fn has_class(node: &Node, class: &str) -> bool {
    node.attr("class")
        .is_some_and(|c| c.split_ascii_whitespace().any(|t| t == class))
}

/// Union `classes` into the `class` attribute, keeping existing order.
pub fn add_classes<'c>(node: &mut Node, classes: impl IntoIterator<Item = &'c str>) {
    let mut list: Vec<String> = node
        .attr("class")
        .map(|c| c.split_ascii_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    let before = list.len();
    for class in classes {
        if !class.is_empty() && !list.iter().any(|c| c == class) {
            list.push(class.to_string());
        }
    }
    if list.len() != before {
        set_attr(node, "class", Some(&list.join(" ")));
    }
}

pub fn remove_class(node: &mut Node, class: &str) {
    let Some(current) = node.attr("class") else {
        return;
    };
    if !current.split_ascii_whitespace().any(|t| t == class) {
        return;
    }
    let kept = current
        .split_ascii_whitespace()
        .filter(|t| *t != class)
        .collect::<Vec<_>>()
        .join(" ");
    set_attr(node, "class", Some(&kept));
}

pub fn collect_text(nodes: &[Node], out: &mut String) {
    for n in nodes {
        match n {
            Node::Text { text, .. } => out.push_str(text),
            Node::Element { children, .. } | Node::Document { children, .. } => {
                collect_text(children, out);
            }
            Node::Comment { .. } => {}
        }
    }
}

/// Concatenated descendant text, like the DOM's `textContent`.
pub fn text_content(node: &Node) -> String {
    match node {
        Node::Text { text, .. } | Node::Comment { text, .. } => text.clone(),
        _ => {
            let mut out = String::new();
            collect_text(node.children(), &mut out);
            out
        }
    }
}

/// Replace every child with one literal text node (no markup interpretation).
pub fn set_text_content(node: &mut Node, text: &str) {
    if let Some(children) = node.children_mut() {
        children.clear();
        if !text.is_empty() {
            children.push(Node::text(text));
        }
    }
}

/// Value of a `data-*` attribute after the usual string normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Bool(bool),
    Number(f64),
    Null,
    String(String),
}

impl DataValue {
    pub fn normalize(raw: &str) -> DataValue {
        match raw {
            "true" => DataValue::Bool(true),
            "false" => DataValue::Bool(false),
            "" | "null" => DataValue::Null,
            _ => match raw.parse::<f64>() {
                Ok(n) if n.is_finite() && n.to_string() == raw => DataValue::Number(n),
                _ => DataValue::String(raw.to_string()),
            },
        }
    }
}

/// Collect `data-bs-*` attributes keyed by the camel-cased remainder
/// (`data-bs-error-message` → `errorMessage`).
pub fn data_attributes(node: &Node) -> BTreeMap<String, DataValue> {
    let mut out = BTreeMap::new();
    let Node::Element { attributes, .. } = node else {
        return out;
    };
    for (k, v) in attributes {
        let Some(rest) = k.strip_prefix("data-bs-") else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let mut key = String::with_capacity(rest.len());
        let mut upper = false;
        for ch in rest.chars() {
            if ch == '-' {
                upper = true;
            } else if upper {
                key.push(ch.to_ascii_uppercase());
                upper = false;
            } else {
                key.push(ch);
            }
        }
        out.insert(key, DataValue::normalize(v.as_deref().unwrap_or("")));
    }
    out
}

/// Assign ids to every node that has none, starting at 1.
pub fn assign_node_ids(root: &mut Node) {
    let mut next = 1;
    assign_ids_from(root, &mut next);
}

/// Assign ids from `*next` upwards to every node that has none.
pub fn assign_ids_from(root: &mut Node, next: &mut u32) {
    fn walk(node: &mut Node, next: &mut u32) {
        if node.id() == Id::UNSET {
            node.set_id(Id(*next));
            *next = next.wrapping_add(1);
        }
        if let Some(children) = node.children_mut() {
            for c in children {
                walk(c, next);
            }
        }
    }
    walk(root, next);
}

pub fn max_node_id(node: &Node) -> u32 {
    node.children()
        .iter()
        .map(max_node_id)
        .fold(node.id().0, u32::max)
}

pub fn find_node_by_id(node: &Node, id: Id) -> Option<&Node> {
    if node.id() == id {
        return Some(node);
    }
    node.children().iter().find_map(|c| find_node_by_id(c, id))
}

pub fn find_node_by_id_mut(node: &mut Node, id: Id) -> Option<&mut Node> {
    if node.id() == id {
        return Some(node);
    }
    node.children_mut()?
        .iter_mut()
        .find_map(|c| find_node_by_id_mut(c, id))
}

/// Detach the node with `id` from its parent and return it.
pub fn remove_node_by_id(root: &mut Node, id: Id) -> Option<Node> {
    let children = root.children_mut()?;
    if let Some(pos) = children.iter().position(|c| c.id() == id) {
        return Some(children.remove(pos));
    }
    children.iter_mut().find_map(|c| remove_node_by_id(c, id))
}

/// Insert `node` as the next sibling of the node with id `anchor`.
/// Gives the node back when the anchor is missing or is the root itself.
pub fn insert_after(root: &mut Node, anchor: Id, node: Node) -> Result<(), Node> {
    fn walk(parent: &mut Node, anchor: Id, node: Node) -> Result<(), Node> {
        let Some(children) = parent.children_mut() else {
            return Err(node);
        };
        if let Some(pos) = children.iter().position(|c| c.id() == anchor) {
            children.insert(pos + 1, node);
            return Ok(());
        }
        let mut node = node;
        for c in children.iter_mut() {
            match walk(c, anchor, node) {
                Ok(()) => return Ok(()),
                Err(back) => node = back,
            }
        }
        Err(node)
    }
    walk(root, anchor, node)
}
