use crate::allowlist::Allowlist;
use crate::url::{is_safe_url, is_uri_attribute};
use html::{Node, parse_fragment, serialize_children};

/// Per-attribute override: `(tag, attribute, value) -> keep`.
///
/// When supplied it replaces both the allowlist attribute lookup and the URL check.
/// It never admits a tag the allowlist does not list.
pub type AttributeFilter = dyn Fn(&str, &str, &str) -> bool;

/// Sanitize `markup` and serialize the result. Never fails; disallowed content is
/// omitted.
pub fn sanitize(markup: &str, allowlist: &Allowlist, filter: Option<&AttributeFilter>) -> String {
    if markup.is_empty() {
        return String::new();
    }
    serialize_children(&sanitize_fragment(markup, allowlist, filter), false)
}

/// Sanitize `markup` into detached nodes.
pub fn sanitize_fragment(
    markup: &str,
    allowlist: &Allowlist,
    filter: Option<&AttributeFilter>,
) -> Vec<Node> {
    let cleaner = Cleaner { allowlist, filter };
    parse_fragment(markup)
        .into_iter()
        .filter_map(|n| cleaner.clean(n))
        .collect()
}

struct Cleaner<'a> {
    allowlist: &'a Allowlist,
    filter: Option<&'a AttributeFilter>,
}

impl Cleaner<'_> {
    /// Rebuild `node` bottom-up. Each child list is consumed and a fresh one collected,
    /// so no list is mutated while it is being walked.
    fn clean(&self, node: Node) -> Option<Node> {
        match node {
            Node::Text { .. } => Some(node),
            Node::Comment { .. } | Node::Document { .. } => None,
            Node::Element {
                id,
                name,
                attributes,
                children,
            } => {
                if !self.allowlist.allows_tag(&name) {
                    log::debug!(target: "sanitizer", "dropping <{name}> and its contents");
                    return None;
                }
                let attributes = attributes
                    .into_iter()
                    .filter(|(attr, value)| self.keep_attribute(&name, attr, value.as_deref()))
                    .collect();
                let children = children.into_iter().filter_map(|c| self.clean(c)).collect();
                Some(Node::Element {
                    id,
                    name,
                    attributes,
                    children,
                })
            }
        }
    }

    fn keep_attribute(&self, tag: &str, attr: &str, value: Option<&str>) -> bool {
        let value = value.unwrap_or("");
        let keep = match self.filter {
            Some(filter) => filter(tag, attr, value),
            None => {
                self.allowlist.allows_attr(tag, attr)
                    && (!is_uri_attribute(attr) || is_safe_url(value))
            }
        };
        if !keep {
            log::debug!(target: "sanitizer", "dropping attribute {attr} on <{tag}>");
        }
        keep
    }
}
