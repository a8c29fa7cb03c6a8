//! Minimal CSS selector engine over [`Node`] trees.
//!
//! Supported grammar:
//! - type selectors and `*`
//! - `#id`, `.class`
//! - `[attr]`, `[attr=v]`, `[attr~=v]`, `[attr^=v]`, `[attr$=v]`, `[attr*=v]`, `[attr|=v]`
//!   (values bare or quoted)
//! - descendant (whitespace) and child (`>`) combinators
//! - selector lists (`a, b`)
//!
//! Matching runs against the subtree of a scope node; the scope itself is never returned
//! but takes part in combinator matching as an ancestor.
use crate::types::Node;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected {found:?} at offset {offset} in selector '{selector}'")]
    Unexpected {
        selector: String,
        offset: usize,
        found: char,
    },
    #[error("unterminated attribute selector in '{selector}'")]
    Unterminated { selector: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
    DashMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrSelector {
    fn matches(&self, node: &Node) -> bool {
        let Some(actual) = node.attr(&self.name) else {
            return false;
        };
        let v = self.value.as_str();
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == v,
            AttrOp::Includes => actual.split_ascii_whitespace().any(|t| t == v),
            AttrOp::Prefix => !v.is_empty() && actual.starts_with(v),
            AttrOp::Suffix => !v.is_empty() && actual.ends_with(v),
            AttrOp::Substring => !v.is_empty() && actual.contains(v),
            AttrOp::DashMatch => {
                actual == v || actual.strip_prefix(v).is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.ids.is_empty() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, node: &Node) -> bool {
        let Some(name) = node.tag_name() else {
            return false;
        };
        if let Some(tag) = &self.tag
            && tag != "*"
            && !tag.eq_ignore_ascii_case(name)
        {
            return false;
        }
        if !self.ids.iter().all(|id| node.attr("id") == Some(id.as_str())) {
            return false;
        }
        if !self.classes.is_empty() {
            let class = node.attr("class").unwrap_or("");
            if !self
                .classes
                .iter()
                .all(|c| class.split_ascii_whitespace().any(|t| t == c))
            {
                return false;
            }
        }
        self.attrs.iter().all(|a| a.matches(node))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// One complex selector, stored right-to-left: `parts[0]` is the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    subject: Compound,
    rest: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches(&self, node: &Node, ancestors: &[&Node]) -> bool {
        self.subject.matches(node) && match_rest(&self.rest, ancestors)
    }
}

fn match_rest(rest: &[(Combinator, Compound)], ancestors: &[&Node]) -> bool {
    let Some(((combinator, compound), remaining)) = rest.split_first() else {
        return true;
    };
    match combinator {
        Combinator::Child => {
            let Some((parent, above)) = ancestors.split_last() else {
                return false;
            };
            compound.matches(parent) && match_rest(remaining, above)
        }
        Combinator::Descendant => (0..ancestors.len()).rev().any(|i| {
            compound.matches(ancestors[i]) && match_rest(remaining, &ancestors[..i])
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(selector: &str) -> Result<Selector, SelectorError> {
        Parser::new(selector).parse()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// `ancestors` lists the node's ancestors from the outermost down to its parent.
    pub fn matches(&self, node: &Node, ancestors: &[&Node]) -> bool {
        self.alternatives.iter().any(|c| c.matches(node, ancestors))
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == ':' || !c.is_ascii()
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn unexpected(&self) -> SelectorError {
        match self.chars.get(self.pos) {
            Some(&(offset, found)) => SelectorError::Unexpected {
                selector: self.source.to_string(),
                offset,
                found,
            },
            None => SelectorError::Empty,
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            out.push(c);
            self.pos += 1;
        }
        out
    }

    fn parse(mut self) -> Result<Selector, SelectorError> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_whitespace();
            alternatives.push(self.complex()?);
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(',') => self.pos += 1,
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(Selector {
            source: self.source.to_string(),
            alternatives,
        })
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        let mut parts = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(',') | None => break,
                Some(_) if had_space => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            combinators.push(combinator);
            parts.push(self.compound()?);
        }

        let subject = parts.pop().ok_or(SelectorError::Empty)?;
        let mut rest = Vec::with_capacity(parts.len());
        while let Some(compound) = parts.pop() {
            let combinator = combinators.pop().unwrap_or(Combinator::Descendant);
            rest.push((combinator, compound));
        }
        Ok(Complex { subject, rest })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        if self.peek() == Some('*') {
            self.pos += 1;
            compound.tag = Some("*".to_string());
        } else {
            let tag = self.ident();
            if !tag.is_empty() {
                compound.tag = Some(tag.to_ascii_lowercase());
            }
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    let id = self.ident();
                    if id.is_empty() {
                        return Err(self.unexpected());
                    }
                    compound.ids.push(id);
                }
                Some('.') => {
                    self.pos += 1;
                    let class = self.ident();
                    if class.is_empty() {
                        return Err(self.unexpected());
                    }
                    compound.classes.push(class);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.attribute()?);
                }
                _ => break,
            }
        }

        if compound.is_empty() {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> Result<AttrSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.ident().to_ascii_lowercase();
        if name.is_empty() {
            return Err(self.unexpected());
        }
        self.skip_whitespace();
        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttrSelector {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                });
            }
            Some('=') => AttrOp::Equals,
            Some('~') => AttrOp::Includes,
            Some('^') => AttrOp::Prefix,
            Some('$') => AttrOp::Suffix,
            Some('*') => AttrOp::Substring,
            Some('|') => AttrOp::DashMatch,
            None => {
                return Err(SelectorError::Unterminated {
                    selector: self.source.to_string(),
                });
            }
            Some(_) => return Err(self.unexpected()),
        };
        self.pos += 1;
        if op != AttrOp::Equals {
            if self.peek() != Some('=') {
                return Err(self.unexpected());
            }
            self.pos += 1;
        }
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        Some(c) if c == quote => {
                            self.pos += 1;
                            break;
                        }
                        Some(c) => {
                            value.push(c);
                            self.pos += 1;
                        }
                        None => {
                            return Err(SelectorError::Unterminated {
                                selector: self.source.to_string(),
                            });
                        }
                    }
                }
                value
            }
            _ => self.ident(),
        };

        self.skip_whitespace();
        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(AttrSelector { name, op, value })
            }
            None => Err(SelectorError::Unterminated {
                selector: self.source.to_string(),
            }),
            Some(_) => Err(self.unexpected()),
        }
    }
}

/// Child-index path from a scope node to one of its descendants.
pub type NodePath = Vec<usize>;

/// Visit every element strictly below `scope` in document order until `visit` returns true.
fn walk_until<'a>(
    scope: &'a Node,
    visit: &mut dyn FnMut(&'a Node, &[&'a Node], &NodePath) -> bool,
) {
    fn walk<'a>(
        node: &'a Node,
        ancestors: &mut Vec<&'a Node>,
        path: &mut NodePath,
        visit: &mut dyn FnMut(&'a Node, &[&'a Node], &NodePath) -> bool,
    ) -> bool {
        ancestors.push(node);
        for (i, child) in node.children().iter().enumerate() {
            if !matches!(child, Node::Element { .. }) {
                continue;
            }
            path.push(i);
            if visit(child, ancestors, path) || walk(child, ancestors, path, visit) {
                return true;
            }
            path.pop();
        }
        ancestors.pop();
        false
    }

    let mut ancestors = Vec::new();
    let mut path = Vec::new();
    walk(scope, &mut ancestors, &mut path, visit);
}

/// First descendant of `scope` matching `selector`, in document order.
pub fn find_one<'a>(scope: &'a Node, selector: &Selector) -> Option<&'a Node> {
    let mut found = None;
    walk_until(scope, &mut |node, ancestors, _| {
        if selector.matches(node, ancestors) {
            found = Some(node);
            return true;
        }
        false
    });
    found
}

/// Path of the first descendant of `scope` matching `selector`.
pub fn find_one_path(scope: &Node, selector: &Selector) -> Option<NodePath> {
    let mut found = None;
    walk_until(scope, &mut |node, ancestors, path| {
        if selector.matches(node, ancestors) {
            found = Some(path.clone());
            return true;
        }
        false
    });
    found
}

/// Every descendant of `scope` matching `selector`, in document order.
pub fn find_all<'a>(scope: &'a Node, selector: &Selector) -> Vec<&'a Node> {
    let mut out = Vec::new();
    walk_until(scope, &mut |node, ancestors, _| {
        if selector.matches(node, ancestors) {
            out.push(node);
        }
        false
    });
    out
}

/// Paths of every descendant of `scope` matching `selector`, in document order.
pub fn find_all_paths(scope: &Node, selector: &Selector) -> Vec<NodePath> {
    let mut out = Vec::new();
    walk_until(scope, &mut |node, ancestors, path| {
        if selector.matches(node, ancestors) {
            out.push(path.clone());
        }
        false
    });
    out
}

pub fn node_at<'a>(scope: &'a Node, path: &[usize]) -> Option<&'a Node> {
    path.iter()
        .try_fold(scope, |node, &i| node.children().get(i))
}

pub fn node_at_mut<'a>(scope: &'a mut Node, path: &[usize]) -> Option<&'a mut Node> {
    path.iter()
        .try_fold(scope, |node, &i| node.children_mut()?.get_mut(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_fragment;

    fn scope(markup: &str) -> Node {
        Node::element("div", Vec::new(), parse_fragment(markup))
    }

    fn first_id<'a>(root: &'a Node, selector: &str) -> Option<&'a str> {
        let selector = Selector::parse(selector).expect("valid selector");
        find_one(root, &selector).and_then(|n| n.attr("id"))
    }

    #[test]
    fn matches_type_class_id_and_attributes() {
        let root = scope(
            r#"<p id="a" class="x y"></p><span id="b" data-k="v-1" lang="en-US"></span>"#,
        );
        assert_eq!(first_id(&root, "p"), Some("a"));
        assert_eq!(first_id(&root, ".y.x"), Some("a"));
        assert_eq!(first_id(&root, "#b"), Some("b"));
        assert_eq!(first_id(&root, "[data-k]"), Some("b"));
        assert_eq!(first_id(&root, "[data-k='v-1']"), Some("b"));
        assert_eq!(first_id(&root, "[data-k^=v]"), Some("b"));
        assert_eq!(first_id(&root, "[lang|=en]"), Some("b"));
        assert_eq!(first_id(&root, "[class~=y]"), Some("a"));
        assert_eq!(first_id(&root, "p.z"), None);
    }

    #[test]
    fn matches_descendant_and_child_combinators() {
        let root = scope(r#"<ul id="l"><li id="i1"><b id="deep"></b></li></ul><b id="top"></b>"#);
        assert_eq!(first_id(&root, "ul b"), Some("deep"));
        assert_eq!(first_id(&root, "ul > b"), None);
        assert_eq!(first_id(&root, "li > b"), Some("deep"));
        assert_eq!(first_id(&root, "div > b"), Some("top"));
    }

    #[test]
    fn first_match_is_in_document_order() {
        let root = scope(r#"<div id="outer"><div id="inner"></div></div>"#);
        assert_eq!(first_id(&root, "div"), Some("outer"));
        let selector = Selector::parse("div").expect("valid selector");
        let ids: Vec<_> = find_all(&root, &selector)
            .into_iter()
            .filter_map(|n| n.attr("id"))
            .collect();
        assert_eq!(ids, ["outer", "inner"]);
    }

    #[test]
    fn selector_lists_match_any_alternative() {
        let root = scope(r#"<i id="a"></i><b id="b"></b>"#);
        assert_eq!(first_id(&root, "b, i"), Some("a"));
    }

    #[test]
    fn paths_address_matches_mutably() {
        let mut root = scope(r#"<p>x</p><p><span class="t"></span></p>"#);
        let selector = Selector::parse(".t").expect("valid selector");
        let path = find_one_path(&root, &selector).expect("match");
        assert_eq!(path, vec![1, 0]);
        let target = node_at_mut(&mut root, &path).expect("node");
        target.children_mut().expect("element").push(Node::text("hi"));
        assert_eq!(node_at(&root, &path).map(|n| n.children().len()), Some(1));
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert!(matches!(
            Selector::parse("div >"),
            Err(SelectorError::Empty)
        ));
        assert!(matches!(
            Selector::parse("a[href"),
            Err(SelectorError::Unterminated { .. })
        ));
        assert!(matches!(
            Selector::parse("p!"),
            Err(SelectorError::Unexpected { found: '!', .. })
        ));
    }
}
