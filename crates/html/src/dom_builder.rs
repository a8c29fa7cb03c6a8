use crate::tokenizer::tokenize;
use crate::types::{Id, Node, Token};

/// Parse a markup fragment into a list of detached top-level nodes.
///
/// The builder is lenient: unmatched end tags are ignored, unclosed elements are closed at
/// the end of input. It never fails.
pub fn parse_fragment(input: &str) -> Vec<Node> {
    build_fragment(&tokenize(input))
}

/// Parse a markup fragment and wrap it in a `Document` node with ids assigned.
pub fn parse_document(input: &str) -> Node {
    let tokens = tokenize(input);
    let doctype = tokens.iter().find_map(|t| match t {
        Token::Doctype(s) => Some(s.clone()),
        _ => None,
    });
    let mut doc = Node::Document {
        id: Id::UNSET,
        doctype,
        children: build_fragment(&tokens),
    };
    crate::dom_utils::assign_node_ids(&mut doc);
    doc
}

// Elements that close an open sibling of the same name when they start again.
fn closes_same_name(name: &str) -> bool {
    matches!(name, "p" | "li" | "option" | "dt" | "dd" | "tr" | "td" | "th")
}

pub fn build_fragment(tokens: &[Token]) -> Vec<Node> {
    let mut arena = NodeArena::new();
    let root_index = arena.push(ArenaNode::Root {
        children: Vec::new(),
    });

    let mut open_elements: Vec<usize> = Vec::new();

    for token in tokens {
        match token {
            Token::Doctype(_) => {}
            Token::Comment(c) => {
                let parent_index = open_elements.last().copied().unwrap_or(root_index);
                arena.add_child(parent_index, ArenaNode::Comment { text: c.clone() });
            }
            Token::Text(txt) => {
                if !txt.is_empty() {
                    let parent_index = open_elements.last().copied().unwrap_or(root_index);
                    arena.add_child(parent_index, ArenaNode::Text { text: txt.clone() });
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                if closes_same_name(name)
                    && let Some(&current) = open_elements.last()
                    && arena.is_element_named(current, name)
                {
                    open_elements.pop();
                }
                let parent_index = open_elements.last().copied().unwrap_or(root_index);
                let new_index = arena.add_child(
                    parent_index,
                    ArenaNode::Element {
                        name: name.clone(),
                        attributes: attributes.clone(),
                        children: Vec::new(),
                    },
                );

                if !*self_closing {
                    open_elements.push(new_index);
                }
            }
            Token::EndTag(name) => {
                // Only unwind when the element is actually open; stray end tags are dropped.
                if let Some(pos) = open_elements
                    .iter()
                    .rposition(|&open_index| arena.is_element_named(open_index, name))
                {
                    open_elements.truncate(pos);
                }
            }
        }
    }

    arena.into_fragment(root_index)
}

#[derive(Debug)]
enum ArenaNode {
    Root {
        children: Vec<usize>,
    },
    Element {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        children: Vec<usize>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

impl ArenaNode {
    fn children(&self) -> Option<&[usize]> {
        match self {
            ArenaNode::Root { children } | ArenaNode::Element { children, .. } => Some(children),
            ArenaNode::Text { .. } | ArenaNode::Comment { .. } => None,
        }
    }
}

#[derive(Debug)]
struct NodeArena {
    nodes: Vec<ArenaNode>,
}

impl NodeArena {
    fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    fn push(&mut self, node: ArenaNode) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        index
    }

    fn add_child(&mut self, parent_index: usize, child: ArenaNode) -> usize {
        let child_index = self.push(child);
        match &mut self.nodes[parent_index] {
            ArenaNode::Root { children } | ArenaNode::Element { children, .. } => {
                children.push(child_index);
            }
            _ => unreachable!("dom builder parent cannot have children"),
        }
        child_index
    }

    fn is_element_named(&self, node_index: usize, target: &str) -> bool {
        match &self.nodes[node_index] {
            ArenaNode::Element { name, .. } => name.eq_ignore_ascii_case(target),
            _ => false,
        }
    }

    fn into_fragment(self, root_index: usize) -> Vec<Node> {
        let mut nodes = self.nodes;
        let mut built_nodes: Vec<Node> = Vec::with_capacity(nodes.len());

        fn take_children(n: usize, built: &mut Vec<Node>) -> Vec<Node> {
            let children = built.split_off(built.len() - n);
            debug_assert_eq!(children.len(), n);
            children
        }

        // Iterative postorder: when a node is popped the second time, its direct children
        // are the last `child_count` entries of `built_nodes`, in original order. Deep
        // nesting therefore never recurses.
        let mut stack: Vec<(usize, bool)> = vec![(root_index, false)];
        let mut fragment = Vec::new();

        while let Some((node_index, visited)) = stack.pop() {
            if !visited {
                stack.push((node_index, true));
                if let Some(children) = nodes[node_index].children() {
                    for &child_index in children.iter().rev() {
                        stack.push((child_index, false));
                    }
                }
                continue;
            }

            let node = match &mut nodes[node_index] {
                ArenaNode::Root { children } => {
                    fragment = take_children(children.len(), &mut built_nodes);
                    continue;
                }
                ArenaNode::Element {
                    name,
                    attributes,
                    children,
                } => Node::Element {
                    id: Id::UNSET,
                    name: std::mem::take(name),
                    attributes: std::mem::take(attributes),
                    children: take_children(children.len(), &mut built_nodes),
                },
                ArenaNode::Text { text } => Node::Text {
                    id: Id::UNSET,
                    text: std::mem::take(text),
                },
                ArenaNode::Comment { text } => Node::Comment {
                    id: Id::UNSET,
                    text: std::mem::take(text),
                },
            };

            built_nodes.push(node);
        }

        debug_assert!(built_nodes.is_empty());
        fragment
    }
}
