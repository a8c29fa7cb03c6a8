use html::Node;

/// Receives rendered nodes. Implemented by whatever owns the tree the node ends up in.
pub trait AppendTarget {
    fn append_node(&mut self, node: Node);
}

impl AppendTarget for Vec<Node> {
    fn append_node(&mut self, node: Node) {
        self.push(node);
    }
}

/// Appends as the last child. Text and comment nodes cannot take children.
impl AppendTarget for Node {
    fn append_node(&mut self, node: Node) {
        match self.children_mut() {
            Some(children) => children.push(node),
            None => log::debug!(target: "template", "append target has no children; node dropped"),
        }
    }
}
