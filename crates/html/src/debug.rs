use crate::Node;

/// Attributes worth showing in an outline line, in this order.
const OUTLINE_ATTRS: &[&str] = &["id", "name", "type", "class"];

/// Indented one-line-per-node outline of a tree, capped at `cap` lines.
///
/// Used for log output and snapshot-style assertions.
pub fn outline_from_dom(root: &Node, cap: usize) -> Vec<String> {
    const INDENT_STEP: &str = "  ";
    const PREVIEW_CHARS: usize = 40;

    fn push_preview(out: &mut String, s: &str) {
        let mut truncated = false;
        for (i, ch) in s.chars().enumerate() {
            if i == PREVIEW_CHARS {
                truncated = true;
                break;
            }
            out.push(if ch == '\n' { ' ' } else { ch });
        }
        if truncated {
            out.push('…');
        }
    }

    fn walk(node: &Node, depth: usize, out: &mut Vec<String>, left: &mut usize) {
        if *left == 0 {
            return;
        }
        let indent = INDENT_STEP.repeat(depth);
        match node {
            Node::Document { children, .. } => {
                *left -= 1;
                out.push(format!("{indent}#document"));
                for c in children {
                    walk(c, depth + 1, out, left);
                }
            }
            Node::Element { name, children, .. } => {
                *left -= 1;
                let mut line = format!("{indent}<{name}");
                for key in OUTLINE_ATTRS {
                    match node.attr(key) {
                        Some(v) if !v.is_empty() => line.push_str(&format!(r#" {key}="{v}""#)),
                        _ => {}
                    }
                }
                line.push('>');
                out.push(line);
                for c in children {
                    walk(c, depth + 1, out, left);
                }
            }
            Node::Text { text, .. } => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    *left -= 1;
                    let mut line = format!("{indent}\"");
                    push_preview(&mut line, trimmed);
                    line.push('"');
                    out.push(line);
                }
            }
            Node::Comment { text, .. } => {
                *left -= 1;
                let mut line = format!("{indent}<!-- ");
                push_preview(&mut line, text);
                line.push_str(" -->");
                out.push(line);
            }
        }
    }

    let mut out = Vec::new();
    let mut left = cap;
    walk(root, 0, &mut out, &mut left);
    out
}
