//! Listed form controls: discovery, kinds, current values and value mutation.
//!
//! Control state lives in the markup itself: `value`, `checked` and `selected`
//! attributes and textarea text.
use html::dom_utils::{collect_text, find_node_by_id, find_node_by_id_mut, remove_attr, set_attr, set_text_content};
use html::{Id, Node};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputType {
    Text,
    Search,
    Tel,
    Password,
    Email,
    Url,
    Number,
    Range,
    Checkbox,
    Radio,
    File,
    Hidden,
    Submit,
    Reset,
    Button,
    Image,
    Other,
}

impl InputType {
    fn from_attr(ty: Option<&str>) -> InputType {
        let Some(ty) = ty.map(str::trim).filter(|t| !t.is_empty()) else {
            return InputType::Text; // missing type defaults to text
        };
        match ty.to_ascii_lowercase().as_str() {
            "text" => InputType::Text,
            "search" => InputType::Search,
            "tel" => InputType::Tel,
            "password" => InputType::Password,
            "email" => InputType::Email,
            "url" => InputType::Url,
            "number" => InputType::Number,
            "range" => InputType::Range,
            "checkbox" => InputType::Checkbox,
            "radio" => InputType::Radio,
            "file" => InputType::File,
            "hidden" => InputType::Hidden,
            "submit" => InputType::Submit,
            "reset" => InputType::Reset,
            "button" => InputType::Button,
            "image" => InputType::Image,
            "date" | "datetime-local" | "month" | "week" | "time" | "color" => InputType::Other,
            // Unknown types fall back to the text state.
            _ => InputType::Text,
        }
    }

    /// Types whose value is free text: the ones `pattern` and length limits apply to.
    pub fn is_text_like(self) -> bool {
        matches!(
            self,
            InputType::Text
                | InputType::Search
                | InputType::Tel
                | InputType::Password
                | InputType::Email
                | InputType::Url
        )
    }
}

pub fn input_type(node: &Node) -> Option<InputType> {
    node.is_element_named("input")
        .then(|| InputType::from_attr(node.attr("type")))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKind {
    Input(InputType),
    Select,
    Textarea,
    Button,
    Fieldset,
    Output,
    Object,
}

/// Kind of a listed element. `input type=image` is not listed.
pub fn control_kind(node: &Node) -> Option<ControlKind> {
    let kind = match node.tag_name()? {
        "input" => match InputType::from_attr(node.attr("type")) {
            InputType::Image => return None,
            ty => ControlKind::Input(ty),
        },
        "select" => ControlKind::Select,
        "textarea" => ControlKind::Textarea,
        "button" => ControlKind::Button,
        "fieldset" => ControlKind::Fieldset,
        "output" => ControlKind::Output,
        "object" => ControlKind::Object,
        _ => return None,
    };
    Some(kind)
}

#[derive(Clone, Copy, Debug)]
pub struct ListedControl<'a> {
    pub node: &'a Node,
    pub kind: ControlKind,
    /// Inside a `fieldset` carrying `disabled`.
    pub in_disabled_fieldset: bool,
}

/// Listed controls below `form`, in document order.
pub fn listed_controls(form: &Node) -> Vec<ListedControl<'_>> {
    fn walk<'a>(node: &'a Node, in_disabled_fieldset: bool, out: &mut Vec<ListedControl<'a>>) {
        for child in node.children() {
            if let Some(kind) = control_kind(child) {
                out.push(ListedControl {
                    node: child,
                    kind,
                    in_disabled_fieldset,
                });
            }
            let disabled_below = in_disabled_fieldset
                || (child.is_element_named("fieldset") && child.has_attr("disabled"));
            walk(child, disabled_below, out);
        }
    }

    let mut out = Vec::new();
    walk(form, false, &mut out);
    out
}

/// Field key of a control: its `id`, else its `name`.
pub fn control_key(node: &Node) -> Option<&str> {
    ["id", "name"]
        .into_iter()
        .find_map(|a| node.attr(a).filter(|v| !v.is_empty()))
}

pub fn is_checked(node: &Node) -> bool {
    node.has_attr("checked")
}

/// Current value of a control, as constraint validation sees it.
pub fn control_value(node: &Node) -> String {
    match node.tag_name() {
        Some("textarea") => textarea_value(node),
        Some("select") => selected_option(node).map(option_value).unwrap_or_default(),
        _ => node.attr("value").unwrap_or("").to_string(),
    }
}

fn textarea_value(node: &Node) -> String {
    let mut raw = String::new();
    collect_text(node.children(), &mut raw);
    let mut value = normalize_newlines(&raw);
    // A newline right after the start tag is not part of the value.
    if value.starts_with('\n') {
        value.remove(0);
    }
    value
}

fn normalize_newlines(s: &str) -> String {
    if !s.contains('\r') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut it = s.chars().peekable();
    while let Some(ch) = it.next() {
        match ch {
            '\r' => {
                if it.peek() == Some(&'\n') {
                    let _ = it.next();
                }
                out.push('\n');
            }
            _ => out.push(ch),
        }
    }
    out
}

fn options(select: &Node) -> Vec<&Node> {
    let mut out = Vec::new();
    for child in select.children() {
        if child.is_element_named("option") {
            out.push(child);
        } else if child.is_element_named("optgroup") {
            out.extend(child.children().iter().filter(|c| c.is_element_named("option")));
        }
    }
    out
}

fn option_value(option: &Node) -> String {
    match option.attr("value") {
        Some(value) => value.to_string(),
        None => {
            let mut text = String::new();
            collect_text(option.children(), &mut text);
            text.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
        }
    }
}

/// Selected option: the first marked `selected`, else the first enabled option of a
/// single-choice drop-down.
fn selected_option(select: &Node) -> Option<&Node> {
    let options = options(select);
    if let Some(selected) = options.iter().copied().find(|o| o.has_attr("selected")) {
        return Some(selected);
    }
    let drop_down = !select.has_attr("multiple")
        && select
            .attr("size")
            .and_then(|s| s.trim().parse::<u32>().ok())
            .is_none_or(|size| size <= 1);
    if !drop_down {
        return None;
    }
    options.into_iter().find(|o| !o.has_attr("disabled"))
}

/// True when some radio named `name` below `form` is checked.
pub fn radio_group_checked(form: &Node, name: &str) -> bool {
    listed_controls(form).iter().any(|c| {
        c.kind == ControlKind::Input(InputType::Radio)
            && c.node.attr("name") == Some(name)
            && is_checked(c.node)
    })
}

/// Replace the value of control `id`. Returns false when no such element exists.
pub fn set_value(form: &mut Node, id: Id, value: &str) -> bool {
    let Some(node) = find_node_by_id_mut(form, id) else {
        return false;
    };
    match node.tag_name() {
        Some("textarea") => set_text_content(node, value),
        Some("select") => select_option(node, value),
        _ => {
            set_attr(node, "value", Some(value));
        }
    }
    true
}

fn select_option(node: &mut Node, value: &str) {
    fn walk(node: &mut Node, value: &str) {
        let Some(children) = node.children_mut() else {
            return;
        };
        for child in children {
            if child.is_element_named("option") {
                if option_value(child) == value {
                    set_attr(child, "selected", None);
                } else {
                    remove_attr(child, "selected");
                }
            } else if child.is_element_named("optgroup") {
                walk(child, value);
            }
        }
    }
    walk(node, value);
}

/// Check or uncheck control `id`. Checking a named radio unchecks the rest of its group.
pub fn set_checked(form: &mut Node, id: Id, checked: bool) -> bool {
    let Some(target) = find_node_by_id(form, id) else {
        return false;
    };
    let group = (checked && input_type(target) == Some(InputType::Radio))
        .then(|| target.attr("name"))
        .flatten()
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    if let Some(name) = group {
        uncheck_radio_group(form, &name);
    }

    let Some(target) = find_node_by_id_mut(form, id) else {
        return false;
    };
    if checked {
        set_attr(target, "checked", None);
    } else {
        remove_attr(target, "checked");
    }
    true
}

fn uncheck_radio_group(node: &mut Node, name: &str) {
    if input_type(node) == Some(InputType::Radio) && node.attr("name") == Some(name) {
        remove_attr(node, "checked");
    }
    if let Some(children) = node.children_mut() {
        for child in children {
            uncheck_radio_group(child, name);
        }
    }
}
