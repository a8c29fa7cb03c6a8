use crate::messages::Messages;
use html::dom_utils::{assign_ids_from, find_node_by_id, insert_after, remove_node_by_id};
use html::{DataValue, Id, Node, data_attributes};
use template::{AppendTarget, TemplateConfig, TemplateFactory, TemplateResult};

/// Key of the message a control declares for itself through data attributes.
pub const DEFAULT_MESSAGE: &str = "default";

/// How feedback is presented: inline text or a tooltip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeedbackType {
    #[default]
    Feedback,
    Tooltip,
}

impl FeedbackType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "feedback" => Some(FeedbackType::Feedback),
            "tooltip" => Some(FeedbackType::Tooltip),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackType::Feedback => "feedback",
            FeedbackType::Tooltip => "tooltip",
        }
    }
}

fn feedback_template(state: &str, feedback: FeedbackType) -> TemplateConfig {
    TemplateConfig::default().with_template(format!(r#"<div class="{state}-{}"></div>"#, feedback.as_str()))
}

fn data_text(value: &DataValue) -> Option<String> {
    match value {
        DataValue::String(s) => Some(s.clone()),
        DataValue::Number(n) => Some(n.to_string()),
        DataValue::Bool(b) => Some(b.to_string()),
        DataValue::Null => None,
    }
}

/// One form control with its candidate feedback messages and the feedback nodes it
/// has currently placed in the form.
#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    control: Id,
    feedback: FeedbackType,
    errors: Messages,
    successes: Messages,
    appended: Vec<Id>,
}

impl Field {
    /// `data-bs-invalid` / `data-bs-valid` on the control register the default error and
    /// success messages.
    pub fn new(name: impl Into<String>, control: &Node, feedback: FeedbackType) -> TemplateResult<Self> {
        let mut errors = Messages::new(feedback_template("invalid", feedback))?;
        let mut successes = Messages::new(feedback_template("valid", feedback))?;
        let data = data_attributes(control);
        if let Some(message) = data.get("invalid").and_then(data_text) {
            errors.set(DEFAULT_MESSAGE, message)?;
        }
        if let Some(message) = data.get("valid").and_then(data_text) {
            successes.set(DEFAULT_MESSAGE, message)?;
        }
        Ok(Self {
            name: name.into(),
            control: control.id(),
            feedback,
            errors,
            successes,
            appended: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn control_id(&self) -> Id {
        self.control
    }

    pub fn feedback_type(&self) -> FeedbackType {
        self.feedback
    }

    pub fn get_element<'f>(&self, form: &'f Node) -> Option<&'f Node> {
        find_node_by_id(form, self.control)
    }

    pub fn error_messages(&self) -> &Messages {
        &self.errors
    }

    pub fn error_messages_mut(&mut self) -> &mut Messages {
        &mut self.errors
    }

    pub fn success_messages(&self) -> &Messages {
        &self.successes
    }

    pub fn success_messages_mut(&mut self) -> &mut Messages {
        &mut self.successes
    }

    /// Ids of feedback nodes currently placed in the form, oldest first.
    pub fn appended(&self) -> &[Id] {
        &self.appended
    }

    /// Remove every feedback node this field placed. Returns how many were found.
    pub fn clear_appended(&mut self, form: &mut Node) -> usize {
        self.appended
            .drain(..)
            .filter(|id| remove_node_by_id(form, *id).is_some())
            .count()
    }

    /// Hand over the ids of placed feedback nodes, leaving none recorded.
    pub(crate) fn take_appended(&mut self) -> Vec<Id> {
        std::mem::take(&mut self.appended)
    }

    /// Take responsibility for feedback nodes placed by an earlier field of the same control.
    pub(crate) fn adopt_appended(&mut self, ids: Vec<Id>) {
        self.appended.extend(ids);
    }

    pub(crate) fn append_first_success(&mut self, form: &mut Node, next_id: &mut u32) -> TemplateResult<bool> {
        let Some(factory) = self.successes.get_first() else {
            return Ok(false);
        };
        let mut slot = FieldSlot {
            form,
            control: self.control,
            appended: &mut self.appended,
            next_id,
        };
        render_into(factory, &mut slot)
    }

    pub(crate) fn append_error(&mut self, key: &str, form: &mut Node, next_id: &mut u32) -> TemplateResult<bool> {
        let Some(factory) = self.errors.get(key) else {
            return Ok(false);
        };
        let mut slot = FieldSlot {
            form,
            control: self.control,
            appended: &mut self.appended,
            next_id,
        };
        render_into(factory, &mut slot)
    }
}

fn render_into(factory: &TemplateFactory, slot: &mut FieldSlot<'_>) -> TemplateResult<bool> {
    let before = slot.appended.len();
    factory.append(slot)?;
    Ok(slot.appended.len() > before)
}

/// Places rendered feedback right after the control, behind feedback already placed.
pub struct FieldSlot<'a> {
    form: &'a mut Node,
    control: Id,
    appended: &'a mut Vec<Id>,
    next_id: &'a mut u32,
}

impl AppendTarget for FieldSlot<'_> {
    fn append_node(&mut self, mut node: Node) {
        assign_ids_from(&mut node, self.next_id);
        let id = node.id();
        let anchor = self.appended.last().copied().unwrap_or(self.control);
        match insert_after(self.form, anchor, node) {
            Ok(()) => self.appended.push(id),
            Err(_) => log::warn!(target: "forms", "control {:?} is no longer in the form; feedback dropped", self.control),
        }
    }
}
