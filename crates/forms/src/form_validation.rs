use crate::controls::{self, control_key, listed_controls};
use crate::error::{FormError, FormResult};
use crate::events::{EventOutcome, FormEvent};
use crate::field::{FeedbackType, Field};
use crate::validity::{self, flag_message};
use html::dom_utils::{
    add_classes, assign_ids_from, has_class, max_node_id, remove_class, remove_node_by_id, set_attr,
};
use html::select::{find_all_paths, node_at_mut};
use html::{DataValue, Id, Node, Selector, data_attributes};
use serde_json::{Number, Value};
use template::typecheck::{Options, Schema, type_check};
use template::ConfigTypeError;

pub const NAME: &str = "formValidation";
pub const CLASS_VALIDATED: &str = "was-validated";
pub const SELECTOR_DATA_TOGGLE: &str = r#"[data-bs-toggle="form-validation"]"#;

const DEFAULT_TYPE: Schema = &[("type", "string")];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FormValidationConfig {
    pub feedback_type: FeedbackType,
}

impl FormValidationConfig {
    /// Defaults, then the form's `data-bs-*` attributes, then `options`.
    pub fn resolve(form: &Node, options: &Options) -> Result<Self, ConfigTypeError> {
        let mut merged = Options::new();
        merged.insert("type".to_string(), Value::String(FeedbackType::default().as_str().to_string()));
        for (key, value) in data_attributes(form) {
            merged.insert(key, data_value_to_json(value));
        }
        merged.extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
        type_check(NAME, &merged, DEFAULT_TYPE)?;

        let ty = merged.get("type").and_then(Value::as_str).unwrap_or_default();
        let feedback_type = FeedbackType::parse(ty).ok_or_else(|| ConfigTypeError {
            component: NAME.to_string(),
            option: "type".to_string(),
            expected: "(feedback|tooltip)".to_string(),
            found: ty.to_string(),
        })?;
        Ok(Self { feedback_type })
    }
}

/// Key for a control with neither `id` nor `name`.
pub fn anonymous_key(control: Id) -> String {
    format!("control-{}", control.0)
}

fn data_value_to_json(value: DataValue) -> Value {
    match value {
        DataValue::Bool(b) => Value::Bool(b),
        DataValue::Number(n) => Number::from_f64(n).map_or(Value::Null, Value::Number),
        DataValue::Null => Value::Null,
        DataValue::String(s) => Value::String(s),
    }
}

/// Validation state of one form: its fields, their rendered feedback and the
/// form-level validated flag (the `was-validated` class).
#[derive(Debug)]
pub struct FormValidation {
    form: Node,
    config: FormValidationConfig,
    fields: Option<Vec<(String, Field)>>,
    // Feedback placed by fields dropped in `reinitialize`, keyed by control.
    carried: Vec<(Id, Vec<Id>)>,
    next_id: u32,
}

impl FormValidation {
    /// Take ownership of `form`. Nodes without an id get one.
    pub fn new(mut form: Node, options: &Options) -> FormResult<Self> {
        if !form.is_element_named("form") {
            let given = match &form {
                Node::Element { name, .. } => name.to_ascii_uppercase(),
                Node::Document { .. } => "#document".to_string(),
                Node::Text { .. } => "#text".to_string(),
                Node::Comment { .. } => "#comment".to_string(),
            };
            return Err(FormError::TypeMismatch { given });
        }
        let config = FormValidationConfig::resolve(&form, options)?;
        let mut next_id = max_node_id(&form) + 1;
        assign_ids_from(&mut form, &mut next_id);
        log::debug!(target: "forms", "form validation attached ({})", config.feedback_type.as_str());
        Ok(Self {
            form,
            config,
            fields: None,
            carried: Vec::new(),
            next_id,
        })
    }

    pub fn config(&self) -> &FormValidationConfig {
        &self.config
    }

    pub fn form(&self) -> &Node {
        &self.form
    }

    pub fn into_form(self) -> Node {
        self.form
    }

    /// Fields keyed by control id, else name, else [`anonymous_key`], in control order.
    /// Built once and kept until [`FormValidation::reinitialize`].
    pub fn get_fields(&mut self) -> FormResult<&[(String, Field)]> {
        Ok(self.ensure_fields()?.as_slice())
    }

    pub fn get_field(&mut self, key: &str) -> FormResult<Option<&Field>> {
        Ok(self
            .ensure_fields()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, field)| field))
    }

    /// Forget discovered fields; the next access rediscovers them. Feedback already in
    /// the form stays and is owned by the rediscovered field of the same control.
    pub fn reinitialize(&mut self) {
        let Some(fields) = self.fields.take() else {
            return;
        };
        self.carried.extend(
            fields
                .into_iter()
                .map(|(_, mut field)| (field.control_id(), field.take_appended()))
                .filter(|(_, ids)| !ids.is_empty()),
        );
    }

    /// Remove all rendered feedback and drop the validated state.
    pub fn clear(&mut self) -> FormResult<()> {
        self.toggle_validate_class(false);
        self.ensure_fields()?;
        if let Some(fields) = self.fields.as_mut() {
            for (_, field) in fields.iter_mut() {
                field.clear_appended(&mut self.form);
            }
        }
        Ok(())
    }

    pub fn toggle_validate_class(&mut self, add: bool) {
        if add {
            add_classes(&mut self.form, [CLASS_VALIDATED]);
        } else {
            remove_class(&mut self.form, CLASS_VALIDATED);
        }
    }

    pub fn is_validated(&self) -> bool {
        has_class(&self.form, CLASS_VALIDATED)
    }

    pub fn check_validity(&self) -> bool {
        validity::check_validity(&self.form)
    }

    /// Clear, then render feedback for every field unless the whole form is valid.
    /// Either way the form ends up validated.
    pub fn auto_validate(&mut self) -> FormResult<()> {
        self.clear()?;
        if self.check_validity() {
            self.toggle_validate_class(true);
            return Ok(());
        }

        // Validity is computed against the form as it is before any feedback lands.
        let reports: Vec<(Id, validity::Validity, Vec<(&'static str, String)>)> =
            listed_controls(&self.form)
                .iter()
                .map(|control| {
                    let state = validity::validity(&self.form, control);
                    let messages = state
                        .active()
                        .map(|flag| (flag.as_str(), flag_message(control.node, flag)))
                        .collect();
                    (control.node.id(), state, messages)
                })
                .collect();

        let Some(fields) = self.fields.as_mut() else {
            return Ok(());
        };
        for (key, field) in fields.iter_mut() {
            let Some((_, state, messages)) = reports.iter().find(|(id, ..)| *id == field.control_id()) else {
                log::debug!(target: "forms", "field {key} has no control in the form");
                continue;
            };
            if state.valid() {
                field.append_first_success(&mut self.form, &mut self.next_id)?;
                continue;
            }
            if field.error_messages().has(crate::field::DEFAULT_MESSAGE) {
                field.append_error(crate::field::DEFAULT_MESSAGE, &mut self.form, &mut self.next_id)?;
                continue;
            }
            for (flag, message) in messages {
                field.error_messages_mut().set(*flag, message.as_str())?;
                field.append_error(flag, &mut self.form, &mut self.next_id)?;
            }
            log::trace!(target: "forms", "field {key}: {state:?}");
        }

        self.toggle_validate_class(true);
        Ok(())
    }

    /// Handle a submit or reset signal. An invalid submit must be cancelled by the caller.
    pub fn handle_event(&mut self, event: FormEvent) -> FormResult<EventOutcome> {
        match event {
            FormEvent::Submit => {
                let outcome = if self.check_validity() {
                    EventOutcome::default()
                } else {
                    EventOutcome::cancel()
                };
                self.auto_validate()?;
                Ok(outcome)
            }
            FormEvent::Reset => {
                self.clear()?;
                Ok(EventOutcome::default())
            }
        }
    }

    /// Set the value of the control behind field `key`.
    pub fn set_value(&mut self, key: &str, value: &str) -> FormResult<bool> {
        let Some(id) = self.get_field(key)?.map(Field::control_id) else {
            return Ok(false);
        };
        Ok(controls::set_value(&mut self.form, id, value))
    }

    pub fn set_checked(&mut self, key: &str, checked: bool) -> FormResult<bool> {
        let Some(id) = self.get_field(key)?.map(Field::control_id) else {
            return Ok(false);
        };
        Ok(controls::set_checked(&mut self.form, id, checked))
    }

    /// Suppress native validation UI on every opted-in form below `document`.
    pub fn on_ready(document: &mut Node) -> usize {
        let Ok(selector) = Selector::parse(SELECTOR_DATA_TOGGLE) else {
            return 0;
        };
        let mut count = 0;
        if selector.matches(document, &[]) {
            set_attr(document, "novalidate", Some("true"));
            count += 1;
        }
        for path in find_all_paths(document, &selector) {
            if let Some(node) = node_at_mut(document, &path) {
                set_attr(node, "novalidate", Some("true"));
                count += 1;
            }
        }
        count
    }

    fn ensure_fields(&mut self) -> FormResult<&mut Vec<(String, Field)>> {
        if self.fields.is_none() {
            let mut fields = self.discover_fields()?;
            log::debug!(target: "forms", "discovered {} fields", fields.len());
            for (control, ids) in std::mem::take(&mut self.carried) {
                match fields.iter_mut().find(|(_, f)| f.control_id() == control) {
                    Some((_, field)) => field.adopt_appended(ids),
                    None => {
                        // No field will ever clear these again.
                        for id in ids {
                            remove_node_by_id(&mut self.form, id);
                        }
                    }
                }
            }
            self.fields = Some(fields);
        }
        Ok(self.fields.get_or_insert_with(Vec::new))
    }

    fn discover_fields(&self) -> FormResult<Vec<(String, Field)>> {
        let mut fields: Vec<(String, Field)> = Vec::new();
        for control in listed_controls(&self.form) {
            let key = match control_key(control.node) {
                Some(key) => key.to_string(),
                None => anonymous_key(control.node.id()),
            };
            let field = Field::new(key.as_str(), control.node, self.config.feedback_type)?;
            match fields.iter_mut().find(|(k, _)| *k == key) {
                Some((_, existing)) => *existing = field,
                None => fields.push((key, field)),
            }
        }
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Messages;
    use html::{find_all, parse_document, parse_fragment, text_content, to_html};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn options(value: Value) -> Options {
        match value {
            Value::Object(map) => map,
            _ => panic!("options must be an object"),
        }
    }

    fn validation(markup: &str) -> FormValidation {
        let form = parse_fragment(markup).remove(0);
        FormValidation::new(form, &Options::new()).expect("form element")
    }

    fn feedback(fv: &FormValidation) -> Vec<String> {
        let selector = Selector::parse(".invalid-feedback, .valid-feedback, .invalid-tooltip, .valid-tooltip")
            .expect("selector");
        find_all(fv.form(), &selector).into_iter().map(text_content).collect()
    }

    #[test]
    fn rejects_non_form_elements() {
        let err = FormValidation::new(Node::element("div", Vec::new(), Vec::new()), &Options::new())
            .expect_err("div is not a form");
        assert!(matches!(err, FormError::TypeMismatch { ref given } if given == "DIV"));
        assert_eq!(err.to_string(), "Need to be initialized in form elements. \"DIV\" given");
    }

    #[test]
    fn config_merges_defaults_data_attributes_and_options() {
        assert_eq!(validation("<form></form>").config().feedback_type, FeedbackType::Feedback);
        assert_eq!(
            validation(r#"<form data-bs-type="tooltip"></form>"#).config().feedback_type,
            FeedbackType::Tooltip
        );

        let form = parse_fragment(r#"<form data-bs-type="tooltip"></form>"#).remove(0);
        let fv = FormValidation::new(form, &options(json!({"type": "feedback"}))).expect("form");
        assert_eq!(fv.config().feedback_type, FeedbackType::Feedback);

        for bad in [json!({"type": 5}), json!({"type": "popover"})] {
            let form = parse_fragment("<form></form>").remove(0);
            let err = FormValidation::new(form, &options(bad)).expect_err("bad type");
            assert!(matches!(err, FormError::ConfigType(ConfigTypeError { ref option, .. }) if option == "type"));
        }
    }

    #[test]
    fn fields_are_keyed_by_id_then_name() {
        let mut fv = validation(
            r#"<form><input id="a" name="x"><input name="b"><input><input name="b" id=""><button id="go"></button></form>"#,
        );
        let keyless = anonymous_key(fv.form().children()[2].id());
        let keys: Vec<String> = fv.get_fields().expect("fields").iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, ["a".to_string(), "b".to_string(), keyless, "go".to_string()]);

        let last_b = fv.form().children()[3].id();
        assert_eq!(fv.get_field("b").expect("fields").map(Field::control_id), Some(last_b));
        assert!(fv.get_field("missing").expect("fields").is_none());
    }

    #[test]
    fn required_empty_field_renders_error_and_validates() {
        let mut fv = validation(r#"<form><input id="name" required></form>"#);
        assert!(!fv.is_validated());
        fv.auto_validate().expect("validate");
        assert!(fv.is_validated());
        assert_eq!(
            to_html(fv.form()),
            r#"<form class="was-validated"><input id="name" required><div class="invalid-feedback">Please fill out this field.</div></form>"#
        );
        let field = fv.get_field("name").expect("fields").expect("name field");
        assert!(field.error_messages().has("valueMissing"));
    }

    #[test]
    fn filled_field_renders_no_error_and_validates() {
        let mut fv = validation(r#"<form><input id="name" required value="Ada"></form>"#);
        fv.auto_validate().expect("validate");
        assert!(fv.is_validated());
        assert!(feedback(&fv).is_empty());
    }

    #[test]
    fn clear_removes_feedback_and_unvalidates() {
        let mut fv = validation(r#"<form><input id="a" required><input id="b" type="email" value="x"></form>"#);
        fv.auto_validate().expect("validate");
        assert_eq!(feedback(&fv).len(), 2);
        fv.clear().expect("clear");
        assert!(!fv.is_validated());
        assert!(feedback(&fv).is_empty());
        assert_eq!(to_html(fv.form()), r#"<form class=""><input id="a" required><input id="b" type="email" value="x"></form>"#);
    }

    #[test]
    fn validating_twice_does_not_duplicate_feedback() {
        let mut fv = validation(r#"<form><input id="a" required></form>"#);
        fv.auto_validate().expect("validate");
        fv.auto_validate().expect("validate");
        assert_eq!(feedback(&fv), ["Please fill out this field."]);
    }

    #[test]
    fn reinitialized_fields_still_own_rendered_feedback() {
        let mut fv = validation(r#"<form><input id="a" required></form>"#);
        fv.auto_validate().expect("validate");
        fv.reinitialize();
        fv.auto_validate().expect("validate");
        assert_eq!(feedback(&fv), ["Please fill out this field."]);

        fv.reinitialize();
        fv.reinitialize();
        fv.clear().expect("clear");
        assert!(feedback(&fv).is_empty());
    }

    #[test]
    fn keyless_controls_still_get_feedback() {
        let mut fv = validation("<form><input required></form>");
        assert!(!fv.check_validity());
        fv.auto_validate().expect("validate");
        assert_eq!(feedback(&fv), ["Please fill out this field."]);
        fv.clear().expect("clear");
        assert!(feedback(&fv).is_empty());
    }

    #[test]
    fn declared_default_message_wins_over_native_messages() {
        let mut fv = validation(
            r#"<form><input id="a" required maxlength="1" data-bs-invalid="Name is required"></form>"#,
        );
        fv.auto_validate().expect("validate");
        assert_eq!(feedback(&fv), ["Name is required"]);
    }

    #[test]
    fn every_active_violation_renders_its_own_feedback() {
        let mut fv = validation(
            r#"<form><input id="n" type="number" min="10" step="5" value="7" data-bs-custom-error="Taken"></form>"#,
        );
        fv.auto_validate().expect("validate");
        assert_eq!(
            feedback(&fv),
            [
                "Value must be greater than or equal to 10.",
                "Please enter a valid value. The two nearest valid values are 5 and 10.",
                "Taken",
            ]
        );
        let keys: Vec<&str> = fv
            .get_field("n")
            .expect("fields")
            .expect("field")
            .error_messages()
            .keys()
            .collect();
        assert_eq!(keys, ["rangeUnderflow", "stepMismatch", "customError"]);
    }

    #[test]
    fn valid_fields_show_their_first_success_message() {
        let mut fv = validation(
            r#"<form data-bs-type="tooltip"><input id="ok" value="x" data-bs-valid="Looks good"><input id="bad" required></form>"#,
        );
        fv.auto_validate().expect("validate");
        assert_eq!(
            to_html(fv.form()),
            concat!(
                r#"<form data-bs-type="tooltip" class="was-validated">"#,
                r#"<input id="ok" value="x" data-bs-valid="Looks good"><div class="valid-tooltip">Looks good</div>"#,
                r#"<input id="bad" required><div class="invalid-tooltip">Please fill out this field.</div>"#,
                "</form>"
            )
        );
    }

    #[test]
    fn submit_cancels_invalid_forms_and_reset_clears() {
        let mut fv = validation(r#"<form><input id="a" required></form>"#);
        assert_eq!(fv.handle_event(FormEvent::Submit).expect("submit"), EventOutcome::cancel());
        assert!(fv.is_validated());
        assert_eq!(feedback(&fv).len(), 1);

        assert_eq!(fv.handle_event(FormEvent::Reset).expect("reset"), EventOutcome::default());
        assert!(!fv.is_validated());
        assert!(feedback(&fv).is_empty());

        assert!(fv.set_value("a", "filled").expect("fields"));
        assert_eq!(fv.handle_event(FormEvent::Submit).expect("submit"), EventOutcome::default());
        assert!(fv.is_validated());
        assert!(feedback(&fv).is_empty());
    }

    #[test]
    fn set_checked_satisfies_required_checkbox() {
        let mut fv = validation(r#"<form><input type="checkbox" id="terms" required></form>"#);
        assert!(!fv.check_validity());
        assert!(fv.set_checked("terms", true).expect("fields"));
        assert!(fv.check_validity());
        assert!(!fv.set_checked("nope", true).expect("fields"));
    }

    #[test]
    fn reinitialize_rediscovers_fields() {
        let mut fv = validation(r#"<form><input id="a"></form>"#);
        assert_eq!(fv.get_fields().expect("fields").len(), 1);
        fv.reinitialize();
        assert_eq!(fv.get_fields().expect("fields").len(), 1);
    }

    #[test]
    fn on_ready_marks_opted_in_forms_novalidate() {
        let mut doc = parse_document(
            r#"<form data-bs-toggle="form-validation"></form><form></form><div><form data-bs-toggle="form-validation"></form></div>"#,
        );
        assert_eq!(FormValidation::on_ready(&mut doc), 2);
        let marked = Selector::parse("[novalidate]").expect("selector");
        assert_eq!(find_all(&doc, &marked).len(), 2);
    }

    #[test]
    fn messages_type_is_shared_with_fields() {
        let mut fv = validation(r#"<form><input id="a"></form>"#);
        let field = fv.get_field("a").expect("fields").expect("field");
        let _: &Messages = field.success_messages();
        assert_eq!(field.success_messages().count(), 0);
    }
}
