//! Native constraint validation over listed controls.
use crate::controls::{
    ControlKind, InputType, ListedControl, control_value, is_checked, listed_controls,
    radio_group_checked,
};
use html::Node;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// One constraint violation, named as the DOM `ValidityState` names it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flag {
    ValueMissing,
    TypeMismatch,
    PatternMismatch,
    TooLong,
    TooShort,
    RangeUnderflow,
    RangeOverflow,
    StepMismatch,
    BadInput,
    CustomError,
}

impl Flag {
    pub const ALL: [Flag; 10] = [
        Flag::ValueMissing,
        Flag::TypeMismatch,
        Flag::PatternMismatch,
        Flag::TooLong,
        Flag::TooShort,
        Flag::RangeUnderflow,
        Flag::RangeOverflow,
        Flag::StepMismatch,
        Flag::BadInput,
        Flag::CustomError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::ValueMissing => "valueMissing",
            Flag::TypeMismatch => "typeMismatch",
            Flag::PatternMismatch => "patternMismatch",
            Flag::TooLong => "tooLong",
            Flag::TooShort => "tooShort",
            Flag::RangeUnderflow => "rangeUnderflow",
            Flag::RangeOverflow => "rangeOverflow",
            Flag::StepMismatch => "stepMismatch",
            Flag::BadInput => "badInput",
            Flag::CustomError => "customError",
        }
    }

    fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// Set of active violation flags. Empty means valid.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Validity(u16);

impl Validity {
    pub fn valid(self) -> bool {
        self.0 == 0
    }

    pub fn has(self, flag: Flag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn insert(&mut self, flag: Flag) {
        self.0 |= flag.bit();
    }

    /// Active flags in `ValidityState` order.
    pub fn active(self) -> impl Iterator<Item = Flag> {
        Flag::ALL.into_iter().filter(move |f| self.has(*f))
    }
}

impl fmt::Debug for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.active().map(Flag::as_str)).finish()
    }
}

pub const CUSTOM_ERROR_ATTR: &str = "data-bs-custom-error";

/// Controls that never take part in constraint validation.
pub fn is_barred(control: &ListedControl<'_>) -> bool {
    let node = control.node;
    if control.in_disabled_fieldset || node.has_attr("disabled") {
        return true;
    }
    match control.kind {
        ControlKind::Input(ty) => {
            node.has_attr("readonly")
                || matches!(
                    ty,
                    InputType::Hidden
                        | InputType::Submit
                        | InputType::Reset
                        | InputType::Button
                        | InputType::Image
                )
        }
        ControlKind::Textarea => node.has_attr("readonly"),
        ControlKind::Select => false,
        ControlKind::Button | ControlKind::Fieldset | ControlKind::Output | ControlKind::Object => {
            true
        }
    }
}

pub fn validity(form: &Node, control: &ListedControl<'_>) -> Validity {
    let mut out = Validity::default();
    if is_barred(control) {
        return out;
    }
    let node = control.node;
    if node.attr(CUSTOM_ERROR_ATTR).is_some_and(|m| !m.is_empty()) {
        out.insert(Flag::CustomError);
    }

    let value = control_value(node);
    let required = node.has_attr("required");
    match control.kind {
        ControlKind::Input(ty) => input_validity(form, node, ty, &value, required, &mut out),
        ControlKind::Textarea => {
            if required && value.is_empty() {
                out.insert(Flag::ValueMissing);
            }
            length_validity(node, &value, &mut out);
        }
        ControlKind::Select => {
            if required && value.is_empty() {
                out.insert(Flag::ValueMissing);
            }
        }
        ControlKind::Button | ControlKind::Fieldset | ControlKind::Output | ControlKind::Object => {}
    }
    out
}

fn input_validity(
    form: &Node,
    node: &Node,
    ty: InputType,
    value: &str,
    required: bool,
    out: &mut Validity,
) {
    match ty {
        InputType::Checkbox => {
            if required && !is_checked(node) {
                out.insert(Flag::ValueMissing);
            }
        }
        InputType::Radio => {
            let checked = match node.attr("name").filter(|n| !n.is_empty()) {
                Some(name) => radio_group_checked(form, name),
                None => is_checked(node),
            };
            // Any required radio makes the whole group required.
            let group_required = required
                || node.attr("name").filter(|n| !n.is_empty()).is_some_and(|name| {
                    listed_controls(form).iter().any(|c| {
                        c.kind == ControlKind::Input(InputType::Radio)
                            && c.node.attr("name") == Some(name)
                            && c.node.has_attr("required")
                    })
                });
            if group_required && !checked {
                out.insert(Flag::ValueMissing);
            }
        }
        InputType::Number | InputType::Range => {
            if value.is_empty() {
                if required && ty == InputType::Number {
                    out.insert(Flag::ValueMissing);
                }
                return;
            }
            match parse_float(value) {
                Some(number) => range_validity(node, number, out),
                // A range input sanitizes bad values to its default instead.
                None if ty == InputType::Number => out.insert(Flag::BadInput),
                None => {}
            }
        }
        InputType::File => {
            if required {
                out.insert(Flag::ValueMissing);
            }
        }
        ty if ty.is_text_like() => {
            if value.is_empty() {
                if required {
                    out.insert(Flag::ValueMissing);
                }
                return;
            }
            if type_mismatch(node, ty, value) {
                out.insert(Flag::TypeMismatch);
            }
            if pattern_mismatch(node, value) {
                out.insert(Flag::PatternMismatch);
            }
            length_validity(node, value, out);
        }
        _ => {
            if required && value.is_empty() {
                out.insert(Flag::ValueMissing);
            }
        }
    }
}

/// Cached pattern; compile failures are logged and treated as "no match".
fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            log::error!(target: "forms.validity", "built-in pattern failed to compile: {err}");
            None
        }
    })
    .as_ref()
}

fn is_valid_email(value: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    cached(
        &EMAIL,
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .is_some_and(|re| re.is_match(value))
}

fn is_absolute_url(value: &str) -> bool {
    static URL: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&URL, r"^[a-zA-Z][a-zA-Z0-9+.\-]*:\S+$").is_some_and(|re| re.is_match(value))
}

/// HTML "valid floating-point number".
pub fn parse_float(value: &str) -> Option<f64> {
    static FLOAT: OnceLock<Option<Regex>> = OnceLock::new();
    let re = cached(&FLOAT, r"^-?(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][+-]?\d+)?$")?;
    if !re.is_match(value) {
        return None;
    }
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn type_mismatch(node: &Node, ty: InputType, value: &str) -> bool {
    match ty {
        InputType::Email if node.has_attr("multiple") => {
            !value.split(',').map(str::trim).all(is_valid_email)
        }
        InputType::Email => !is_valid_email(value),
        InputType::Url => !is_absolute_url(value),
        _ => false,
    }
}

fn pattern_mismatch(node: &Node, value: &str) -> bool {
    let Some(pattern) = node.attr("pattern") else {
        return false;
    };
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(re) => !re.is_match(value),
        Err(err) => {
            log::warn!(target: "forms.validity", "ignoring invalid pattern '{pattern}': {err}");
            false
        }
    }
}

fn utf16_len(value: &str) -> usize {
    value.encode_utf16().count()
}

fn length_attr(node: &Node, name: &str) -> Option<usize> {
    node.attr(name)?.trim().parse().ok()
}

fn length_validity(node: &Node, value: &str, out: &mut Validity) {
    if value.is_empty() {
        return;
    }
    let len = utf16_len(value);
    if length_attr(node, "maxlength").is_some_and(|max| len > max) {
        out.insert(Flag::TooLong);
    }
    if length_attr(node, "minlength").is_some_and(|min| len < min) {
        out.insert(Flag::TooShort);
    }
}

/// Allowed step and its base, or `None` for `step=any`.
fn step_base(node: &Node) -> Option<(f64, f64)> {
    let step = match node.attr("step").map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("any") => return None,
        Some(s) => parse_float(s).filter(|n| *n > 0.0).unwrap_or(1.0),
        None => 1.0,
    };
    let base = node.attr("min").and_then(parse_float).unwrap_or(0.0);
    Some((step, base))
}

fn range_validity(node: &Node, number: f64, out: &mut Validity) {
    if node.attr("min").and_then(parse_float).is_some_and(|min| number < min) {
        out.insert(Flag::RangeUnderflow);
    }
    if node.attr("max").and_then(parse_float).is_some_and(|max| number > max) {
        out.insert(Flag::RangeOverflow);
    }
    if let Some((step, base)) = step_base(node) {
        let steps = (number - base) / step;
        if (steps - steps.round()).abs() > 1e-9 {
            out.insert(Flag::StepMismatch);
        }
    }
}

/// True when every listed control below `form` satisfies its constraints.
pub fn check_validity(form: &Node) -> bool {
    listed_controls(form)
        .iter()
        .all(|c| validity(form, c).valid())
}

/// Message for the first active flag, as `validationMessage` reports it.
pub fn validation_message(node: &Node, validity: Validity) -> String {
    validity
        .active()
        .next()
        .map(|flag| flag_message(node, flag))
        .unwrap_or_default()
}

/// Browser-style text describing `flag` on `node`.
pub fn flag_message(node: &Node, flag: Flag) -> String {
    let ty = crate::controls::input_type(node);
    match flag {
        Flag::ValueMissing => match (node.tag_name(), ty) {
            (_, Some(InputType::Checkbox)) => "Please check this box if you want to proceed.".into(),
            (_, Some(InputType::Radio)) => "Please select one of these options.".into(),
            (_, Some(InputType::File)) => "Please select a file.".into(),
            (Some("select"), _) => "Please select an item in the list.".into(),
            _ => "Please fill out this field.".into(),
        },
        Flag::TypeMismatch => match ty {
            Some(InputType::Email) => "Please enter an email address.".into(),
            Some(InputType::Url) => "Please enter a URL.".into(),
            _ => "Please enter a valid value.".into(),
        },
        Flag::PatternMismatch => match node.attr("title").filter(|t| !t.is_empty()) {
            Some(title) => format!("Please match the requested format: {title}."),
            None => "Please match the requested format.".into(),
        },
        Flag::TooLong => format!(
            "Please shorten this text to {} characters or less (you are currently using {} characters).",
            length_attr(node, "maxlength").unwrap_or_default(),
            utf16_len(&control_value(node)),
        ),
        Flag::TooShort => format!(
            "Please lengthen this text to {} characters or more (you are currently using {} characters).",
            length_attr(node, "minlength").unwrap_or_default(),
            utf16_len(&control_value(node)),
        ),
        Flag::RangeUnderflow => format!(
            "Value must be greater than or equal to {}.",
            node.attr("min").unwrap_or("").trim()
        ),
        Flag::RangeOverflow => format!(
            "Value must be less than or equal to {}.",
            node.attr("max").unwrap_or("").trim()
        ),
        Flag::StepMismatch => {
            let number = parse_float(&control_value(node));
            match (number, step_base(node)) {
                (Some(number), Some((step, base))) => {
                    let low = base + ((number - base) / step).floor() * step;
                    format!(
                        "Please enter a valid value. The two nearest valid values are {low} and {}.",
                        low + step
                    )
                }
                _ => "Please enter a valid value.".into(),
            }
        }
        Flag::BadInput => "Please enter a number.".into(),
        Flag::CustomError => node.attr(CUSTOM_ERROR_ATTR).unwrap_or("").to_string(),
    }
}
