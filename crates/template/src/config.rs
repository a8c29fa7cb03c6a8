use crate::content::ContentEntry;
use crate::error::{ConfigTypeError, TemplateError};
use crate::factory::TemplateFactory;
use crate::typecheck::{Options, Schema, check_value, type_check, value_type};
use sanitizer::Allowlist;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

pub const NAME: &str = "TemplateFactory";

/// Recognized options and their accepted types.
pub const DEFAULT_TYPE: Schema = &[
    ("extraClass", "(string|function)"),
    ("template", "string"),
    ("content", "object"),
    ("html", "boolean"),
    ("sanitize", "boolean"),
    ("sanitizeFn", "(null|function)"),
    ("allowList", "object"),
];

const CONTENT_ENTRY_TYPE: &str = "(string|element|function|null)";

pub type SanitizeFn = Rc<sanitizer::AttributeFilter>;
pub type ExtraClassFn = Rc<dyn Fn(&TemplateFactory) -> String>;

#[derive(Clone)]
pub enum ExtraClass {
    Static(String),
    Deferred(ExtraClassFn),
}

impl ExtraClass {
    pub fn resolve(&self, factory: &TemplateFactory) -> String {
        match self {
            ExtraClass::Static(class) => class.clone(),
            ExtraClass::Deferred(f) => f(factory),
        }
    }
}

#[derive(Clone)]
pub struct TemplateConfig {
    pub template: String,
    /// Selector → entry, applied in order.
    pub content: Vec<(String, ContentEntry)>,
    pub extra_class: ExtraClass,
    pub html: bool,
    pub sanitize: bool,
    pub sanitize_fn: Option<SanitizeFn>,
    pub allow_list: Allowlist,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            template: "<div></div>".to_string(),
            content: Vec::new(),
            extra_class: ExtraClass::Static(String::new()),
            html: false,
            sanitize: true,
            sanitize_fn: None,
            allow_list: Allowlist::default(),
        }
    }
}

impl TemplateConfig {
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Add or replace the entry for `selector`.
    pub fn with_content(mut self, selector: impl Into<String>, entry: impl Into<ContentEntry>) -> Self {
        set_entry(&mut self.content, selector.into(), entry.into());
        self
    }

    pub fn with_extra_class(mut self, class: impl Into<String>) -> Self {
        self.extra_class = ExtraClass::Static(class.into());
        self
    }

    pub fn with_deferred_extra_class(mut self, f: impl Fn(&TemplateFactory) -> String + 'static) -> Self {
        self.extra_class = ExtraClass::Deferred(Rc::new(f));
        self
    }

    pub fn with_html(mut self, html: bool) -> Self {
        self.html = html;
        self
    }

    pub fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }

    pub fn with_sanitize_fn(mut self, f: impl Fn(&str, &str, &str) -> bool + 'static) -> Self {
        self.sanitize_fn = Some(Rc::new(f));
        self
    }

    pub fn with_allow_list(mut self, allow_list: Allowlist) -> Self {
        self.allow_list = allow_list;
        self
    }

    /// Merge untyped `options` over the defaults after checking every recognized key.
    ///
    /// Unknown keys are ignored. Functions have no JSON form, so `sanitizeFn` can only
    /// be `null` here and `extraClass` only a string.
    pub fn from_options(options: &Options) -> Result<Self, TemplateError> {
        Self::default().merge_options(options)
    }

    pub fn merge_options(mut self, options: &Options) -> Result<Self, TemplateError> {
        type_check(NAME, options, DEFAULT_TYPE)?;

        if let Some(Value::String(template)) = options.get("template") {
            self.template = template.clone();
        }
        if let Some(Value::String(class)) = options.get("extraClass") {
            self.extra_class = ExtraClass::Static(class.clone());
        }
        if let Some(Value::Bool(html)) = options.get("html") {
            self.html = *html;
        }
        if let Some(Value::Bool(sanitize)) = options.get("sanitize") {
            self.sanitize = *sanitize;
        }
        if options.contains_key("sanitizeFn") {
            self.sanitize_fn = None;
        }
        if let Some(Value::Object(content)) = options.get("content") {
            self.content = content_from_options(content)?;
        }
        if let Some(Value::Object(allow_list)) = options.get("allowList") {
            self.allow_list = allow_list_from_options(allow_list)?;
        }
        Ok(self)
    }
}

pub(crate) fn set_entry(content: &mut Vec<(String, ContentEntry)>, selector: String, entry: ContentEntry) {
    match content.iter_mut().find(|(s, _)| *s == selector) {
        Some((_, existing)) => *existing = entry,
        None => content.push((selector, entry)),
    }
}

fn content_from_options(content: &Options) -> Result<Vec<(String, ContentEntry)>, ConfigTypeError> {
    content
        .iter()
        .map(|(selector, value)| {
            check_value(NAME, "entry", value, CONTENT_ENTRY_TYPE)?;
            let entry = match value {
                Value::String(text) => ContentEntry::Text(text.clone()),
                _ => ContentEntry::Empty,
            };
            Ok((selector.clone(), entry))
        })
        .collect()
}

fn allow_list_from_options(map: &Options) -> Result<Allowlist, TemplateError> {
    let mut tags = Vec::with_capacity(map.len());
    for (tag, rules) in map {
        let Value::Array(rules) = rules else {
            return Err(type_error(&format!("allowList.{tag}"), "array", rules).into());
        };
        let rules = rules
            .iter()
            .map(|rule| match rule {
                Value::String(rule) => Ok(rule.clone()),
                other => Err(type_error(&format!("allowList.{tag}[]"), "string", other)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        tags.push((tag.clone(), rules));
    }
    Ok(Allowlist::from_tag_map(tags)?)
}

fn type_error(option: &str, expected: &str, value: &Value) -> ConfigTypeError {
    ConfigTypeError {
        component: NAME.to_string(),
        option: option.to_string(),
        expected: expected.to_string(),
        found: value_type(value).to_string(),
    }
}

impl fmt::Debug for TemplateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateConfig")
            .field("template", &self.template)
            .field("content", &self.content)
            .field("html", &self.html)
            .field("sanitize", &self.sanitize)
            .field("sanitize_fn", &self.sanitize_fn.as_ref().map(|_| ".."))
            .finish_non_exhaustive()
    }
}
