//! Runtime type checks for the untyped option surface.
//!
//! A schema maps an option name to a pipe-delimited set of type names, optionally
//! parenthesized: `"(string|function)"`. Keys missing from the schema pass through.
use crate::error::ConfigTypeError;
use serde_json::{Map, Value};

/// Untyped options, as they arrive from data attributes or a JSON document.
pub type Options = Map<String, Value>;

pub type Schema = &'static [(&'static str, &'static str)];

/// The type name an option value reports, in the vocabulary schemas use.
pub fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// True when `found` is one of the alternatives in `expected`.
pub fn type_matches(expected: &str, found: &str) -> bool {
    expected
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split('|')
        .any(|t| t.trim() == found)
}

pub fn type_check(component: &str, options: &Options, schema: Schema) -> Result<(), ConfigTypeError> {
    for (option, expected) in schema {
        let Some(value) = options.get(*option) else {
            continue;
        };
        check_value(component, option, value, expected)?;
    }
    Ok(())
}

pub fn check_value(
    component: &str,
    option: &str,
    value: &Value,
    expected: &str,
) -> Result<(), ConfigTypeError> {
    let found = value_type(value);
    if type_matches(expected, found) {
        return Ok(());
    }
    Err(ConfigTypeError {
        component: component.to_string(),
        option: option.to_string(),
        expected: expected.to_string(),
        found: found.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: Schema = &[("html", "boolean"), ("extraClass", "(string|function)")];

    fn options(value: Value) -> Options {
        match value {
            Value::Object(map) => map,
            _ => panic!("options must be an object"),
        }
    }

    #[test]
    fn accepts_matching_and_unknown_options() {
        let opts = options(json!({"html": true, "extraClass": "a", "whatever": 3}));
        assert_eq!(type_check("TemplateFactory", &opts, SCHEMA), Ok(()));
    }

    #[test]
    fn rejects_mismatched_option_with_names() {
        let opts = options(json!({"html": "yes"}));
        let err = type_check("TemplateFactory", &opts, SCHEMA).expect_err("type mismatch");
        assert_eq!(err.option, "html");
        assert_eq!(err.found, "string");
        assert_eq!(
            err.to_string(),
            "TEMPLATEFACTORY: Option \"html\" provided type \"string\" but expected type \"boolean\"."
        );
    }

    #[test]
    fn union_types_accept_any_alternative() {
        assert!(type_matches("(string|function)", "string"));
        assert!(type_matches("(null|function)", "null"));
        assert!(!type_matches("(null|function)", "object"));
    }
}
