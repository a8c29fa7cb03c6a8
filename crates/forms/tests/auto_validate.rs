use forms::{EventOutcome, FormEvent, FormValidation, Options};
use html::debug::outline_from_dom;
use html::{Selector, find_all, parse_fragment, text_content, to_html};
use html_test_support::{assert_outline_eq, fixture_path, load_manifest};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Case {
    id: String,
    markup: String,
    valid: bool,
    feedback: Vec<String>,
}

fn cases() -> Vec<Case> {
    load_manifest(
        &fixture_path(env!("CARGO_MANIFEST_DIR"), "auto_validate_cases.toml"),
        "auto-validate-v1",
    )
}

fn rendered_feedback(fv: &FormValidation) -> Vec<String> {
    let selector = Selector::parse(".invalid-feedback, .valid-feedback").expect("selector");
    find_all(fv.form(), &selector)
        .into_iter()
        .map(text_content)
        .collect()
}

fn attach(case: &Case) -> FormValidation {
    let form = parse_fragment(&case.markup).remove(0);
    FormValidation::new(form, &Options::new())
        .unwrap_or_else(|err| panic!("case {}: {err}", case.id))
}

#[test]
fn auto_validate_renders_expected_feedback() {
    for case in cases() {
        let mut fv = attach(&case);
        assert_eq!(fv.check_validity(), case.valid, "case {}", case.id);
        fv.auto_validate()
            .unwrap_or_else(|err| panic!("case {}: {err}", case.id));
        assert!(fv.is_validated(), "case {}", case.id);
        assert_eq!(rendered_feedback(&fv), case.feedback, "case {}", case.id);
    }
}

#[test]
fn clear_restores_the_original_markup_except_class() {
    for case in cases() {
        let mut fv = attach(&case);
        let before = to_html(fv.form());
        fv.auto_validate()
            .unwrap_or_else(|err| panic!("case {}: {err}", case.id));
        fv.clear()
            .unwrap_or_else(|err| panic!("case {}: {err}", case.id));
        assert!(!fv.is_validated(), "case {}", case.id);
        let after = to_html(fv.form()).replacen(r#" class="""#, "", 1);
        assert_eq!(after, before, "case {}", case.id);
    }
}

#[test]
fn submit_outcome_tracks_validity() {
    for case in cases() {
        let mut fv = attach(&case);
        let outcome = fv
            .handle_event(FormEvent::Submit)
            .unwrap_or_else(|err| panic!("case {}: {err}", case.id));
        let expected = if case.valid {
            EventOutcome::default()
        } else {
            EventOutcome::cancel()
        };
        assert_eq!(outcome, expected, "case {}", case.id);
    }
}

#[test]
fn tooltip_feedback_lands_right_after_its_control() {
    let form = parse_fragment(r#"<form><input id="name" required><input id="nick" value="ada"></form>"#).remove(0);
    let Some(options) = json!({"type": "tooltip"}).as_object().cloned() else {
        panic!("object literal");
    };
    let mut fv = FormValidation::new(form, &options).expect("form element");
    fv.auto_validate().expect("validate");
    assert_outline_eq(
        "tooltip outline",
        &[
            r#"<form class="was-validated">"#,
            r#"  <input id="name">"#,
            r#"  <div class="invalid-tooltip">"#,
            r#"    "Please fill out this field.""#,
            r#"  <input id="nick">"#,
        ],
        &outline_from_dom(fv.form(), 20),
    );
}
