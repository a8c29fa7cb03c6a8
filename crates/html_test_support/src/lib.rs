//! Shared helpers for formkit tests: TOML case manifests, escaped previews of markup
//! inputs and outline snapshot comparison.

mod manifest;

pub use manifest::{Manifest, fixture_path, load_manifest};

use std::fmt::Write;

/// Lines of context shown on each side of the first differing outline line.
const DIFF_CONTEXT: usize = 2;

/// One-line preview of a markup input for assertion messages.
pub fn escape_text(text: &str) -> String {
    text.chars().fold(String::with_capacity(text.len()), |mut out, ch| {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:02X}}}", c as u32);
            }
            c => out.push(c),
        }
        out
    })
}

/// Describe where two outlines diverge, or `None` when they match.
pub fn outline_diff<E: AsRef<str>>(expected: &[E], actual: &[String]) -> Option<String> {
    let first = (0..expected.len().max(actual.len())).find(|&i| {
        expected.get(i).map(AsRef::as_ref) != actual.get(i).map(String::as_str)
    })?;

    let mut report = format!(
        "outlines differ at line {} (expected {} lines, got {})\n",
        first + 1,
        expected.len(),
        actual.len()
    );
    let from = first.saturating_sub(DIFF_CONTEXT);
    let to = (first + DIFF_CONTEXT + 1).min(expected.len().max(actual.len()));
    for i in from..to {
        let want = expected.get(i).map_or("<none>", AsRef::as_ref);
        let got = actual.get(i).map_or("<none>", String::as_str);
        let mark = if i == first { '>' } else { ' ' };
        let _ = writeln!(report, "{mark} {:>3} - {want}", i + 1);
        let _ = writeln!(report, "{mark} {:>3} + {got}", i + 1);
    }
    Some(report)
}

/// Assert an outline (see `html::debug::outline_from_dom`) matches line for line.
pub fn assert_outline_eq<E: AsRef<str>>(context: &str, expected: &[E], actual: &[String]) {
    if let Some(report) = outline_diff(expected, actual) {
        panic!("{context}: {report}");
    }
}
