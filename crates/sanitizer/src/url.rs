use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;

/// Attributes whose value is fetched or navigated to.
pub const URI_ATTRIBUTES: &[&str] = &[
    "background",
    "cite",
    "href",
    "itemtype",
    "longdesc",
    "poster",
    "src",
    "xlink:href",
];

// Allowed schemes, or a relative reference: no `:` before the first `/`, `?` or `#`.
const SAFE_URL_PATTERN: &str = r"^(?:(?:https?|mailto|ftp|tel|file|sms):|[^#&/:?]*(?:[#/?]|$))";

// Inline media only, base64 payload.
const DATA_URL_PATTERN: &str = r"^data:(?:image/(?:bmp|gif|jpeg|jpg|png|tiff|webp)|video/(?:mpeg|mp4|ogg|webm)|audio/(?:mp3|oga|ogg|opus));base64,[\d+/a-z]+=*$";

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(err) => {
            log::error!(target: "sanitizer", "url pattern failed to compile: {err}");
            None
        }
    })
    .as_ref()
}

pub fn is_uri_attribute(name: &str) -> bool {
    URI_ATTRIBUTES.iter().any(|a| a.eq_ignore_ascii_case(name))
}

/// True when `value` cannot execute script when followed. Fails closed.
pub fn is_safe_url(value: &str) -> bool {
    static SAFE: OnceLock<Option<Regex>> = OnceLock::new();
    static DATA: OnceLock<Option<Regex>> = OnceLock::new();

    compiled(&SAFE, SAFE_URL_PATTERN).is_some_and(|re| re.is_match(value))
        || compiled(&DATA, DATA_URL_PATTERN).is_some_and(|re| re.is_match(value))
}
