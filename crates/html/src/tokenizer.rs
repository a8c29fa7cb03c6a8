//! Fragment tokenizer with a constrained, practical tag-name character set.
//!
//! Supported tag-name characters (ASCII only): `[A-Za-z0-9:_-]`.
//! Attribute names use the same class. Tag and attribute names are lower-cased.
//!
//! Known limitations:
//! - Not the HTML5 state machine; recovery is lenient rather than standards-exact.
//! - Raw-text close-tag scanning accepts only ASCII whitespace before `>`.
use crate::entities::decode_entities;
use crate::types::Token;
use memchr::memchr;

const HTML_COMMENT_START: &str = "<!--";
const HTML_COMMENT_END: &str = "-->";

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack.len() >= start + needle.len()
        && haystack[start..start + needle.len()].eq_ignore_ascii_case(needle)
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_' || c == b':'
}

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose body is scanned verbatim up to the matching close tag.
/// The flag says whether entities are decoded inside (RCDATA) or not (RAWTEXT).
pub(crate) fn text_only_element(name: &str) -> Option<bool> {
    match name {
        "script" | "style" => Some(false),
        "textarea" | "title" => Some(true),
        _ => None,
    }
}

/// Returns `(start, end)` of `</name\s*>` inside `haystack`, case-insensitive.
// It only attempts matches starting at ASCII `<`, which never occurs inside a UTF-8
// continuation byte.
fn find_close_tag(haystack: &str, name: &str) -> Option<(usize, usize)> {
    let hay = haystack.as_bytes();
    let name = name.as_bytes();
    let n = name.len() + 2;
    let mut i = 0;
    while i + n <= hay.len() {
        i += memchr(b'<', &hay[i..])?;
        if i + n > hay.len() {
            return None;
        }
        if hay[i + 1] == b'/' && starts_with_ignore_ascii_case_at(hay, i + 2, name) {
            let mut k = i + n;
            while k < hay.len() && hay[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < hay.len() && hay[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

/// Tokenize a markup fragment. Never fails: malformed input degrades to text.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = 0;
    // Slices are only cut at ASCII structural bytes, so every endpoint is a char boundary.
    while i < len {
        if bytes[i] != b'<' {
            let start = i;
            i = memchr(b'<', &bytes[i..]).map_or(len, |rel| i + rel);
            push_text(&mut out, decode_entities(&input[start..i]));
            continue;
        }

        if input[i..].starts_with(HTML_COMMENT_START) {
            let body_start = i + HTML_COMMENT_START.len();
            match input[body_start..].find(HTML_COMMENT_END) {
                Some(end) => {
                    out.push(Token::Comment(input[body_start..body_start + end].to_string()));
                    i = body_start + end + HTML_COMMENT_END.len();
                    continue;
                }
                None => {
                    out.push(Token::Comment(input[body_start..].to_string()));
                    break;
                }
            }
        }

        if starts_with_ignore_ascii_case_at(bytes, i, b"<!doctype") {
            let rest = &input[i + 2..];
            match rest.find('>') {
                Some(end) => {
                    out.push(Token::Doctype(rest[..end].trim().to_string()));
                    i += 2 + end + 1;
                    continue;
                }
                None => break,
            }
        }

        // A `<` that does not open a tag is literal text.
        let next = bytes.get(i + 1).copied();
        let opens_end_tag = next == Some(b'/') && bytes.get(i + 2).is_some_and(|b| b.is_ascii_alphabetic());
        let opens_start_tag = next.is_some_and(|b| b.is_ascii_alphabetic());
        if !opens_end_tag && !opens_start_tag {
            push_text(&mut out, "<".to_string());
            i += 1;
            continue;
        }

        if opens_end_tag {
            let start = i + 2;
            let mut j = start;
            while j < len && is_name_char(bytes[j]) {
                j += 1;
            }
            let name = input[start..j].to_ascii_lowercase();
            j = memchr(b'>', &bytes[j..]).map_or(len, |rel| j + rel + 1);
            out.push(Token::EndTag(name));
            i = j;
            continue;
        }

        let start = i + 1;
        let mut k = start;
        while k < len && is_name_char(bytes[k]) {
            k += 1;
        }
        let name = input[start..k].to_ascii_lowercase();
        let (attributes, self_closing, content_start) = scan_attributes(input, k);
        let self_closing = self_closing || is_void_element(&name);

        if !self_closing && let Some(decode) = text_only_element(&name) {
            out.push(Token::StartTag {
                name: name.clone(),
                attributes,
                self_closing,
            });
            let body = &input[content_start..];
            // A missing close tag takes the rest of the input as the element body.
            let (raw, resume) = match find_close_tag(body, &name) {
                Some((rel_start, rel_end)) => (&body[..rel_start], content_start + rel_end),
                None => (body, len),
            };
            if !raw.is_empty() {
                let text = if decode {
                    decode_entities(raw)
                } else {
                    raw.to_string()
                };
                out.push(Token::Text(text));
            }
            out.push(Token::EndTag(name));
            i = resume;
            continue;
        }

        out.push(Token::StartTag {
            name,
            attributes,
            self_closing,
        });
        i = content_start;
    }
    log::trace!(target: "html.tokenizer", "tokenized {} bytes into {} tokens", len, out.len());
    out
}

fn push_text(out: &mut Vec<Token>, text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Text(prev)) = out.last_mut() {
        prev.push_str(&text);
        return;
    }
    out.push(Token::Text(text));
}

type Attributes = Vec<(String, Option<String>)>;

/// Scan attributes starting right after the tag name. Returns the attributes, the
/// self-closing flag and the index just past the closing `>`.
fn scan_attributes(input: &str, mut k: usize) -> (Attributes, bool, usize) {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut attributes: Attributes = Vec::new();
    let mut self_closing = false;

    let skip_whitespace = |k: &mut usize| {
        while *k < len && bytes[*k].is_ascii_whitespace() {
            *k += 1;
        }
    };

    loop {
        skip_whitespace(&mut k);
        if k >= len {
            break;
        }
        if bytes[k] == b'>' {
            k += 1;
            break;
        }
        if bytes[k] == b'/' {
            if k + 1 < len && bytes[k + 1] == b'>' {
                self_closing = true;
                k += 2;
                break;
            }
            k += 1;
            continue;
        }
        let name_start = k;
        while k < len && is_name_char(bytes[k]) {
            k += 1;
        }
        if name_start == k {
            // Skip one whole char so multi-byte garbage keeps slice boundaries valid.
            k += input[k..].chars().next().map_or(1, char::len_utf8);
            continue;
        }
        let attribute_name = input[name_start..k].to_ascii_lowercase();

        skip_whitespace(&mut k);
        let value = if k < len && bytes[k] == b'=' {
            k += 1;
            skip_whitespace(&mut k);
            if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                let quote = bytes[k];
                k += 1;
                let vstart = k;
                k = memchr(quote, &bytes[k..]).map_or(len, |rel| k + rel);
                let raw = &input[vstart..k];
                if k < len {
                    k += 1;
                }
                Some(decode_entities(raw))
            } else {
                let vstart = k;
                while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                    if bytes[k] == b'/' && k + 1 < len && bytes[k + 1] == b'>' {
                        break;
                    }
                    k += 1;
                }
                Some(decode_entities(&input[vstart..k]))
            }
        } else {
            None
        };

        // First occurrence wins, as in browsers.
        if !attributes.iter().any(|(existing, _)| *existing == attribute_name) {
            attributes.push((attribute_name, value));
        }
    }
    (attributes, self_closing, k)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(name: &str, attributes: &[(&str, Option<&str>)]) -> Token {
        Token::StartTag {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
                .collect(),
            self_closing: false,
        }
    }

    #[test]
    fn tokenize_lowercases_names_and_decodes_attribute_values() {
        let tokens = tokenize(r#"<DiV ID="a&amp;b" Hidden>x</DIV>"#);
        assert_eq!(
            tokens,
            vec![
                start("div", &[("id", Some("a&b")), ("hidden", None)]),
                Token::Text("x".to_string()),
                Token::EndTag("div".to_string()),
            ]
        );
    }

    #[test]
    fn tokenize_keeps_first_duplicate_attribute() {
        let tokens = tokenize("<a href=one href=two>");
        assert_eq!(tokens, vec![start("a", &[("href", Some("one"))])]);
    }

    #[test]
    fn tokenize_marks_void_elements_self_closing() {
        let tokens = tokenize("<input name=q><br/>");
        assert!(matches!(&tokens[0], Token::StartTag { self_closing: true, .. }));
        assert!(matches!(&tokens[1], Token::StartTag { self_closing: true, .. }));
    }

    #[test]
    fn tokenize_treats_stray_angle_bracket_as_text() {
        let tokens = tokenize("1 < 2 <> 3");
        assert_eq!(tokens, vec![Token::Text("1 < 2 <> 3".to_string())]);
    }

    #[test]
    fn tokenize_finds_script_end_tag_case_insensitive() {
        let tokens = tokenize("<script>if (a<b) {}</ScRiPt >after");
        assert_eq!(
            tokens,
            vec![
                start("script", &[]),
                Token::Text("if (a<b) {}".to_string()),
                Token::EndTag("script".to_string()),
                Token::Text("after".to_string()),
            ]
        );
    }

    #[test]
    fn tokenize_decodes_textarea_body_but_not_tags() {
        let tokens = tokenize("<textarea>&lt;b&gt; <i>x</i></textarea>");
        assert_eq!(tokens[1], Token::Text("<b> <i>x</i>".to_string()));
    }

    #[test]
    fn tokenize_handles_rawtext_without_close_tag() {
        let tokens = tokenize("<style>a{}");
        assert_eq!(
            tokens,
            vec![
                start("style", &[]),
                Token::Text("a{}".to_string()),
                Token::EndTag("style".to_string()),
            ]
        );
    }

    #[test]
    fn tokenize_handles_comments_and_doctype() {
        let tokens = tokenize("<!DOCTYPE html><!-- hi --><p>");
        assert_eq!(tokens[0], Token::Doctype("DOCTYPE html".to_string()));
        assert_eq!(tokens[1], Token::Comment(" hi ".to_string()));
    }

    #[test]
    fn tokenize_handles_non_ascii_text_around_tags() {
        let tokens = tokenize("¡Hola <b>café</b> 😊");
        assert_eq!(tokens[0], Token::Text("¡Hola ".to_string()));
        assert_eq!(tokens[2], Token::Text("café".to_string()));
        assert_eq!(tokens[4], Token::Text(" 😊".to_string()));
    }

    #[test]
    fn tokenize_survives_garbage_inside_tags() {
        let tokens = tokenize("<p é=1 \"x\">ok</p>");
        assert!(matches!(&tokens[0], Token::StartTag { name, .. } if name == "p"));
        assert_eq!(tokens[1], Token::Text("ok".to_string()));
    }

    #[test]
    fn tokenize_handles_tons_of_angle_brackets() {
        let input = "<".repeat(50_000);
        let tokens = tokenize(&input);
        assert_eq!(tokens, vec![Token::Text(input)]);
    }
}
