/// Named entities the tokenizer decodes. Everything else passes through.
const NAMED: &[(&[u8], char)] = &[
    (b"&amp;", '&'),
    (b"&lt;", '<'),
    (b"&gt;", '>'),
    (b"&quot;", '"'),
    (b"&apos;", '\''),
    (b"&#39;", '\''),
    (b"&nbsp;", '\u{00A0}'),
];

const MAX_HEX_DIGITS: usize = 6; // 0x10FFFF
const MAX_DEC_DIGITS: usize = 7; // 1114111

/// Decode the small entity subset markup in templates and messages uses.
///
/// - Named: `&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;`, `&nbsp;`.
/// - Numeric: `&#123;` and `&#x1F4A9;`, semicolon-terminated, valid scalars only.
/// - Unknown names, missing semicolons and malformed numerics are left unchanged.
pub(crate) fn decode_entities(s: &str) -> String {
    let bytes = s.as_bytes();
    if memchr::memchr(b'&', bytes).is_none() {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    let mut copy_start = 0;

    'scan: while i < bytes.len() {
        if bytes[i] != b'&' {
            i += 1;
            continue;
        }

        if copy_start < i {
            out.push_str(&s[copy_start..i]);
        }

        for (pattern, ch) in NAMED {
            if bytes[i..].starts_with(pattern) {
                out.push(*ch);
                i += pattern.len();
                copy_start = i;
                continue 'scan;
            }
        }

        let numeric = if bytes[i..].starts_with(b"&#x") || bytes[i..].starts_with(b"&#X") {
            Some((i + 3, MAX_HEX_DIGITS, 16))
        } else if bytes[i..].starts_with(b"&#") {
            Some((i + 2, MAX_DEC_DIGITS, 10))
        } else {
            None
        };

        if let Some((digits_start, max_digits, radix)) = numeric {
            match scan_numeric_entity(bytes, digits_start, max_digits, radix) {
                Some(end) => {
                    let digits = &s[digits_start..end];
                    match u32::from_str_radix(digits, radix).ok().and_then(char::from_u32) {
                        Some(ch) => out.push(ch),
                        None => out.push_str(&s[i..=end]),
                    }
                    i = end + 1;
                }
                None => i = emit_malformed_entity(&mut out, s, i),
            }
            copy_start = i;
            continue;
        }

        out.push('&');
        i += 1;
        copy_start = i;
    }

    if copy_start < bytes.len() {
        out.push_str(&s[copy_start..]);
    }
    out
}

// Bounded so adversarial digit runs stay linear.
fn scan_numeric_entity(bytes: &[u8], start: usize, max_digits: usize, radix: u32) -> Option<usize> {
    let mut digits = 0usize;
    for (j, &b) in bytes.iter().enumerate().skip(start) {
        if b == b';' {
            return (digits > 0).then_some(j);
        }
        if digits == max_digits || !(b as char).is_digit(radix) {
            return None;
        }
        digits += 1;
    }
    None
}

fn emit_malformed_entity(out: &mut String, s: &str, start: usize) -> usize {
    let bytes = s.as_bytes();
    for (j, &b) in bytes.iter().enumerate().skip(start + 1) {
        match b {
            b';' => {
                out.push_str(&s[start..=j]);
                return j + 1;
            }
            b'&' => {
                out.push_str(&s[start..j]);
                return j;
            }
            b if b.is_ascii_whitespace() => {
                out.push_str(&s[start..j]);
                return j;
            }
            _ => {}
        }
    }
    out.push_str(&s[start..]);
    bytes.len()
}

/// Escape text node content for serialization.
pub fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

/// Escape a double-quoted attribute value for serialization.
pub fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}
