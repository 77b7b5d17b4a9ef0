//! Character-reference decoding for component attribute values.
//!
//! Only the named references that show up in authored attributes plus
//! numeric forms. Anything unrecognized passes through literally, so a bare
//! `&` in a value never errors.

use std::borrow::Cow;

const NAMED: &[(&str, char)] = &[
    ("amp;", '&'),
    ("lt;", '<'),
    ("gt;", '>'),
    ("quot;", '"'),
    ("apos;", '\''),
];

/// Decode character references in `input`, borrowing when there is nothing
/// to decode.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match parse_reference(tail) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Parse one reference at the start of `s` (which begins with `&`).
/// Returns the decoded char and the number of bytes consumed.
fn parse_reference(s: &str) -> Option<(char, usize)> {
    let body = &s[1..];
    if let Some(num) = body.strip_prefix('#') {
        let (digits, radix, marker_len) = match num.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 3),
            None => (num, 10, 2),
        };
        let end = digits.find(';')?;
        if end == 0 || !digits[..end].chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        let code = u32::from_str_radix(&digits[..end], radix).ok()?;
        let ch = char::from_u32(code)?;
        return Some((ch, marker_len + end + 1));
    }
    for (name, ch) in NAMED {
        if body.starts_with(name) {
            return Some((*ch, 1 + name.len()));
        }
    }
    None
}
