//! Values of string and numeric literals, computed from their source text.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::ParseErrorKind;
use crate::text::SourceEncoding;

/// Largest code point a `\u{...}` escape may name.
const MAX_UTF8_ESCAPE: u32 = 0x7FFF_FFFF;

/// The bytes denoted by a string literal, given its raw text including delimiters.
pub fn string_value(raw: &str, encoding: SourceEncoding) -> Result<Vec<u8>, ParseErrorKind> {
    let mut bytes = Vec::with_capacity(raw.len());
    if raw.starts_with('[') {
        let contents = long_bracket_contents(raw);
        // A newline directly after the opening bracket is not part of the string.
        let contents = ["\r\n", "\n\r", "\n", "\r"]
            .iter()
            .find_map(|newline| contents.strip_prefix(newline))
            .unwrap_or(contents);
        for c in contents.chars() {
            encoding.push_char(&mut bytes, c);
        }
        return Ok(bytes);
    }

    let contents = raw.get(1..raw.len().saturating_sub(1)).unwrap_or_default();
    let mut chars = contents.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            escape(&mut chars, &mut bytes)?;
        } else {
            encoding.push_char(&mut bytes, c);
        }
    }
    Ok(bytes)
}

/// The text between the brackets of `[[...]]`, `[==[...]==]` and so on.
pub fn long_bracket_contents(raw: &str) -> &str {
    let level = raw.bytes().skip(1).take_while(|&byte| byte == b'=').count();
    let delimiter = level + 2;
    raw.get(delimiter..raw.len().saturating_sub(delimiter))
        .unwrap_or_default()
}

fn escape(chars: &mut Peekable<Chars<'_>>, bytes: &mut Vec<u8>) -> Result<(), ParseErrorKind> {
    let Some(escape) = chars.next() else {
        return Err(ParseErrorKind::InvalidEscape("\\".to_owned()));
    };
    let invalid = |sequence: &str| ParseErrorKind::InvalidEscape(format!("\\{sequence}"));
    match escape {
        'n' => bytes.push(b'\n'),
        't' => bytes.push(b'\t'),
        'r' => bytes.push(b'\r'),
        'a' => bytes.push(0x07),
        'b' => bytes.push(0x08),
        'f' => bytes.push(0x0c),
        'v' => bytes.push(0x0b),
        '\\' | '"' | '\'' => bytes.push(escape as u8),
        '\n' | '\r' => {
            bytes.push(b'\n');
            // `\r\n` and `\n\r` count as one line break
            chars.next_if(|&next| (next == '\n' || next == '\r') && next != escape);
        }
        'z' => {
            while chars
                .next_if(|&next| next.is_ascii_whitespace() || next == '\u{0b}')
                .is_some()
            {}
        }
        'x' => {
            let high = chars.next().and_then(|c| c.to_digit(16));
            let low = chars.next().and_then(|c| c.to_digit(16));
            match (high, low) {
                (Some(high), Some(low)) => bytes.push((high * 16 + low) as u8),
                _ => return Err(invalid("x")),
            }
        }
        'u' => {
            if chars.next() != Some('{') {
                return Err(invalid("u"));
            }
            let mut code: u32 = 0;
            let mut digits = 0;
            while let Some(digit) = chars.peek().and_then(|c| c.to_digit(16)) {
                if code > MAX_UTF8_ESCAPE >> 4 {
                    return Err(ParseErrorKind::InvalidEscape(format!(
                        "\\u{{{code:X}...: UTF-8 value too large"
                    )));
                }
                code = (code << 4) | digit;
                digits += 1;
                chars.next();
            }
            if digits == 0 || chars.next() != Some('}') {
                return Err(invalid("u{"));
            }
            push_utf8_escape(bytes, code);
        }
        '0'..='9' => {
            let mut code = escape.to_digit(10).unwrap_or_default();
            for _ in 0..2 {
                match chars.next_if(char::is_ascii_digit) {
                    Some(digit) => code = code * 10 + digit.to_digit(10).unwrap_or_default(),
                    None => break,
                }
            }
            let Ok(byte) = u8::try_from(code) else {
                return Err(invalid(&code.to_string()));
            };
            bytes.push(byte);
        }
        other => return Err(invalid(&other.to_string())),
    }
    Ok(())
}

/// Writes `code` the way Lua 5.4 does: UTF-8 extended to sequences of up to six bytes, so
/// surrogates and values up to 2^31 are encodable.
fn push_utf8_escape(bytes: &mut Vec<u8>, mut code: u32) {
    if code < 0x80 {
        bytes.push(code as u8);
        return;
    }
    let mut continuation = Vec::with_capacity(5);
    // largest value that still fits in the first byte
    let mut first_max: u32 = 0x3f;
    loop {
        continuation.push(0x80 | (code & 0x3f) as u8);
        code >>= 6;
        first_max >>= 1;
        if code <= first_max {
            break;
        }
    }
    bytes.push(((!first_max << 1) | code) as u8);
    bytes.extend(continuation.iter().rev());
}

/// The value of a numeric literal, or `None` if `raw` is not one.
pub fn number_value(raw: &str) -> Option<f64> {
    let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) else {
        return raw.parse::<f64>().ok();
    };

    let (digits, exponent) = match hex.find(['p', 'P']) {
        Some(index) => (&hex[..index], Some(&hex[index + 1..])),
        None => (hex, None),
    };
    let mut mantissa = 0f64;
    let mut scale = 0i32;
    let mut seen_point = false;
    let mut count = 0;
    for c in digits.chars() {
        if c == '.' && !seen_point {
            seen_point = true;
            continue;
        }
        mantissa = mantissa * 16.0 + f64::from(c.to_digit(16)?);
        count += 1;
        if seen_point {
            scale -= 4;
        }
    }
    if count == 0 {
        return None;
    }
    if let Some(exponent) = exponent {
        scale = scale.saturating_add(exponent.parse::<i32>().ok()?);
    }
    Some(mantissa * 2f64.powi(scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value(raw: &str) -> Result<Vec<u8>, ParseErrorKind> {
        string_value(raw, SourceEncoding::Utf8)
    }

    #[test]
    fn test_simple_escapes() {
        assert_eq!(value(r#""a\tb\n\\\"""#), Ok(b"a\tb\n\\\"".to_vec()));
        assert_eq!(value(r"'\65\066\x43\z
              D'"), Ok(b"ABCD".to_vec()));
        assert_eq!(value("'a\\\nb'"), Ok(b"a\nb".to_vec()));
    }

    #[test]
    fn test_utf8_escapes_beyond_unicode() {
        assert_eq!(value(r#""\u{48}\u{e9}""#), Ok(b"H\xc3\xa9".to_vec()));
        assert_eq!(value(r#""\u{D800}""#), Ok(vec![0xed, 0xa0, 0x80]));
        assert_eq!(
            value(r#""\u{7FFFFFFF}""#),
            Ok(vec![0xfd, 0xbf, 0xbf, 0xbf, 0xbf, 0xbf])
        );
        assert!(matches!(
            value(r#""\u{80000000}""#),
            Err(ParseErrorKind::InvalidEscape(_))
        ));
    }

    #[test]
    fn test_invalid_escapes_do_not_split_chars() {
        assert_eq!(
            value("\"\\é\""),
            Err(ParseErrorKind::InvalidEscape("\\é".to_owned()))
        );
        assert!(value(r#""\256""#).is_err());
        assert!(value(r#""\xg1""#).is_err());
        assert!(value(r#""\u{}""#).is_err());
    }

    #[test]
    fn test_long_strings_strip_the_first_newline() {
        assert_eq!(value("[[\nfirst ]] still]]"), Ok(b"first ]] still".to_vec()));
        assert_eq!(value("[==[\r\nx]]y]==]"), Ok(b"x]]y".to_vec()));
        assert_eq!(long_bracket_contents("[=[ note ]=]"), " note ");
    }

    #[test]
    fn test_byte_source_keeps_raw_bytes() {
        assert_eq!(
            string_value("'\u{e9}t\u{e9}'", SourceEncoding::Bytes),
            Ok(vec![0xe9, b't', 0xe9])
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(number_value("42"), Some(42.0));
        assert_eq!(number_value("3.5e2"), Some(350.0));
        assert_eq!(number_value(".5"), Some(0.5));
        assert_eq!(number_value("0xff"), Some(255.0));
        assert_eq!(number_value("0x1p4"), Some(16.0));
        assert_eq!(number_value("0x.8"), Some(0.5));
        assert_eq!(number_value("0xA.8P-1"), Some(5.25));
        assert_eq!(number_value("0x"), None);
    }
}
