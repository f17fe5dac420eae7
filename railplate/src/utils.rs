use std::char::decode_utf16;

use crate::error::{Error, ErrorKind};

pub fn memchr(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|&x| x == needle)
}

pub fn memstr(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn invalid_escape() -> Error {
    Error::new(ErrorKind::BadEscape, "invalid string escape")
}

/// Un-escape a string, following JSON-style escaping rules.
pub fn unescape(s: &str) -> Result<String, Error> {
    let mut rv = String::with_capacity(s.len());
    let mut chars = s.chars();

    fn unescape_unit(chars: &mut std::str::Chars) -> Result<u16, Error> {
        let mut val = 0u16;
        for _ in 0..4 {
            let c = chars.next().ok_or_else(invalid_escape)?;
            let digit = c.to_digit(16).ok_or_else(invalid_escape)? as u16;
            val = (val << 4) | digit;
        }
        Ok(val)
    }

    while let Some(c) = chars.next() {
        if c != '\\' {
            rv.push(c);
            continue;
        }
        match chars.next().ok_or_else(invalid_escape)? {
            '"' => rv.push('"'),
            '\'' => rv.push('\''),
            '\\' => rv.push('\\'),
            '/' => rv.push('/'),
            'b' => rv.push('\u{0008}'),
            'f' => rv.push('\u{000C}'),
            'n' => rv.push('\n'),
            'r' => rv.push('\r'),
            't' => rv.push('\t'),
            'u' => {
                let hi = unescape_unit(&mut chars)?;
                // surrogate pairs arrive as two consecutive \u escapes
                let units = if (0xD800..0xDC00).contains(&hi) {
                    match (chars.next(), chars.next()) {
                        (Some('\\'), Some('u')) => vec![hi, unescape_unit(&mut chars)?],
                        _ => return Err(invalid_escape()),
                    }
                } else {
                    vec![hi]
                };
                for c in decode_utf16(units) {
                    rv.push(c.map_err(|_| invalid_escape())?);
                }
            }
            _ => return Err(invalid_escape()),
        }
    }

    Ok(rv)
}

#[test]
fn test_unescape() {
    assert_eq!(unescape(r"foo☃bar").unwrap(), "foo\u{2603}bar");
    assert_eq!(unescape(r"\t\b\f\r\n\\\/").unwrap(), "\t\x08\x0c\r\n\\/");
    assert_eq!(unescape("foobarbaz").unwrap(), "foobarbaz");
    assert_eq!(unescape(r"\ud83d\udca9").unwrap(), "💩");
    assert!(unescape(r"\ud83d").is_err());
}
