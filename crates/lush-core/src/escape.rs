//! C-style escape decoding and the canonical quoted encoding.
//!
//! The parser uses [`unescape`] for the bodies of `$'…'` and `"…"` literals;
//! the value model uses [`quote`] to render a string's literal form. The two
//! are inverses: `unescape(quote(s)[1..len-1]) == s` for every string.

use crate::error::ShellError;

/// Decode C-style escapes in the body of a quoted literal.
///
/// Recognized: `\a \b \e \f \n \r \t \v \\ \' \"`, `\xHH` (1-2 hex digits),
/// `\uXXXX`, `\UXXXXXXXX`, and octal `\NNN` (1-3 digits). A backslash before
/// any other character is kept as-is, both characters intact.
pub fn unescape(text: &str) -> Result<String, ShellError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some(e) = chars.next() else {
            return Err(ShellError::Escape("trailing backslash".to_string()));
        };

        match e {
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'e' => out.push('\x1b'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'x' => {
                let mut hex = String::new();
                while hex.len() < 2 {
                    match chars.peek() {
                        Some(h) if h.is_ascii_hexdigit() => {
                            hex.push(*h);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                if hex.is_empty() {
                    return Err(ShellError::Escape("\\x requires a hex digit".to_string()));
                }
                let code = u32::from_str_radix(&hex, 16).unwrap();
                out.push(char::from_u32(code).unwrap());
            }
            'u' => out.push(hex_escape(&mut chars, 4)?),
            'U' => out.push(hex_escape(&mut chars, 8)?),
            '0'..='7' => {
                let mut oct = String::from(e);
                while oct.len() < 3 {
                    match chars.peek() {
                        Some(o @ '0'..='7') => {
                            oct.push(*o);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                let code = u32::from_str_radix(&oct, 8).unwrap();
                let c = char::from_u32(code)
                    .ok_or_else(|| ShellError::Escape(format!("\\{oct} is out of range")))?;
                out.push(c);
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    Ok(out)
}

fn hex_escape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    width: usize,
) -> Result<char, ShellError> {
    let mut hex = String::new();
    for _ in 0..width {
        match chars.next() {
            Some(h) if h.is_ascii_hexdigit() => hex.push(h),
            _ => {
                return Err(ShellError::Escape(format!(
                    "\\{} requires exactly {width} hex digits",
                    if width == 4 { 'u' } else { 'U' }
                )));
            }
        }
    }
    let code = u32::from_str_radix(&hex, 16).unwrap();
    char::from_u32(code).ok_or_else(|| ShellError::Escape(format!("\\{hex} is not a scalar value")))
}

/// Encode `text` as a double-quoted literal, canonicalizing escapes so the
/// result survives a round trip through [`unescape`].
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_named() {
        assert_eq!(unescape("a\\tb\\nc").unwrap(), "a\tb\nc");
        assert_eq!(unescape("\\a\\e\\v").unwrap(), "\x07\x1b\x0b");
    }

    #[test]
    fn test_unescape_quotes_and_backslash() {
        assert_eq!(unescape("\\\"\\'\\\\").unwrap(), "\"'\\");
    }

    #[test]
    fn test_unescape_hex() {
        assert_eq!(unescape("\\x41").unwrap(), "A");
        assert_eq!(unescape("\\x9").unwrap(), "\t");
        assert_eq!(unescape("\\x41b").unwrap(), "Ab");
    }

    #[test]
    fn test_unescape_unicode() {
        assert_eq!(unescape("\\u00e9").unwrap(), "é");
        assert_eq!(unescape("\\U0001f600").unwrap(), "😀");
    }

    #[test]
    fn test_unescape_octal() {
        assert_eq!(unescape("\\101").unwrap(), "A");
        assert_eq!(unescape("\\0").unwrap(), "\0");
    }

    #[test]
    fn test_unescape_unknown_kept() {
        assert_eq!(unescape("\\q").unwrap(), "\\q");
    }

    #[test]
    fn test_unescape_errors() {
        assert!(unescape("\\x").is_err());
        assert!(unescape("\\u12").is_err());
        assert!(unescape("ends with \\").is_err());
    }

    #[test]
    fn test_quote_plain() {
        assert_eq!(quote("hello"), "\"hello\"");
    }

    #[test]
    fn test_quote_specials() {
        assert_eq!(quote("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
        assert_eq!(quote("\x01"), "\"\\x01\"");
    }

    #[test]
    fn test_quote_unescape_round_trip() {
        for s in ["", "plain", "tab\there", "q\"q", "nul\0nul", "uni é 😀"] {
            let quoted = quote(s);
            let body = &quoted[1..quoted.len() - 1];
            assert_eq!(unescape(body).unwrap(), s);
        }
    }
}
