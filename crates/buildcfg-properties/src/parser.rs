//! Line-oriented properties parser.
//!
//! Accepts the subset of the Java properties format that `local.properties`
//! files use in practice:
//! - `#` and `!` comment lines, blank lines
//! - `key=value` and `key:value` entries
//! - trailing `\` line continuations
//! - `\t \n \r \f` and `\uXXXX` escapes (surrogate pairs included)
//!
//! Whitespace-only separators (`key value`) are rejected so that a stray
//! line of text is reported instead of silently becoming a key.

use crate::error::{MalformedReason, ParseFailure};

/// Parse properties text into `(key, value)` pairs in file order.
///
/// Duplicate keys are kept; the caller decides precedence.
pub(crate) fn parse(text: &str) -> Result<Vec<(String, String)>, ParseFailure> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut entries = Vec::new();
    let mut lines = text.lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let line = index + 1;
        let trimmed = raw.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = trimmed.to_string();
        while has_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => {
                    return Err(ParseFailure::new(
                        line,
                        MalformedReason::DanglingContinuation,
                    ))
                }
            }
        }

        let entry = split_entry(&logical).map_err(|reason| ParseFailure::new(line, reason))?;
        entries.push(entry);
    }

    Ok(entries)
}

/// A line continues when it ends in an odd number of backslashes.
fn has_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(logical: &str) -> Result<(String, String), MalformedReason> {
    let separator = find_separator(logical).ok_or(MalformedReason::MissingSeparator)?;

    let key = unescape(logical[..separator].trim_end())?;
    if key.is_empty() {
        return Err(MalformedReason::EmptyKey);
    }

    // Separators are ASCII, so +1 stays on a char boundary
    let value = unescape(logical[separator + 1..].trim_start())?;
    Ok((key, value))
}

/// Byte offset of the first unescaped `=` or `:`.
fn find_separator(logical: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in logical.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return Some(i),
            _ => {}
        }
    }
    None
}

fn unescape(s: &str) -> Result<String, MalformedReason> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000c}'),
            Some('u') => {
                let unit = read_hex4(&mut chars)?;
                if (0xD800..=0xDBFF).contains(&unit) {
                    let low = match (chars.next(), chars.next()) {
                        (Some('\\'), Some('u')) => read_hex4(&mut chars)?,
                        _ => return Err(MalformedReason::InvalidUnicodeEscape(format!("{:04X}", unit))),
                    };
                    if !(0xDC00..=0xDFFF).contains(&low) {
                        return Err(MalformedReason::InvalidUnicodeEscape(format!("{:04X}", low)));
                    }
                    let scalar = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                    out.push(
                        char::from_u32(scalar)
                            .ok_or_else(|| MalformedReason::InvalidUnicodeEscape(format!("{:04X}", unit)))?,
                    );
                } else {
                    out.push(
                        char::from_u32(unit)
                            .ok_or_else(|| MalformedReason::InvalidUnicodeEscape(format!("{:04X}", unit)))?,
                    );
                }
            }
            // Unknown escapes drop the backslash, as in the Java loader
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

fn read_hex4(chars: &mut impl Iterator<Item = char>) -> Result<u32, MalformedReason> {
    let digits: String = chars.take(4).collect();
    if digits.chars().count() != 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(MalformedReason::InvalidUnicodeEscape(digits));
    }
    u32::from_str_radix(&digits, 16).map_err(|_| MalformedReason::InvalidUnicodeEscape(digits))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(text: &str) -> Vec<(String, String)> {
        parse(text).unwrap()
    }

    #[test]
    fn test_simple_entries() {
        let entries = pairs("sdk.dir=/opt/android\nflutter.versionCode=3\n");
        assert_eq!(
            entries,
            vec![
                ("sdk.dir".to_string(), "/opt/android".to_string()),
                ("flutter.versionCode".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let entries = pairs("# generated\n\n   ! legacy comment\napp.versionName=2.0\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1, "2.0");
    }

    #[test]
    fn test_colon_separator_and_whitespace() {
        let entries = pairs("  app.versionCode  :   42\n");
        assert_eq!(entries[0], ("app.versionCode".to_string(), "42".to_string()));
    }

    #[test]
    fn test_value_keeps_trailing_whitespace_and_later_separators() {
        let entries = pairs("url=https://example.com/a=b \n");
        assert_eq!(entries[0].1, "https://example.com/a=b ");
    }

    #[test]
    fn test_empty_value_allowed() {
        let entries = pairs("app.versionName=\n");
        assert_eq!(entries[0], ("app.versionName".to_string(), String::new()));
    }

    #[test]
    fn test_escaped_separator_in_key() {
        let entries = pairs("a\\=b=c\n");
        assert_eq!(entries[0], ("a=b".to_string(), "c".to_string()));
    }

    #[test]
    fn test_continuation() {
        let entries = pairs("app.versionName=1.\\\n    2.3\nnext=1\n");
        assert_eq!(entries[0].1, "1.2.3");
        assert_eq!(entries[1].0, "next");
    }

    #[test]
    fn test_escaped_backslash_is_not_continuation() {
        let entries = pairs("sdk.dir=C:\\\\Android\\\\\nnext=1\n");
        assert_eq!(entries[0].1, "C:\\Android\\");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_unicode_escapes() {
        let entries = pairs("name=caf\\u00e9 \\uD83D\\uDE80\n");
        assert_eq!(entries[0].1, "café 🚀");
    }

    #[test]
    fn test_crlf_line_endings() {
        let entries = pairs("a=1\r\nb=2\r\n");
        assert_eq!(entries[1], ("b".to_string(), "2".to_string()));
    }

    #[test]
    fn test_byte_order_mark_is_skipped() {
        let entries = pairs("\u{feff}a=1\n");
        assert_eq!(entries[0].0, "a");
    }

    #[test]
    fn test_missing_separator_reports_line() {
        let err = parse("a=1\n\nthis is not an entry\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.reason, MalformedReason::MissingSeparator);
    }

    #[test]
    fn test_empty_key() {
        let err = parse("=value\n").unwrap_err();
        assert_eq!(err.reason, MalformedReason::EmptyKey);
    }

    #[test]
    fn test_truncated_unicode_escape() {
        let err = parse("a=1\nb=\\u12\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(matches!(err.reason, MalformedReason::InvalidUnicodeEscape(_)));
    }

    #[test]
    fn test_lone_surrogate_rejected() {
        let err = parse("b=\\uD83Dx\n").unwrap_err();
        assert!(matches!(err.reason, MalformedReason::InvalidUnicodeEscape(_)));
    }

    #[test]
    fn test_dangling_continuation() {
        let err = parse("a=1\nb=2\\").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.reason, MalformedReason::DanglingContinuation);
    }

    #[test]
    fn test_continuation_error_reports_start_line() {
        let err = parse("first\\\n  second\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.reason, MalformedReason::MissingSeparator);
    }
}
