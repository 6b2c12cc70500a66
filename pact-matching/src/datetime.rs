//! Date and time format checks.
//!
//! Patterns use the `SimpleDateFormat` letters pact documents carry
//! (`yyyy-MM-dd'T'HH:mm:ss.SSSXXX`). They are translated to chrono format
//! items and the value must parse completely.

use chrono::format::{Parsed, StrftimeItems, parse};
use chrono::{DateTime, NaiveDateTime};

/// Default pattern of a `date` rule.
pub const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd";

/// Default pattern of a `time` rule.
pub const DEFAULT_TIME_FORMAT: &str = "HH:mm:ss";

/// Translate a `SimpleDateFormat` pattern into a chrono format string.
///
/// # Errors
///
/// Returns a description of the first pattern letter chrono cannot express.
pub fn to_strftime(pattern: &str) -> Result<String, String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            // '' is a literal quote; otherwise copy up to the closing quote
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) != Some(&'\'') {
                        break;
                    }
                    i += 1;
                }
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }
        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&next| next == c).count();
        let item = match (c, run) {
            ('y' | 'u', 2) => "%y",
            ('y' | 'u', _) => "%Y",
            ('M' | 'L', 1 | 2) => "%m",
            ('M' | 'L', 3) => "%b",
            ('M' | 'L', _) => "%B",
            ('d', _) => "%d",
            ('D', _) => "%j",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('a', _) => "%p",
            ('H' | 'k', _) => "%H",
            ('h' | 'K', _) => "%I",
            ('m', _) => "%M",
            ('s', _) => "%S",
            ('S', 3) => "%3f",
            ('S', 6) => "%6f",
            ('S', 9) => "%9f",
            ('X' | 'x' | 'Z', _) => "%#z",
            ('z', _) => "%Z",
            (other, _) => return Err(format!("unsupported pattern letter '{other}' in '{pattern}'")),
        };
        out.push_str(item);
        i += run;
    }
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// Check that `text` is formatted by `pattern`.
///
/// # Errors
///
/// Returns a human-readable description when the pattern is unsupported or
/// the text does not match it.
pub fn check_pattern(kind: &str, pattern: &str, text: &str) -> Result<(), String> {
    let format = to_strftime(pattern)?;
    let mut parsed = Parsed::default();
    parse(&mut parsed, text, StrftimeItems::new(&format))
        .map_err(|err| format!("Expected '{text}' to be a {kind} in the format '{pattern}': {err}"))
}

/// Check a `timestamp` rule value. Without a pattern any ISO 8601 date and
/// time is accepted, with or without an offset.
///
/// # Errors
///
/// As [`check_pattern`].
pub fn check_timestamp(pattern: Option<&str>, text: &str) -> Result<(), String> {
    match pattern {
        Some(pattern) => check_pattern("timestamp", pattern, text),
        None if DateTime::parse_from_rfc3339(text).is_ok()
            || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").is_ok() =>
        {
            Ok(())
        }
        None => Err(format!("Expected '{text}' to be an ISO 8601 timestamp")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation() {
        assert_eq!(to_strftime("yyyy-MM-dd").unwrap(), "%Y-%m-%d");
        assert_eq!(to_strftime("yyyy-MM-dd'T'HH:mm:ss.SSSXXX").unwrap(), "%Y-%m-%dT%H:%M:%S.%3f%#z");
        assert_eq!(to_strftime("EEE, d MMM yy 'at' h a").unwrap(), "%a, %d %b %y at %I %p");
        assert_eq!(to_strftime("HH 'o''clock'").unwrap(), "%H o'clock");
        assert!(to_strftime("yyyy-ww").is_err());
    }

    #[test]
    fn test_dates() {
        assert!(check_pattern("date", DEFAULT_DATE_FORMAT, "2024-02-29").is_ok());
        assert!(check_pattern("date", DEFAULT_DATE_FORMAT, "2024-13-01").is_err());
        assert!(check_pattern("date", DEFAULT_DATE_FORMAT, "29/02/2024").is_err());
        assert!(check_pattern("date", "dd/MM/yyyy", "29/02/2024").is_ok());
        assert!(check_pattern("date", DEFAULT_DATE_FORMAT, "2024-02-29 trailing").is_err());
    }

    #[test]
    fn test_times() {
        assert!(check_pattern("time", DEFAULT_TIME_FORMAT, "23:59:01").is_ok());
        assert!(check_pattern("time", DEFAULT_TIME_FORMAT, "24:61:00").is_err());
        assert!(check_pattern("time", "HH:mm", "07:30").is_ok());
    }

    #[test]
    fn test_timestamps() {
        assert!(check_timestamp(None, "2024-02-29T10:15:30Z").is_ok());
        assert!(check_timestamp(None, "2024-02-29T10:15:30.123+02:00").is_ok());
        assert!(check_timestamp(None, "2024-02-29T10:15:30").is_ok());
        assert!(check_timestamp(None, "yesterday").is_err());
        assert!(check_timestamp(Some("yyyy-MM-dd'T'HH:mm:ssXXX"), "2024-02-29T10:15:30+01:00").is_ok());
        assert!(check_timestamp(Some("yyyy-MM-dd HH:mm:ss"), "2024-02-29T10:15:30").is_err());
    }
}
