//! Content-line lexing.
//!
//! Unfolds physical lines into logical content lines and splits each
//! content line into name, parameters, and raw value per RFC 5545 §3.1.

use crate::core::Parameter;
use crate::parse::error::{ParseError, ParseErrorKind, ParseResult};

/// A single unfolded content line, split into its parts.
#[derive(Debug, Clone)]
pub struct ContentLine {
    pub name: String,
    pub params: Vec<Parameter>,
    pub value: String,
    /// Physical line number the content line started on (1-based).
    pub line: usize,
}

/// Unfolds physical lines into logical content lines.
///
/// A physical line starting with a space or horizontal tab is a
/// continuation of the previous line. Blank lines are skipped. Both
/// CRLF and bare LF terminators are accepted.
#[must_use]
pub fn unfold(text: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')) {
            if let Some((_, last)) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        if raw.is_empty() {
            continue;
        }
        lines.push((idx + 1, raw.to_owned()));
    }
    lines
}

/// Splits a logical content line into name, parameters, and value.
pub fn parse_content_line(line: &str, lineno: usize) -> ParseResult<ContentLine> {
    let bytes = line.as_bytes();
    let mut pos = 0;

    // Name: iana-token or x-name.
    while pos < bytes.len() && is_name_char(bytes[pos]) {
        pos += 1;
    }
    if pos == 0 {
        return Err(ParseError::new(ParseErrorKind::MissingPropertyName, lineno, 1)
            .with_context(truncate_for_context(line)));
    }
    let name = line[..pos].to_ascii_uppercase();

    let mut params = Vec::new();
    while pos < bytes.len() && bytes[pos] == b';' {
        pos += 1;
        let param = parse_parameter(line, &mut pos, lineno)?;
        params.push(param);
    }

    if pos >= bytes.len() || bytes[pos] != b':' {
        return Err(ParseError::new(ParseErrorKind::MissingColon, lineno, pos + 1)
            .with_context(truncate_for_context(line)));
    }
    let value = line[pos + 1..].to_owned();

    Ok(ContentLine { name, params, value, line: lineno })
}

fn parse_parameter(line: &str, pos: &mut usize, lineno: usize) -> ParseResult<Parameter> {
    let bytes = line.as_bytes();
    let start = *pos;
    while *pos < bytes.len() && is_name_char(bytes[*pos]) {
        *pos += 1;
    }
    if *pos == start {
        return Err(ParseError::new(ParseErrorKind::InvalidParameter, lineno, start + 1)
            .with_context(truncate_for_context(line)));
    }
    let name = line[start..*pos].to_ascii_uppercase();

    if *pos >= bytes.len() || bytes[*pos] != b'=' {
        return Err(ParseError::new(ParseErrorKind::InvalidParameter, lineno, *pos + 1)
            .with_context(format!("parameter {name} has no value")));
    }
    *pos += 1;

    let mut values = Vec::new();
    loop {
        let value = parse_param_value(line, pos, lineno)?;
        values.push(value);
        if *pos < bytes.len() && bytes[*pos] == b',' {
            *pos += 1;
        } else {
            break;
        }
    }

    Ok(Parameter::with_values(name, values))
}

fn parse_param_value(line: &str, pos: &mut usize, lineno: usize) -> ParseResult<String> {
    let bytes = line.as_bytes();
    if *pos < bytes.len() && bytes[*pos] == b'"' {
        *pos += 1;
        let start = *pos;
        while *pos < bytes.len() && bytes[*pos] != b'"' {
            *pos += 1;
        }
        if *pos >= bytes.len() {
            return Err(ParseError::new(ParseErrorKind::UnclosedQuote, lineno, start)
                .with_context(truncate_for_context(line)));
        }
        let value = caret_decode(&line[start..*pos]);
        *pos += 1;
        Ok(value)
    } else {
        let start = *pos;
        while *pos < bytes.len() && !matches!(bytes[*pos], b';' | b':' | b',') {
            *pos += 1;
        }
        Ok(caret_decode(&line[start..*pos]))
    }
}

/// Decodes RFC 6868 caret escapes in a parameter value.
fn caret_decode(value: &str) -> String {
    if !value.contains('^') {
        return value.to_owned();
    }
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '^' {
            match chars.next() {
                Some('n') | Some('N') => out.push('\n'),
                Some('\'') => out.push('"'),
                Some('^') => out.push('^'),
                Some(other) => {
                    out.push('^');
                    out.push(other);
                }
                None => out.push('^'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-'
}

fn truncate_for_context(line: &str) -> String {
    if line.len() > 60 {
        let mut end = 60;
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &line[..end])
    } else {
        line.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfold_joins_continuations() {
        let lines = unfold("DESCRIPTION:part one\r\n  and part two\r\nSUMMARY:done\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].1, "DESCRIPTION:part one and part two");
        assert_eq!(lines[1].1, "SUMMARY:done");
    }

    #[test]
    fn unfold_tab_continuation() {
        let lines = unfold("SUMMARY:ab\n\tcd\n");
        assert_eq!(lines[0].1, "SUMMARY:abcd");
    }

    #[test]
    fn content_line_with_params() {
        let cl = parse_content_line("DTSTART;TZID=America/New_York:20110101T120000", 1).unwrap();
        assert_eq!(cl.name, "DTSTART");
        assert_eq!(cl.params.len(), 1);
        assert_eq!(cl.params[0].name, "TZID");
        assert_eq!(cl.params[0].value(), Some("America/New_York"));
        assert_eq!(cl.value, "20110101T120000");
    }

    #[test]
    fn quoted_param_value_keeps_separators() {
        let cl = parse_content_line(
            "ATTENDEE;CN=\"Smith, Bob\";PARTSTAT=ACCEPTED:mailto:bob@example.com",
            1,
        )
        .unwrap();
        assert_eq!(cl.params[0].value(), Some("Smith, Bob"));
        assert_eq!(cl.value, "mailto:bob@example.com");
    }

    #[test]
    fn multi_valued_param() {
        let cl = parse_content_line("ATTENDEE;MEMBER=\"mailto:a@e.com\",\"mailto:b@e.com\":mailto:c@e.com", 1)
            .unwrap();
        assert_eq!(cl.params[0].values, vec!["mailto:a@e.com", "mailto:b@e.com"]);
    }

    #[test]
    fn caret_escapes_decoded() {
        let cl = parse_content_line("X-PROP;X-NOTE=line^none^'two^':value", 1).unwrap();
        assert_eq!(cl.params[0].value(), Some("line\none\"two\""));
    }

    #[test]
    fn missing_colon_is_error() {
        let err = parse_content_line("DTSTART;TZID=UTC", 4).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingColon);
        assert_eq!(err.line, 4);
    }
}
