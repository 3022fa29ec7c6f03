//! Text and parameter value escaping (RFC 5545 §3.3.11, RFC 6868).

/// Escapes a TEXT value: backslash, semicolon, comma, newline.
#[must_use]
pub fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            ';' => result.push_str("\\;"),
            ',' => result.push_str("\\,"),
            '\n' => result.push_str("\\n"),
            '\r' => {}
            _ => result.push(c),
        }
    }
    result
}

/// Renders a parameter value, quoting and caret-encoding when needed.
///
/// Values containing `:`, `;` or `,` must be quoted (RFC 5545 §3.2);
/// double quotes, newlines and carets use RFC 6868 caret escapes. A
/// literal `^` is encoded even in an unquoted value, since the reader
/// decodes caret sequences unconditionally.
#[must_use]
pub fn escape_param_value(s: &str) -> String {
    let needs_quoting = s.contains([':', ';', ',']) || s.contains('"') || s.contains('\n');
    if !needs_quoting && !s.contains('^') {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len() + 2);
    if needs_quoting {
        result.push('"');
    }
    for c in s.chars() {
        match c {
            '^' => result.push_str("^^"),
            '\n' => result.push_str("^n"),
            '"' => result.push_str("^'"),
            _ => result.push(c),
        }
    }
    if needs_quoting {
        result.push('"');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_text_specials() {
        assert_eq!(escape_text("a, b; c\\d\ne"), "a\\, b\\; c\\\\d\\ne");
    }

    #[test]
    fn plain_param_value_unquoted() {
        assert_eq!(escape_param_value("America/New_York"), "America/New_York");
    }

    #[test]
    fn param_value_with_comma_quoted() {
        assert_eq!(escape_param_value("Doe, Jane"), "\"Doe, Jane\"");
    }

    #[test]
    fn param_value_caret_encoding() {
        assert_eq!(escape_param_value("say \"hi\""), "\"say ^'hi^'\"");
    }

    #[test]
    fn bare_caret_encoded_unquoted() {
        assert_eq!(escape_param_value("up^next"), "up^^next");
    }
}
