//! iCalendar property parameters (RFC 5545 §3.2).

/// A property parameter.
///
/// All parameters are stored uniformly as a value sequence; inherently
/// multi-valued parameters (MEMBER, DELEGATED-TO, ...) simply carry more
/// than one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name (normalized to uppercase).
    pub name: String,
    /// Parameter values in order of appearance.
    pub values: Vec<String>,
}

impl Parameter {
    /// Creates a parameter with a single value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            values: vec![value.into()],
        }
    }

    /// Creates a parameter with multiple values.
    #[must_use]
    pub fn with_values(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            values,
        }
    }

    /// Returns the first value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Returns whether the parameter carries the given value (case-insensitive).
    #[must_use]
    pub fn has_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v.eq_ignore_ascii_case(value))
    }

    /// Creates a VALUE parameter.
    #[must_use]
    pub fn value_type(type_name: impl Into<String>) -> Self {
        Self::new("VALUE", type_name)
    }

    /// Creates a TZID parameter.
    #[must_use]
    pub fn tzid(tzid: impl Into<String>) -> Self {
        Self::new("TZID", tzid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_uppercased() {
        let p = Parameter::new("tzid", "America/New_York");
        assert_eq!(p.name, "TZID");
        assert_eq!(p.value(), Some("America/New_York"));
    }

    #[test]
    fn multi_values() {
        let p = Parameter::with_values(
            "MEMBER",
            vec!["mailto:a@example.com".into(), "mailto:b@example.com".into()],
        );
        assert_eq!(p.values.len(), 2);
        assert!(p.has_value("MAILTO:A@EXAMPLE.COM"));
    }
}
