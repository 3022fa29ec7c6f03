//! iCalendar properties (RFC 5545 §3.1, §3.8).

use super::datetime::CalDateTime;
use super::parameter::Parameter;
use super::value::Value;

/// A fully parsed iCalendar property.
///
/// The parsed value and the raw content-line text are kept in sync: the raw
/// text preserves round-trip fidelity for values we parsed from input, and
/// every typed mutation re-renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name (normalized to uppercase).
    pub name: String,
    /// Parameters in order of appearance.
    pub params: Vec<Parameter>,
    value: Value,
    raw_value: String,
}

impl Property {
    /// Creates a property from already-parsed parts.
    #[must_use]
    pub fn from_parts(
        name: impl Into<String>,
        params: Vec<Parameter>,
        value: Value,
        raw_value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            params,
            value,
            raw_value: raw_value.into(),
        }
    }

    /// Creates a property with a text value.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = Value::Text(value.into());
        let raw = value.to_ical_string();
        Self::from_parts(name, Vec::new(), value, raw)
    }

    /// Creates a property with an integer value.
    #[must_use]
    pub fn integer(name: impl Into<String>, value: i32) -> Self {
        let value = Value::Integer(value);
        let raw = value.to_ical_string();
        Self::from_parts(name, Vec::new(), value, raw)
    }

    /// Creates a property with a datetime value.
    #[must_use]
    pub fn datetime(name: impl Into<String>, dt: super::datetime::DateTime) -> Self {
        let mut params = Vec::new();
        if let Some(tzid) = dt.tzid() {
            params.push(Parameter::tzid(tzid));
        }
        let value = Value::DateTime(dt);
        let raw = value.to_ical_string();
        Self::from_parts(name, params, value, raw)
    }

    /// Creates a date or date-time property, carrying `VALUE=DATE` or a
    /// TZID parameter as the value's form requires.
    #[must_use]
    pub fn caldatetime(name: impl Into<String>, value: &CalDateTime) -> Self {
        match value {
            CalDateTime::Date(d) => {
                let value = Value::Date(*d);
                let raw = value.to_ical_string();
                Self::from_parts(name, vec![Parameter::value_type("DATE")], value, raw)
            }
            CalDateTime::DateTime(dt) => Self::datetime(name, dt.clone()),
        }
    }

    /// Creates a property with a duration value.
    #[must_use]
    pub fn duration(name: impl Into<String>, d: super::duration::Duration) -> Self {
        let value = Value::Duration(d);
        let raw = value.to_ical_string();
        Self::from_parts(name, Vec::new(), value, raw)
    }

    /// Creates an RRULE property.
    #[must_use]
    pub fn recur(name: impl Into<String>, rrule: super::rrule::RRule) -> Self {
        let value = Value::Recur(Box::new(rrule));
        let raw = value.to_ical_string();
        Self::from_parts(name, Vec::new(), value, raw)
    }

    /// The parsed value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The raw content-line value text.
    #[must_use]
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    /// Replaces the value, re-rendering the raw text.
    pub fn set_value(&mut self, value: Value) {
        self.raw_value = value.to_ical_string();
        self.value = value;
    }

    /// Replaces both value and raw text (for callers that already hold the
    /// exact wire form, e.g. normalization of RRULE part order).
    pub fn set_value_with_raw(&mut self, value: Value, raw_value: impl Into<String>) {
        self.value = value;
        self.raw_value = raw_value.into();
    }

    /// Returns the parameter with the given name.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Single-value parameter access: the first value, if any.
    #[must_use]
    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.get_param(name)?.value()
    }

    /// Multi-value parameter access: the full value sequence.
    #[must_use]
    pub fn param_values(&self, name: &str) -> &[String] {
        self.get_param(name).map_or(&[], |p| p.values.as_slice())
    }

    #[must_use]
    pub fn has_param(&self, name: &str) -> bool {
        self.get_param(name).is_some()
    }

    /// Sets a parameter, replacing any existing one with the same name.
    /// An empty value sequence removes the parameter instead.
    pub fn set_param(&mut self, param: Parameter) {
        let name = param.name.clone();
        self.params.retain(|p| !p.name.eq_ignore_ascii_case(&name));
        if !param.values.is_empty() {
            self.params.push(param);
        }
    }

    /// Removes a parameter by name.
    pub fn remove_param(&mut self, name: &str) {
        self.params.retain(|p| !p.name.eq_ignore_ascii_case(name));
    }

    /// The TZID parameter, if present.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        self.param_value("TZID")
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.value.as_text()
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        self.value.as_integer()
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<&super::datetime::DateTime> {
        self.value.as_datetime()
    }

    #[must_use]
    pub fn as_caldatetime(&self) -> Option<CalDateTime> {
        self.value.as_caldatetime()
    }

    #[must_use]
    pub fn as_duration(&self) -> Option<&super::duration::Duration> {
        self.value.as_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::datetime::{Date, DateTime};

    #[test]
    fn text_property() {
        let prop = Property::text("summary", "Meeting");
        assert_eq!(prop.name, "SUMMARY");
        assert_eq!(prop.as_text(), Some("Meeting"));
        assert_eq!(prop.raw_value(), "Meeting");
    }

    #[test]
    fn set_value_refreshes_raw() {
        let mut prop = Property::integer("SEQUENCE", 1);
        prop.set_value(Value::Integer(5));
        assert_eq!(prop.raw_value(), "5");
    }

    #[test]
    fn zoned_datetime_carries_tzid_param() {
        let prop = Property::datetime(
            "DTSTART",
            DateTime::zoned("America/New_York", 2026, 1, 23, 12, 0, 0),
        );
        assert_eq!(prop.tzid(), Some("America/New_York"));
        assert_eq!(prop.raw_value(), "20260123T120000");
    }

    #[test]
    fn date_property_carries_value_date() {
        let prop = Property::caldatetime("DTSTART", &CalDateTime::Date(Date::new(2026, 1, 23)));
        assert_eq!(prop.param_value("VALUE"), Some("DATE"));
    }

    #[test]
    fn empty_param_sequence_removes() {
        let mut prop = Property::text("ATTENDEE", "mailto:a@example.com");
        prop.set_param(Parameter::new("MEMBER", "mailto:g@example.com"));
        assert!(prop.has_param("MEMBER"));
        prop.set_param(Parameter::with_values("MEMBER", Vec::new()));
        assert!(!prop.has_param("MEMBER"));
    }
}
