//! Typed property values (RFC 5545 §3.3).

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};

use super::datetime::{CalDateTime, Date, DateTime, Time, UtcOffset};
use super::duration::Duration;
use super::rrule::RRule;
use crate::build::escape::escape_text;

/// A PERIOD value: explicit start/end, or start plus duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    Explicit { start: DateTime, end: DateTime },
    Duration { start: DateTime, duration: Duration },
}

impl Period {
    #[must_use]
    pub const fn start(&self) -> &DateTime {
        match self {
            Self::Explicit { start, .. } | Self::Duration { start, .. } => start,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit { start, end } => write!(f, "{start}/{end}"),
            Self::Duration { start, duration } => write!(f, "{start}/{duration}"),
        }
    }
}

/// A parsed property value.
///
/// Closed tagged union over the RFC 5545 value types; property-name
/// defaulting and the VALUE parameter decide which arm a raw value lands in.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i32),
    Float(f64),
    Boolean(bool),
    Date(Date),
    DateTime(DateTime),
    DateList(Vec<Date>),
    DateTimeList(Vec<DateTime>),
    Time(Time),
    Duration(Duration),
    Period(Period),
    PeriodList(Vec<Period>),
    Recur(Box<RRule>),
    UtcOffset(UtcOffset),
    Uri(String),
    Binary(Vec<u8>),
    Unknown(String),
}

impl Value {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<&Date> {
        match self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<&DateTime> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date_list(&self) -> Option<&[Date]> {
        match self {
            Self::DateList(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime_list(&self) -> Option<&[DateTime]> {
        match self {
            Self::DateTimeList(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_duration(&self) -> Option<&Duration> {
        match self {
            Self::Duration(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_period_list(&self) -> Option<&[Period]> {
        match self {
            Self::PeriodList(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_recur(&self) -> Option<&RRule> {
        match self {
            Self::Recur(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Self::Uri(u) => Some(u),
            _ => None,
        }
    }

    /// The value as a date or date-time, when it is one of those.
    #[must_use]
    pub fn as_caldatetime(&self) -> Option<CalDateTime> {
        match self {
            Self::Date(d) => Some(CalDateTime::Date(*d)),
            Self::DateTime(dt) => Some(CalDateTime::DateTime(dt.clone())),
            _ => None,
        }
    }

    /// All dates/date-times in the value (single or list forms).
    #[must_use]
    pub fn caldatetimes(&self) -> Vec<CalDateTime> {
        match self {
            Self::Date(d) => vec![CalDateTime::Date(*d)],
            Self::DateTime(dt) => vec![CalDateTime::DateTime(dt.clone())],
            Self::DateList(ds) => ds.iter().map(|d| CalDateTime::Date(*d)).collect(),
            Self::DateTimeList(dts) => {
                dts.iter().map(|dt| CalDateTime::DateTime(dt.clone())).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Renders this value back to RFC 5545 content-line text.
    #[must_use]
    pub fn to_ical_string(&self) -> String {
        fn join<T: ToString>(items: &[T]) -> String {
            items.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
        }

        match self {
            Self::Text(s) => escape_text(s),
            Self::Integer(i) => i.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Self::Date(d) => d.to_string(),
            Self::DateTime(dt) => dt.to_string(),
            Self::DateList(ds) => join(ds),
            Self::DateTimeList(dts) => join(dts),
            Self::Time(t) => t.to_string(),
            Self::Duration(d) => d.to_string(),
            Self::Period(p) => p.to_string(),
            Self::PeriodList(ps) => join(ps),
            Self::Recur(r) => r.to_string(),
            Self::UtcOffset(o) => o.to_string(),
            Self::Uri(u) | Self::Unknown(u) => u.clone(),
            Self::Binary(data) => STANDARD.encode(data),
        }
    }
}
