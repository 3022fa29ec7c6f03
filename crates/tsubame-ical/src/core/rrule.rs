//! RECUR value type (RFC 5545 §3.3.10).
//!
//! This is the *representation* of a recurrence rule: part storage,
//! rendering, and COUNT/UNTIL bookkeeping. Occurrence-set generation is
//! delegated to the `rrule` crate by the expansion engine.

use std::fmt;

use super::datetime::{Date, DateTime};

/// Recurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SECONDLY" => Some(Self::Secondly),
            "MINUTELY" => Some(Self::Minutely),
            "HOURLY" => Some(Self::Hourly),
            "DAILY" => Some(Self::Daily),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            "YEARLY" => Some(Self::Yearly),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secondly => "SECONDLY",
            Self::Minutely => "MINUTELY",
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Nominal seconds in one period of this frequency, used to estimate
    /// how many occurrences an UNTIL-bounded rule can produce.
    #[must_use]
    pub const fn period_seconds(self) -> i64 {
        match self {
            Self::Secondly => 1,
            Self::Minutely => 60,
            Self::Hourly => 3600,
            Self::Daily => 86_400,
            Self::Weekly => 7 * 86_400,
            Self::Monthly => 28 * 86_400,
            Self::Yearly => 365 * 86_400,
        }
    }
}

/// Weekday for BYDAY/WKST parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SU" => Some(Self::Sunday),
            "MO" => Some(Self::Monday),
            "TU" => Some(Self::Tuesday),
            "WE" => Some(Self::Wednesday),
            "TH" => Some(Self::Thursday),
            "FR" => Some(Self::Friday),
            "SA" => Some(Self::Saturday),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "SU",
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
        }
    }
}

/// BYDAY entry: weekday with optional ordinal (e.g. `MO`, `1MO`, `-1FR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayNum {
    pub ordinal: Option<i8>,
    pub weekday: Weekday,
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ord) = self.ordinal {
            write!(f, "{ord}")?;
        }
        write!(f, "{}", self.weekday.as_str())
    }
}

/// UNTIL bound: DATE or DATE-TIME, matching DTSTART's form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RRuleUntil {
    Date(Date),
    DateTime(DateTime),
}

impl fmt::Display for RRuleUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => d.fmt(f),
            Self::DateTime(dt) => dt.fmt(f),
        }
    }
}

/// A recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RRule {
    pub freq: Option<Frequency>,
    pub interval: Option<u32>,
    pub count: Option<u32>,
    pub until: Option<RRuleUntil>,
    pub wkst: Option<Weekday>,
    pub by_second: Vec<u8>,
    pub by_minute: Vec<u8>,
    pub by_hour: Vec<u8>,
    pub by_day: Vec<WeekdayNum>,
    pub by_monthday: Vec<i8>,
    pub by_yearday: Vec<i16>,
    pub by_weekno: Vec<i8>,
    pub by_month: Vec<u8>,
    pub by_setpos: Vec<i16>,
}

fn join<T: ToString>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

impl RRule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff the rule has neither COUNT nor UNTIL.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.count.is_none() && self.until.is_none()
    }

    /// Effective INTERVAL (defaults to 1).
    #[must_use]
    pub fn effective_interval(&self) -> u32 {
        self.interval.unwrap_or(1).max(1)
    }

    /// All parts as `(name, rendered value)` pairs, FREQ first.
    fn parts(&self) -> Vec<(&'static str, String)> {
        let mut parts = Vec::new();
        if let Some(freq) = self.freq {
            parts.push(("FREQ", freq.as_str().to_string()));
        }
        if let Some(interval) = self.interval {
            parts.push(("INTERVAL", interval.to_string()));
        }
        if let Some(count) = self.count {
            parts.push(("COUNT", count.to_string()));
        }
        if let Some(until) = &self.until {
            parts.push(("UNTIL", until.to_string()));
        }
        if !self.by_second.is_empty() {
            parts.push(("BYSECOND", join(&self.by_second)));
        }
        if !self.by_minute.is_empty() {
            parts.push(("BYMINUTE", join(&self.by_minute)));
        }
        if !self.by_hour.is_empty() {
            parts.push(("BYHOUR", join(&self.by_hour)));
        }
        if !self.by_day.is_empty() {
            parts.push(("BYDAY", join(&self.by_day)));
        }
        if !self.by_monthday.is_empty() {
            parts.push(("BYMONTHDAY", join(&self.by_monthday)));
        }
        if !self.by_yearday.is_empty() {
            parts.push(("BYYEARDAY", join(&self.by_yearday)));
        }
        if !self.by_weekno.is_empty() {
            parts.push(("BYWEEKNO", join(&self.by_weekno)));
        }
        if !self.by_month.is_empty() {
            parts.push(("BYMONTH", join(&self.by_month)));
        }
        if !self.by_setpos.is_empty() {
            parts.push(("BYSETPOS", join(&self.by_setpos)));
        }
        if let Some(wkst) = self.wkst {
            parts.push(("WKST", wkst.as_str().to_string()));
        }
        parts
    }

    /// Canonical rendering with parts ordered alphabetically by name,
    /// used by normalization for order-insensitive equality.
    #[must_use]
    pub fn to_canonical_string(&self) -> String {
        let mut parts = self.parts();
        parts.sort_by(|a, b| a.0.cmp(b.0));
        parts
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for RRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .parts()
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(";");
        f.write_str(&rendered)
    }
}
