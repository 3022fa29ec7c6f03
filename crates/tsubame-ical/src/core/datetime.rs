//! Date and time value types (RFC 5545 §3.3.4, §3.3.5, §3.3.12).

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A DATE value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    #[must_use]
    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Converts to a chrono date; None for impossible dates (e.g. Feb 30).
    #[must_use]
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))
    }

    #[must_use]
    pub fn from_naive(d: NaiveDate) -> Self {
        use chrono::Datelike;
        Self {
            year: u16::try_from(d.year()).unwrap_or(0),
            month: u8::try_from(d.month()).unwrap_or(1),
            day: u8::try_from(d.day()).unwrap_or(1),
        }
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

/// A TIME value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub is_utc: bool,
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}{:02}", self.hour, self.minute, self.second)?;
        if self.is_utc {
            write!(f, "Z")?;
        }
        Ok(())
    }
}

/// How a DATE-TIME value is anchored (RFC 5545 §3.3.5 forms 1-3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateTimeForm {
    /// Form 2: absolute UTC time (trailing `Z`).
    Utc,
    /// Form 1: floating local time, no zone.
    Floating,
    /// Form 3: local time in the named zone (TZID parameter).
    Zoned { tzid: String },
}

/// A DATE-TIME value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub form: DateTimeForm,
}

impl DateTime {
    #[must_use]
    pub const fn utc(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self { year, month, day, hour, minute, second, form: DateTimeForm::Utc }
    }

    #[must_use]
    pub const fn floating(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self { year, month, day, hour, minute, second, form: DateTimeForm::Floating }
    }

    #[must_use]
    pub fn zoned(
        tzid: impl Into<String>,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Self {
        Self { year, month, day, hour, minute, second, form: DateTimeForm::Zoned { tzid: tzid.into() } }
    }

    #[must_use]
    pub fn is_utc(&self) -> bool {
        self.form == DateTimeForm::Utc
    }

    #[must_use]
    pub fn is_floating(&self) -> bool {
        self.form == DateTimeForm::Floating
    }

    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match &self.form {
            DateTimeForm::Zoned { tzid } => Some(tzid),
            DateTimeForm::Utc | DateTimeForm::Floating => None,
        }
    }

    #[must_use]
    pub fn date(&self) -> Date {
        Date::new(self.year, self.month, self.day)
    }

    /// Local wall-clock value, ignoring the zone; None for impossible values.
    #[must_use]
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let date = self.date().to_naive()?;
        let time = NaiveTime::from_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )?;
        Some(NaiveDateTime::new(date, time))
    }

    #[must_use]
    pub fn from_utc(dt: chrono::DateTime<chrono::Utc>) -> Self {
        use chrono::{Datelike, Timelike};
        Self {
            year: u16::try_from(dt.year()).unwrap_or(0),
            month: u8::try_from(dt.month()).unwrap_or(1),
            day: u8::try_from(dt.day()).unwrap_or(1),
            hour: u8::try_from(dt.hour()).unwrap_or(0),
            minute: u8::try_from(dt.minute()).unwrap_or(0),
            second: u8::try_from(dt.second()).unwrap_or(0),
            form: DateTimeForm::Utc,
        }
    }

    /// Key for ordering values that share a zone (wall-clock order).
    #[must_use]
    pub fn naive_key(&self) -> (u16, u8, u8, u8, u8, u8) {
        (self.year, self.month, self.day, self.hour, self.minute, self.second)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}{:02}{:02}T{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.is_utc() {
            write!(f, "Z")?;
        }
        Ok(())
    }
}

/// A value that is either a DATE or a DATE-TIME.
///
/// DTSTART, DTEND, RECURRENCE-ID, EXDATE and RDATE all come in both forms,
/// and date-only-ness must survive instance derivation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CalDateTime {
    Date(Date),
    DateTime(DateTime),
}

impl CalDateTime {
    #[must_use]
    pub fn is_date_only(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match self {
            Self::Date(_) => None,
            Self::DateTime(dt) => dt.tzid(),
        }
    }

    /// Wall-clock value; dates map to midnight.
    #[must_use]
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(d) => Some(d.to_naive()?.and_hms_opt(0, 0, 0)?),
            Self::DateTime(dt) => dt.to_naive(),
        }
    }

    /// Key for ordering values that share a zone (wall-clock order).
    #[must_use]
    pub fn naive_key(&self) -> (u16, u8, u8, u8, u8, u8) {
        match self {
            Self::Date(d) => (d.year, d.month, d.day, 0, 0, 0),
            Self::DateTime(dt) => dt.naive_key(),
        }
    }
}

impl fmt::Display for CalDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => d.fmt(f),
            Self::DateTime(dt) => dt.fmt(f),
        }
    }
}

/// A UTC-OFFSET value (RFC 5545 §3.3.14).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtcOffset {
    seconds: i32,
}

impl UtcOffset {
    #[must_use]
    pub const fn from_seconds(seconds: i32) -> Self {
        Self { seconds }
    }

    #[must_use]
    pub const fn total_seconds(self) -> i32 {
        self.seconds
    }

    #[must_use]
    pub const fn hours(self) -> i32 {
        self.seconds / 3600
    }

    #[must_use]
    pub const fn minutes(self) -> i32 {
        (self.seconds.abs() % 3600) / 60
    }
}

impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.seconds < 0 { '-' } else { '+' };
        let abs = self.seconds.abs();
        write!(f, "{}{:02}{:02}", sign, abs / 3600, (abs % 3600) / 60)?;
        if abs % 60 != 0 {
            write!(f, "{:02}", abs % 60)?;
        }
        Ok(())
    }
}
