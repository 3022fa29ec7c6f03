//! DURATION value type (RFC 5545 §3.3.6).

use std::fmt;

/// A nominal duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Duration {
    pub negative: bool,
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Duration {
    #[must_use]
    pub const fn zero() -> Self {
        Self { negative: false, weeks: 0, days: 0, hours: 0, minutes: 0, seconds: 0 }
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.weeks == 0 && self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }

    #[must_use]
    pub fn total_seconds(self) -> i64 {
        let secs = i64::from(self.weeks) * 7 * 86_400
            + i64::from(self.days) * 86_400
            + i64::from(self.hours) * 3600
            + i64::from(self.minutes) * 60
            + i64::from(self.seconds);
        if self.negative { -secs } else { secs }
    }

    #[must_use]
    pub fn to_chrono(self) -> chrono::Duration {
        chrono::Duration::seconds(self.total_seconds())
    }

    /// Builds from a (possibly negative) number of seconds, preferring the
    /// largest whole units.
    #[must_use]
    pub fn from_seconds(total: i64) -> Self {
        let negative = total < 0;
        let mut rest = total.unsigned_abs();
        let weeks = if rest % (7 * 86_400) == 0 { rest / (7 * 86_400) } else { 0 };
        rest -= weeks * 7 * 86_400;
        let days = rest / 86_400;
        rest %= 86_400;
        let hours = rest / 3600;
        rest %= 3600;
        let minutes = rest / 60;
        let seconds = rest % 60;
        Self {
            negative,
            weeks: u32::try_from(weeks).unwrap_or(u32::MAX),
            days: u32::try_from(days).unwrap_or(u32::MAX),
            hours: u32::try_from(hours).unwrap_or(0),
            minutes: u32::try_from(minutes).unwrap_or(0),
            seconds: u32::try_from(seconds).unwrap_or(0),
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "P")?;
        if self.weeks > 0 {
            return write!(f, "{}W", self.weeks);
        }
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.hours > 0 || self.minutes > 0 || self.seconds > 0 {
            write!(f, "T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds > 0 {
                write!(f, "{}S", self.seconds)?;
            }
        } else if self.days == 0 {
            // Zero duration still needs a time part to be well-formed.
            write!(f, "T0S")?;
        }
        Ok(())
    }
}
