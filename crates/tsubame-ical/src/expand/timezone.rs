//! TZID resolution and local→UTC conversion.

use chrono::{DateTime as ChronoDateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::core::{CalDateTime, Calendar, DateTime, DateTimeForm};
use crate::error::{IcalError, IcalResult};
use crate::expand::vtimezone::TimezoneModel;

/// Resolves a TZID string to an IANA zone.
///
/// Vendor TZIDs often wrap an Olson name in a path prefix
/// (`/mozilla.org/20070129_1/America/New_York`); the fallback scans path
/// suffixes for a resolvable name.
#[must_use]
pub fn resolve_tzid(tzid: &str) -> Option<Tz> {
    if let Ok(tz) = tzid.parse::<Tz>() {
        return Some(tz);
    }
    let trimmed = tzid.trim_start_matches('/');
    let parts: Vec<&str> = trimmed.split('/').collect();
    for skip in 1..parts.len() {
        if let Ok(tz) = parts[skip..].join("/").parse::<Tz>() {
            return Some(tz);
        }
    }
    None
}

/// Converts a wall-clock time in `tz` to UTC.
///
/// Ambiguous times (DST fold) take the earlier offset; nonexistent times
/// (DST gap) are shifted forward past the gap.
#[must_use]
pub fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> ChronoDateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = naive + chrono::Duration::hours(1);
            match tz.from_local_datetime(&shifted) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                    dt.with_timezone(&Utc)
                }
                LocalResult::None => Utc.from_utc_datetime(&naive),
            }
        }
    }
}

/// How a TZID resolves for a given calendar.
#[derive(Debug, Clone)]
pub enum ZoneSource {
    Iana(Tz),
    Embedded(TimezoneModel),
}

/// Per-calendar timezone resolver.
///
/// IANA names win; TZIDs that only match an embedded VTIMEZONE fall back to
/// its offset rules. Built once per expansion pass from an immutable borrow
/// of the tree.
#[derive(Debug, Clone, Default)]
pub struct TzResolver {
    embedded: Vec<(String, TimezoneModel)>,
}

impl TzResolver {
    #[must_use]
    pub fn from_calendar(cal: &Calendar) -> Self {
        let mut embedded = Vec::new();
        for vtz in cal.timezones() {
            if let Some(tzid) = vtz.get_property("TZID").and_then(|p| p.as_text()) {
                if let Some(model) = TimezoneModel::from_component(vtz) {
                    embedded.push((tzid.to_owned(), model));
                }
            }
        }
        Self { embedded }
    }

    fn zone(&self, tzid: &str) -> IcalResult<ZoneSource> {
        if let Some(tz) = resolve_tzid(tzid) {
            return Ok(ZoneSource::Iana(tz));
        }
        self.embedded
            .iter()
            .find(|(id, _)| id == tzid)
            .map(|(_, model)| ZoneSource::Embedded(model.clone()))
            .ok_or_else(|| IcalError::UnknownTimezone(tzid.to_owned()))
    }

    /// The IANA zone for a TZID, when it has one.
    #[must_use]
    pub fn iana(&self, tzid: &str) -> Option<Tz> {
        resolve_tzid(tzid)
    }

    /// Converts a DATE-TIME value to a UTC instant.
    ///
    /// Floating times are interpreted as UTC, matching how the rest of the
    /// engine orders mixed-form recurrence sets.
    pub fn datetime_to_utc(&self, dt: &DateTime) -> IcalResult<ChronoDateTime<Utc>> {
        let naive = dt.to_naive().ok_or_else(|| {
            IcalError::InvalidCalendarData(format!("impossible date-time value: {dt}"))
        })?;
        match &dt.form {
            DateTimeForm::Utc | DateTimeForm::Floating => Ok(Utc.from_utc_datetime(&naive)),
            DateTimeForm::Zoned { tzid } => match self.zone(tzid)? {
                ZoneSource::Iana(tz) => Ok(local_to_utc(naive, tz)),
                ZoneSource::Embedded(model) => {
                    let offset = model.offset_at(naive);
                    Ok(Utc.from_utc_datetime(&naive)
                        - chrono::Duration::seconds(i64::from(offset.total_seconds())))
                }
            },
        }
    }

    /// Converts a DATE or DATE-TIME to a UTC instant; dates map to midnight.
    pub fn to_utc(&self, value: &CalDateTime) -> IcalResult<ChronoDateTime<Utc>> {
        match value {
            CalDateTime::Date(d) => {
                let naive = d.to_naive().and_then(|d| d.and_hms_opt(0, 0, 0)).ok_or_else(
                    || IcalError::InvalidCalendarData(format!("impossible date value: {d}")),
                )?;
                Ok(Utc.from_utc_datetime(&naive))
            }
            CalDateTime::DateTime(dt) => self.datetime_to_utc(dt),
        }
    }
}
