//! Value-type parsers (RFC 5545 §3.3).

use crate::core::{
    CalDateTime, Date, DateTime, Duration, Frequency, Period, RRule, RRuleUntil, Time, UtcOffset,
    Weekday, WeekdayNum,
};
use crate::parse::error::{ParseError, ParseErrorKind, ParseResult};

/// Unescapes a TEXT value (RFC 5545 §3.3.11).
#[must_use]
pub fn unescape_text(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_owned();
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') | Some('N') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Parses a DATE value (`YYYYMMDD`).
pub fn parse_date(s: &str, line: usize) -> ParseResult<Date> {
    let err = || ParseError::new(ParseErrorKind::InvalidDate, line, 1).with_context(s.to_owned());
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }
    let year: u16 = s[0..4].parse().map_err(|_| err())?;
    let month: u8 = s[4..6].parse().map_err(|_| err())?;
    let day: u8 = s[6..8].parse().map_err(|_| err())?;
    let date = Date::new(year, month, day);
    if date.to_naive().is_none() {
        return Err(err());
    }
    Ok(date)
}

/// Parses a TIME value (`HHMMSS` with optional trailing `Z`).
pub fn parse_time(s: &str, line: usize) -> ParseResult<Time> {
    let err = || ParseError::new(ParseErrorKind::InvalidTime, line, 1).with_context(s.to_owned());
    let (digits, is_utc) = match s.strip_suffix('Z') {
        Some(rest) => (rest, true),
        None => (s, false),
    };
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }
    let hour: u8 = digits[0..2].parse().map_err(|_| err())?;
    let minute: u8 = digits[2..4].parse().map_err(|_| err())?;
    let second: u8 = digits[4..6].parse().map_err(|_| err())?;
    if hour > 23 || minute > 59 || second > 60 {
        return Err(err());
    }
    Ok(Time { hour, minute, second, is_utc })
}

/// Parses a DATE-TIME value. A `tzid` (from the TZID parameter) makes the
/// result zoned; a trailing `Z` makes it UTC; otherwise it floats.
pub fn parse_datetime(s: &str, tzid: Option<&str>, line: usize) -> ParseResult<DateTime> {
    let err =
        || ParseError::new(ParseErrorKind::InvalidDateTime, line, 1).with_context(s.to_owned());
    let (date_part, time_part) = s.split_once('T').ok_or_else(err)?;
    let date = parse_date(date_part, line).map_err(|_| err())?;
    let time = parse_time(time_part, line).map_err(|_| err())?;
    let mut dt = match tzid {
        // A trailing Z wins over TZID, matching the more common interop bug.
        _ if time.is_utc => DateTime::utc(date.year, date.month, date.day, 0, 0, 0),
        Some(tzid) => DateTime::zoned(tzid, date.year, date.month, date.day, 0, 0, 0),
        None => DateTime::floating(date.year, date.month, date.day, 0, 0, 0),
    };
    dt.hour = time.hour;
    dt.minute = time.minute;
    dt.second = time.second;
    Ok(dt)
}

/// Parses a value that may be DATE or DATE-TIME, deciding by shape.
pub fn parse_caldatetime(s: &str, tzid: Option<&str>, line: usize) -> ParseResult<CalDateTime> {
    if s.contains('T') {
        Ok(CalDateTime::DateTime(parse_datetime(s, tzid, line)?))
    } else {
        Ok(CalDateTime::Date(parse_date(s, line)?))
    }
}

/// Parses a DURATION value (`[+/-]P[nW | nD][T nH nM nS]`).
pub fn parse_duration(s: &str, line: usize) -> ParseResult<Duration> {
    let err =
        || ParseError::new(ParseErrorKind::InvalidDuration, line, 1).with_context(s.to_owned());
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let rest = rest.strip_prefix('P').ok_or_else(err)?;

    let mut duration = Duration { negative, ..Duration::zero() };
    let mut in_time = false;
    let mut saw_unit = false;
    let mut digits = String::new();
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'T' | 't' if digits.is_empty() => in_time = true,
            _ => {
                let n: u32 = digits.parse().map_err(|_| err())?;
                digits.clear();
                saw_unit = true;
                match (c.to_ascii_uppercase(), in_time) {
                    ('W', false) => duration.weeks = n,
                    ('D', false) => duration.days = n,
                    ('H', true) => duration.hours = n,
                    ('M', true) => duration.minutes = n,
                    ('S', true) => duration.seconds = n,
                    _ => return Err(err()),
                }
            }
        }
    }
    if !digits.is_empty() || !saw_unit {
        return Err(err());
    }
    Ok(duration)
}

/// Parses a PERIOD value (`start/end` or `start/duration`).
pub fn parse_period(s: &str, tzid: Option<&str>, line: usize) -> ParseResult<Period> {
    let err = || ParseError::new(ParseErrorKind::InvalidPeriod, line, 1).with_context(s.to_owned());
    let (start_part, rest) = s.split_once('/').ok_or_else(err)?;
    let start = parse_datetime(start_part, tzid, line)?;
    if rest.starts_with('P') || rest.starts_with('+') || rest.starts_with('-') {
        let duration = parse_duration(rest, line)?;
        Ok(Period::Duration { start, duration })
    } else {
        let end = parse_datetime(rest, tzid, line)?;
        Ok(Period::Explicit { start, end })
    }
}

/// Parses a UTC-OFFSET value (`±HHMM[SS]`).
pub fn parse_utc_offset(s: &str, line: usize) -> ParseResult<UtcOffset> {
    let err =
        || ParseError::new(ParseErrorKind::InvalidUtcOffset, line, 1).with_context(s.to_owned());
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(err()),
    };
    if !(digits.len() == 4 || digits.len() == 6) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }
    let hours: i32 = digits[0..2].parse().map_err(|_| err())?;
    let minutes: i32 = digits[2..4].parse().map_err(|_| err())?;
    let seconds: i32 = if digits.len() == 6 { digits[4..6].parse().map_err(|_| err())? } else { 0 };
    if minutes > 59 || seconds > 59 {
        return Err(err());
    }
    Ok(UtcOffset::from_seconds(sign * (hours * 3600 + minutes * 60 + seconds)))
}

pub fn parse_integer(s: &str, line: usize) -> ParseResult<i32> {
    s.trim().parse().map_err(|_| {
        ParseError::new(ParseErrorKind::InvalidInteger, line, 1).with_context(s.to_owned())
    })
}

pub fn parse_float(s: &str, line: usize) -> ParseResult<f64> {
    s.trim().parse().map_err(|_| {
        ParseError::new(ParseErrorKind::InvalidFloat, line, 1).with_context(s.to_owned())
    })
}

pub fn parse_boolean(s: &str, line: usize) -> ParseResult<bool> {
    match s.to_ascii_uppercase().as_str() {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(ParseError::new(ParseErrorKind::InvalidBoolean, line, 1)
            .with_context(s.to_owned())),
    }
}

/// Parses a RECUR value (`FREQ=...;COUNT=...;BYDAY=...`).
pub fn parse_rrule(s: &str, line: usize) -> ParseResult<RRule> {
    let mut rrule = RRule::new();
    for part in s.split(';') {
        if part.is_empty() {
            continue;
        }
        let (name, value) = part.split_once('=').ok_or_else(|| {
            ParseError::new(ParseErrorKind::InvalidRRule, line, 1).with_context(part.to_owned())
        })?;
        parse_rrule_part(&mut rrule, &name.to_ascii_uppercase(), value, line)?;
    }
    if rrule.freq.is_none() {
        return Err(ParseError::new(ParseErrorKind::InvalidRRule, line, 1)
            .with_context("missing FREQ part"));
    }
    if rrule.count.is_some() && rrule.until.is_some() {
        return Err(ParseError::new(ParseErrorKind::UntilCountConflict, line, 1)
            .with_context(s.to_owned()));
    }
    Ok(rrule)
}

fn parse_rrule_part(rrule: &mut RRule, name: &str, value: &str, line: usize) -> ParseResult<()> {
    let invalid = || {
        ParseError::new(ParseErrorKind::InvalidRRule, line, 1)
            .with_context(format!("{name}={value}"))
    };
    match name {
        "FREQ" => {
            rrule.freq = Some(Frequency::parse(value).ok_or_else(|| {
                ParseError::new(ParseErrorKind::InvalidFrequency, line, 1)
                    .with_context(value.to_owned())
            })?);
        }
        "INTERVAL" => rrule.interval = Some(value.parse().map_err(|_| invalid())?),
        "COUNT" => rrule.count = Some(value.parse().map_err(|_| invalid())?),
        "UNTIL" => {
            rrule.until = Some(if value.contains('T') {
                RRuleUntil::DateTime(parse_datetime(value, None, line)?)
            } else {
                RRuleUntil::Date(parse_date(value, line)?)
            });
        }
        "WKST" => {
            rrule.wkst = Some(Weekday::parse(value).ok_or_else(|| {
                ParseError::new(ParseErrorKind::InvalidWeekday, line, 1)
                    .with_context(value.to_owned())
            })?);
        }
        "BYSECOND" => rrule.by_second = parse_num_list(value).ok_or_else(invalid)?,
        "BYMINUTE" => rrule.by_minute = parse_num_list(value).ok_or_else(invalid)?,
        "BYHOUR" => rrule.by_hour = parse_num_list(value).ok_or_else(invalid)?,
        "BYDAY" => {
            let mut days = Vec::new();
            for entry in value.split(',') {
                days.push(parse_weekdaynum(entry, line)?);
            }
            rrule.by_day = days;
        }
        "BYMONTHDAY" => rrule.by_monthday = parse_num_list(value).ok_or_else(invalid)?,
        "BYYEARDAY" => rrule.by_yearday = parse_num_list(value).ok_or_else(invalid)?,
        "BYWEEKNO" => rrule.by_weekno = parse_num_list(value).ok_or_else(invalid)?,
        "BYMONTH" => rrule.by_month = parse_num_list(value).ok_or_else(invalid)?,
        "BYSETPOS" => rrule.by_setpos = parse_num_list(value).ok_or_else(invalid)?,
        // Unknown parts are tolerated and dropped.
        _ => {}
    }
    Ok(())
}

fn parse_num_list<T: std::str::FromStr>(value: &str) -> Option<Vec<T>> {
    value.split(',').map(|v| v.parse().ok()).collect()
}

fn parse_weekdaynum(s: &str, line: usize) -> ParseResult<WeekdayNum> {
    let err =
        || ParseError::new(ParseErrorKind::InvalidWeekday, line, 1).with_context(s.to_owned());
    if s.len() < 2 {
        return Err(err());
    }
    let split = s.len() - 2;
    let (ord_part, day_part) = s.split_at(split);
    let ordinal = if ord_part.is_empty() {
        None
    } else {
        Some(ord_part.parse::<i8>().map_err(|_| err())?)
    };
    let weekday = Weekday::parse(day_part).ok_or_else(err)?;
    Ok(WeekdayNum { ordinal, weekday })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_rejects_impossible() {
        assert!(parse_date("20110230", 1).is_err());
        assert!(parse_date("20110131", 1).is_ok());
    }

    #[test]
    fn datetime_forms() {
        let utc = parse_datetime("20110125T154522Z", None, 1).unwrap();
        assert!(utc.is_utc());
        let zoned = parse_datetime("20110125T104522", Some("America/New_York"), 1).unwrap();
        assert_eq!(zoned.tzid(), Some("America/New_York"));
        let floating = parse_datetime("20110125T104522", None, 1).unwrap();
        assert!(floating.is_floating());
    }

    #[test]
    fn duration_forms() {
        let d = parse_duration("P15DT5H0M20S", 1).unwrap();
        assert_eq!((d.days, d.hours, d.seconds), (15, 5, 20));
        let w = parse_duration("P7W", 1).unwrap();
        assert_eq!(w.weeks, 7);
        let neg = parse_duration("-PT30M", 1).unwrap();
        assert!(neg.negative);
        assert_eq!(neg.minutes, 30);
        assert!(parse_duration("P", 1).is_err());
    }

    #[test]
    fn period_forms() {
        let p = parse_period("19970101T180000Z/19970102T070000Z", None, 1).unwrap();
        assert!(matches!(p, Period::Explicit { .. }));
        let p = parse_period("19970101T180000Z/PT5H30M", None, 1).unwrap();
        assert!(matches!(p, Period::Duration { .. }));
    }

    #[test]
    fn utc_offset_forms() {
        assert_eq!(parse_utc_offset("-0500", 1).unwrap().total_seconds(), -18_000);
        assert_eq!(parse_utc_offset("+013045", 1).unwrap().total_seconds(), 5445);
        assert!(parse_utc_offset("0500", 1).is_err());
    }

    #[test]
    fn rrule_parts() {
        let r = parse_rrule("FREQ=WEEKLY;COUNT=10;BYDAY=MO,-1FR", 1).unwrap();
        assert_eq!(r.freq, Some(Frequency::Weekly));
        assert_eq!(r.count, Some(10));
        assert_eq!(r.by_day[1].ordinal, Some(-1));
    }

    #[test]
    fn rrule_until_count_conflict() {
        let err = parse_rrule("FREQ=DAILY;COUNT=3;UNTIL=20110201T000000Z", 1).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UntilCountConflict);
    }

    #[test]
    fn text_unescaping() {
        assert_eq!(unescape_text("a\\, b\\; c\\nnext"), "a, b; c\nnext");
    }
}
