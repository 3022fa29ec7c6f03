//! Component-tree parser.
//!
//! Assembles unfolded content lines into a [`Calendar`], typing each
//! property value by its VALUE parameter or the per-property default.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::core::{Calendar, CalDateTime, Component, ComponentKind, Property, Value};
use crate::parse::error::{ParseError, ParseErrorKind, ParseResult};
use crate::parse::lexer::{self, ContentLine};
use crate::parse::values;

/// Parses iCalendar text into a calendar.
///
/// The text must contain exactly one top-level VCALENDAR component.
#[tracing::instrument(skip_all, fields(len = text.len()))]
pub fn parse(text: &str) -> ParseResult<Calendar> {
    let lines = lexer::unfold(text);
    let mut stack: Vec<Component> = Vec::new();
    let mut root: Option<Component> = None;
    let mut last_line = 1;

    for (lineno, line) in &lines {
        last_line = *lineno;
        let cl = lexer::parse_content_line(line, *lineno)?;
        match cl.name.as_str() {
            "BEGIN" => stack.push(Component::custom(&cl.value)),
            "END" => {
                let comp = stack.pop().ok_or_else(|| {
                    ParseError::new(ParseErrorKind::MismatchedComponent, *lineno, 1)
                        .with_context(format!("END:{} without matching BEGIN", cl.value))
                })?;
                if !comp.name().eq_ignore_ascii_case(&cl.value) {
                    return Err(ParseError::new(
                        ParseErrorKind::MismatchedComponent,
                        *lineno,
                        1,
                    )
                    .with_context(format!("BEGIN:{} closed by END:{}", comp.name(), cl.value)));
                }
                match stack.last_mut() {
                    Some(parent) => parent.add_child(comp),
                    None => {
                        if root.is_some() {
                            return Err(ParseError::new(
                                ParseErrorKind::MismatchedComponent,
                                *lineno,
                                1,
                            )
                            .with_context("more than one top-level component"));
                        }
                        root = Some(comp);
                    }
                }
            }
            _ => {
                let parent = stack.last_mut().ok_or_else(|| {
                    ParseError::new(ParseErrorKind::MissingBegin, *lineno, 1)
                        .with_context(format!("property {} outside any component", cl.name))
                })?;
                parent.add_property(build_property(&cl)?);
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::new(ParseErrorKind::MissingEnd, last_line, 1)
            .with_context(format!("unclosed BEGIN:{}", open.name())));
    }
    let root = root.ok_or_else(|| {
        ParseError::new(ParseErrorKind::MissingBegin, 1, 1).with_context("no component found")
    })?;
    if root.kind() != ComponentKind::Calendar {
        return Err(ParseError::new(ParseErrorKind::MismatchedComponent, 1, 1)
            .with_context(format!("top-level component is {}, not VCALENDAR", root.name())));
    }
    Ok(Calendar::from_root(root))
}

/// How a property's raw value should be typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    DateOrDateTime,
    Time,
    Duration,
    Period,
    Recur,
    UtcOffset,
    Uri,
    Binary,
    Unknown,
}

/// Default value kind for a property name (RFC 5545 §3.8).
fn default_value_kind(name: &str) -> ValueKind {
    match name {
        "DTSTART" | "DTEND" | "DUE" | "RECURRENCE-ID" | "EXDATE" | "RDATE" => {
            ValueKind::DateOrDateTime
        }
        "DTSTAMP" | "CREATED" | "LAST-MODIFIED" | "COMPLETED" | "TZUNTIL" => ValueKind::DateTime,
        "DURATION" | "TRIGGER" => ValueKind::Duration,
        "FREEBUSY" => ValueKind::Period,
        "RRULE" | "EXRULE" => ValueKind::Recur,
        "TZOFFSETFROM" | "TZOFFSETTO" => ValueKind::UtcOffset,
        "SEQUENCE" | "PRIORITY" | "REPEAT" | "PERCENT-COMPLETE" => ValueKind::Integer,
        "ATTENDEE" | "ORGANIZER" | "URL" | "TZURL" | "ATTACH" => ValueKind::Uri,
        "SUMMARY" | "DESCRIPTION" | "LOCATION" | "COMMENT" | "STATUS" | "TRANSP" | "CLASS"
        | "UID" | "PRODID" | "VERSION" | "CALSCALE" | "METHOD" | "TZID" | "TZNAME"
        | "CATEGORIES" | "RESOURCES" | "CONTACT" | "RELATED-TO" | "ACTION" | "REQUEST-STATUS" => {
            ValueKind::Text
        }
        "GEO" => ValueKind::Float,
        _ if name.starts_with("X-") => ValueKind::Text,
        _ => ValueKind::Unknown,
    }
}

/// Value kind named by a VALUE parameter.
fn explicit_value_kind(value_param: &str) -> Option<ValueKind> {
    match value_param.to_ascii_uppercase().as_str() {
        "TEXT" => Some(ValueKind::Text),
        "INTEGER" => Some(ValueKind::Integer),
        "FLOAT" => Some(ValueKind::Float),
        "BOOLEAN" => Some(ValueKind::Boolean),
        "DATE" => Some(ValueKind::Date),
        "DATE-TIME" => Some(ValueKind::DateTime),
        "TIME" => Some(ValueKind::Time),
        "DURATION" => Some(ValueKind::Duration),
        "PERIOD" => Some(ValueKind::Period),
        "RECUR" => Some(ValueKind::Recur),
        "UTC-OFFSET" => Some(ValueKind::UtcOffset),
        "URI" | "CAL-ADDRESS" => Some(ValueKind::Uri),
        "BINARY" => Some(ValueKind::Binary),
        _ => None,
    }
}

fn build_property(cl: &ContentLine) -> ParseResult<Property> {
    let kind = cl
        .params
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case("VALUE"))
        .and_then(|p| p.value())
        .and_then(explicit_value_kind)
        .unwrap_or_else(|| default_value_kind(&cl.name));

    let tzid = cl
        .params
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case("TZID"))
        .and_then(|p| p.value());

    let multi = matches!(cl.name.as_str(), "EXDATE" | "RDATE" | "FREEBUSY");
    let value = typed_value(kind, &cl.value, tzid, multi, cl.line)?;
    Ok(Property::from_parts(&cl.name, cl.params.clone(), value, &cl.value))
}

fn typed_value(
    kind: ValueKind,
    raw: &str,
    tzid: Option<&str>,
    multi: bool,
    line: usize,
) -> ParseResult<Value> {
    Ok(match kind {
        ValueKind::Text => Value::Text(values::unescape_text(raw)),
        ValueKind::Integer => Value::Integer(values::parse_integer(raw, line)?),
        ValueKind::Float => {
            // GEO carries a lat;long pair; leave multi-part floats raw.
            match values::parse_float(raw, line) {
                Ok(f) => Value::Float(f),
                Err(_) => Value::Unknown(raw.to_owned()),
            }
        }
        ValueKind::Boolean => Value::Boolean(values::parse_boolean(raw, line)?),
        ValueKind::Date if multi => Value::DateList(
            raw.split(',').map(|v| values::parse_date(v, line)).collect::<ParseResult<_>>()?,
        ),
        ValueKind::Date => Value::Date(values::parse_date(raw, line)?),
        ValueKind::DateTime if multi => Value::DateTimeList(
            raw.split(',')
                .map(|v| values::parse_datetime(v, tzid, line))
                .collect::<ParseResult<_>>()?,
        ),
        ValueKind::DateTime => Value::DateTime(values::parse_datetime(raw, tzid, line)?),
        ValueKind::DateOrDateTime if multi => {
            let items: Vec<CalDateTime> = raw
                .split(',')
                .map(|v| values::parse_caldatetime(v, tzid, line))
                .collect::<ParseResult<_>>()?;
            if items.iter().all(CalDateTime::is_date_only) {
                Value::DateList(
                    items
                        .into_iter()
                        .filter_map(|i| match i {
                            CalDateTime::Date(d) => Some(d),
                            CalDateTime::DateTime(_) => None,
                        })
                        .collect(),
                )
            } else {
                Value::DateTimeList(
                    items
                        .into_iter()
                        .map(|i| match i {
                            CalDateTime::DateTime(dt) => Ok(dt),
                            CalDateTime::Date(_) => Err(ParseError::new(
                                ParseErrorKind::InvalidDateTime,
                                line,
                                1,
                            )
                            .with_context("mixed DATE and DATE-TIME entries")),
                        })
                        .collect::<ParseResult<_>>()?,
                )
            }
        }
        ValueKind::DateOrDateTime => match values::parse_caldatetime(raw, tzid, line)? {
            CalDateTime::Date(d) => Value::Date(d),
            CalDateTime::DateTime(dt) => Value::DateTime(dt),
        },
        ValueKind::Time => Value::Time(values::parse_time(raw, line)?),
        ValueKind::Duration => Value::Duration(values::parse_duration(raw, line)?),
        ValueKind::Period if multi => Value::PeriodList(
            raw.split(',')
                .map(|v| values::parse_period(v, tzid, line))
                .collect::<ParseResult<_>>()?,
        ),
        ValueKind::Period => Value::Period(values::parse_period(raw, tzid, line)?),
        ValueKind::Recur => Value::Recur(Box::new(values::parse_rrule(raw, line)?)),
        ValueKind::UtcOffset => Value::UtcOffset(values::parse_utc_offset(raw, line)?),
        ValueKind::Uri => Value::Uri(raw.to_owned()),
        ValueKind::Binary => Value::Binary(STANDARD.decode(raw).map_err(|_| {
            ParseError::new(ParseErrorKind::InvalidValue, line, 1)
                .with_context("invalid base64 data")
        })?),
        ValueKind::Unknown => Value::Unknown(raw.to_owned()),
    })
}
