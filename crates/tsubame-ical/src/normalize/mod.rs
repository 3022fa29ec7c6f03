//! Normalization for change detection and semantic comparison.
//!
//! Clients round-trip calendar data through their own serializers, which
//! reorder RRULE parts, expand default parameters, and re-anchor date-times
//! in different zones without changing meaning. Normalizing both sides
//! before comparing keeps those no-op edits from looking like changes.

use tsubame_core::constants;

use crate::core::{Calendar, Component, ComponentKind, Parameter, Property, Value};
use crate::error::{IcalError, IcalResult};
use crate::expand::TzResolver;

/// Properties whose zoned date-time values are rewritten to UTC.
const ANCHORED_PROPS: [&str; 4] = ["DTSTART", "DTEND", "DUE", "RECURRENCE-ID"];

impl Calendar {
    /// Normalizes the whole calendar in place.
    ///
    /// RRULE parts are ordered alphabetically, EXDATE/RDATE value lists are
    /// sorted, default parameter values are dropped, and zoned date-times
    /// are rewritten to UTC with the original TZID kept under
    /// `X-VOBJ-ORIGINAL-TZID`. Idempotent. VTIMEZONE subtrees are left
    /// untouched so the zone definitions keep matching any TZIDs that could
    /// not be rewritten.
    #[tracing::instrument(skip(self))]
    pub fn normalize_all(&mut self) -> IcalResult<()> {
        let resolver = TzResolver::from_calendar(self);
        for child in self.root_mut().children_mut() {
            if child.kind() != ComponentKind::Timezone {
                normalize_component(child, &resolver)?;
            }
        }
        Ok(())
    }

    /// Drops ATTACH properties that point into the component's declared
    /// managed-attachment collection (X-APPLE-DROPBOX). Those URLs carry
    /// server-assigned ids and churn on every store.
    pub fn normalize_attachments(&mut self) {
        for child in self.root_mut().children_mut() {
            let Some(dropbox) = child
                .get_property(constants::DROPBOX)
                .map(|p| p.raw_value().to_owned())
            else {
                continue;
            };
            child
                .properties_mut()
                .retain(|p| !(p.name == "ATTACH" && p.raw_value().starts_with(&dropbox)));
        }
    }

    /// Whether two calendars carry the same data once normalized.
    ///
    /// Both sides are cloned, normalized, and compared in a canonical
    /// rendering that ignores property and child order.
    #[must_use]
    pub fn same_calendar_data(&self, other: &Self) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        if a.normalize_all().is_err() || b.normalize_all().is_err() {
            // Unresolvable zone data on either side: fall back to exact text.
            return self.serialized() == other.serialized();
        }
        canonical_text(a.root()) == canonical_text(b.root())
    }
}

fn normalize_component(comp: &mut Component, resolver: &TzResolver) -> IcalResult<()> {
    for prop in comp.properties_mut() {
        drop_default_params(prop);
        match prop.value().clone() {
            Value::Recur(rrule) => {
                let canonical = rrule.to_canonical_string();
                if prop.raw_value() != canonical {
                    prop.set_value_with_raw(Value::Recur(rrule), canonical);
                }
            }
            Value::DateList(_) | Value::DateTimeList(_)
                if prop.name == "EXDATE" || prop.name == "RDATE" =>
            {
                sort_value_list(prop);
            }
            Value::DateTime(dt)
                if dt.tzid().is_some() && ANCHORED_PROPS.contains(&prop.name.as_str()) =>
            {
                rewrite_to_utc(prop, resolver)?;
            }
            _ => {}
        }
    }
    for child in comp.children_mut() {
        normalize_component(child, resolver)?;
    }
    Ok(())
}

/// Parameter values that RFC 5545 defines as defaults; their presence or
/// absence is not a semantic difference.
fn drop_default_params(prop: &mut Property) {
    if prop
        .param_value("VALUE")
        .is_some_and(|v| v.eq_ignore_ascii_case("DATE-TIME"))
    {
        prop.remove_param("VALUE");
    }
    if prop.name == "ATTENDEE" {
        if prop.param_value("RSVP").is_some_and(|v| v.eq_ignore_ascii_case("FALSE")) {
            prop.remove_param("RSVP");
        }
        if prop
            .param_value("PARTSTAT")
            .is_some_and(|v| v.eq_ignore_ascii_case("NEEDS-ACTION"))
        {
            prop.remove_param("PARTSTAT");
        }
    }
}

fn sort_value_list(prop: &mut Property) {
    let sorted = match prop.value().clone() {
        Value::DateList(mut dates) => {
            dates.sort_unstable();
            Value::DateList(dates)
        }
        Value::DateTimeList(mut dts) => {
            dts.sort_by_key(crate::core::DateTime::naive_key);
            Value::DateTimeList(dts)
        }
        _ => return,
    };
    if &sorted != prop.value() {
        prop.set_value(sorted);
    }
}

fn rewrite_to_utc(prop: &mut Property, resolver: &TzResolver) -> IcalResult<()> {
    let Value::DateTime(dt) = prop.value().clone() else { return Ok(()) };
    let Some(tzid) = dt.tzid().map(str::to_owned) else { return Ok(()) };
    let utc = match resolver.datetime_to_utc(&dt) {
        Ok(utc) => utc,
        // A TZID we cannot resolve keeps its zoned form; the VTIMEZONE that
        // defines it also stays in the tree.
        Err(IcalError::UnknownTimezone(_)) => return Ok(()),
        Err(e) => return Err(e),
    };
    prop.set_value(Value::DateTime(crate::core::DateTime::from_utc(utc)));
    prop.remove_param("TZID");
    prop.set_param(Parameter::new(constants::ORIGINAL_TZID_PARAM, tzid));
    Ok(())
}

/// Canonical rendering for comparison: properties and children sorted by
/// their rendered text. Not valid iCalendar; comparison use only.
fn canonical_text(comp: &Component) -> String {
    let mut lines: Vec<String> = comp
        .properties()
        .iter()
        .map(crate::build::serialize_property)
        .collect();
    lines.sort_unstable();
    let mut children: Vec<String> = comp.children().iter().map(canonical_text).collect();
    children.sort_unstable();

    let mut out = format!("BEGIN:{}\n", comp.name());
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    for child in children {
        out.push_str(&child);
    }
    out.push_str(&format!("END:{}\n", comp.name()));
    out
}
