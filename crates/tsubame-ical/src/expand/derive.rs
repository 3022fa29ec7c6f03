//! Synthesizing override components for generated instances.

use crate::core::{CalDateTime, Calendar, Component, ComponentKind, Date, Property};
use crate::error::IcalResult;
use crate::expand::instance::master_rids;
use crate::expand::timezone::TzResolver;

/// Shifts a date or date-time by a wall-clock delta, preserving its form.
pub(crate) fn offset_by(value: &CalDateTime, delta: chrono::Duration) -> Option<CalDateTime> {
    match value {
        CalDateTime::Date(d) => {
            let shifted = (d.to_naive()?.and_hms_opt(0, 0, 0)? + delta).date();
            Some(CalDateTime::Date(Date::from_naive(shifted)))
        }
        CalDateTime::DateTime(dt) => {
            use chrono::{Datelike, Timelike};
            let shifted = dt.to_naive()? + delta;
            let mut out = dt.clone();
            out.year = u16::try_from(shifted.year()).ok()?;
            out.month = u8::try_from(shifted.month()).ok()?;
            out.day = u8::try_from(shifted.day()).ok()?;
            out.hour = u8::try_from(shifted.hour()).ok()?;
            out.minute = u8::try_from(shifted.minute()).ok()?;
            out.second = u8::try_from(shifted.second()).ok()?;
            Some(CalDateTime::DateTime(out))
        }
    }
}

/// Wall-clock span of a component (DTEND/DUE, DURATION, or the defaults).
fn wall_clock_span(comp: &Component, dtstart: &CalDateTime) -> chrono::Duration {
    if let (Some(end), Some(start)) = (comp.dtend().and_then(|e| e.to_naive()), dtstart.to_naive())
    {
        return end - start;
    }
    if let Some(duration) = comp.duration_value() {
        return duration.to_chrono();
    }
    if dtstart.is_date_only() {
        chrono::Duration::days(1)
    } else {
        chrono::Duration::zero()
    }
}

impl Calendar {
    /// Synthesizes an override component for the instance at `rid`.
    ///
    /// Returns None when `rid` is not a generated occurrence. An EXDATE'd
    /// `rid` yields a STATUS:CANCELLED derivation only with
    /// `allow_cancelled`. A `template` (typically a previous derivation) is
    /// reused in place of a fresh master copy for bulk derivation.
    pub fn derive_instance(
        &self,
        rid: &CalDateTime,
        allow_cancelled: bool,
        template: Option<Component>,
    ) -> IcalResult<Option<Component>> {
        let resolver = TzResolver::from_calendar(self);
        let Some(master) = self.master_component() else {
            return Ok(None);
        };
        let Some(dtstart) = master.dtstart() else {
            return Ok(None);
        };
        let rid_utc = resolver.to_utc(rid)?;
        let limit = rid_utc + chrono::Duration::seconds(1);

        let generated = master_rids(master, &resolver, &dtstart, Some(limit))?;
        let mut cancelled = false;
        if !generated.contains(&rid_utc) {
            let mut exdates = Vec::new();
            for prop in master.get_properties("EXDATE") {
                for v in prop.value().caldatetimes() {
                    exdates.push(resolver.to_utc(&v)?);
                }
            }
            if allow_cancelled && exdates.contains(&rid_utc) {
                cancelled = true;
            } else {
                return Ok(None);
            }
        }

        let mut derived = template.unwrap_or_else(|| master.clone());
        for name in ["RRULE", "RDATE", "EXDATE", "EXRULE"] {
            derived.remove_properties(name);
        }
        derived.replace_property(Property::caldatetime("RECURRENCE-ID", rid));

        let span = wall_clock_span(master, &dtstart);
        derived.replace_property(Property::caldatetime("DTSTART", rid));
        let end_name =
            if master.kind() == ComponentKind::Todo && master.has_property("DUE") {
                Some("DUE")
            } else if master.has_property("DTEND") {
                Some("DTEND")
            } else {
                None
            };
        if let Some(end_name) = end_name {
            if let Some(end) = offset_by(rid, span) {
                derived.remove_properties("DTEND");
                derived.remove_properties("DUE");
                derived.add_property(Property::caldatetime(end_name, &end));
            }
        }

        if cancelled {
            derived.replace_property(Property::text("STATUS", "CANCELLED"));
        }
        Ok(Some(derived))
    }
}
