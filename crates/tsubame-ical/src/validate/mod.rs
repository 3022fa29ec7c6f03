//! Validation and auto-repair of calendar data.
//!
//! The repair rules encode client-interop lessons: date/date-time UNTIL
//! mismatches, EXDATEs left behind by series splits, and overrides whose
//! RECURRENCE-ID no longer matches any generated occurrence.

pub mod caldav;

use std::collections::BTreeSet;

use chrono::{DateTime as UtcDateTime, Utc};

use crate::core::{CalDateTime, Calendar, Component, DateTime, Property, RRuleUntil, Value};
use crate::error::{IcalError, IcalResult};
use crate::expand::{TzResolver, list_utc, master_rids, rule_rids};

/// Collapses a homogeneous date/date-time list back into a property value.
fn caldatetime_list_value(values: Vec<CalDateTime>) -> Value {
    if values.iter().all(CalDateTime::is_date_only) {
        Value::DateList(
            values
                .into_iter()
                .filter_map(|v| match v {
                    CalDateTime::Date(d) => Some(d),
                    CalDateTime::DateTime(_) => None,
                })
                .collect(),
        )
    } else {
        Value::DateTimeList(
            values
                .into_iter()
                .filter_map(|v| match v {
                    CalDateTime::DateTime(dt) => Some(dt),
                    CalDateTime::Date(_) => None,
                })
                .collect(),
        )
    }
}

impl Calendar {
    /// Validates (and optionally repairs) the calendar data.
    ///
    /// With `do_fix`, returns the fix reports and the defects that could not
    /// be repaired; without it, the first defect found is an
    /// `InvalidCalendarData` error and the tree is left untouched. UID
    /// disagreement between components is always a hard failure.
    #[tracing::instrument(skip(self))]
    pub fn valid_calendar_data(
        &mut self,
        do_fix: bool,
        validate_recurrences: bool,
    ) -> IcalResult<(Vec<String>, Vec<String>)> {
        let mut fixed = Vec::new();
        let mut unfixed = Vec::new();

        self.check_single_uid()?;
        self.check_duplicates(do_fix, &mut unfixed)?;
        self.fix_rrule_until(do_fix, &mut fixed)?;
        self.fix_earlier_exdates(do_fix, &mut fixed)?;
        if validate_recurrences {
            self.fix_invalid_overrides(do_fix, &mut fixed)?;
        }

        Ok((fixed, unfixed))
    }

    /// All schedulable components must agree on one UID.
    fn check_single_uid(&self) -> IcalResult<()> {
        let uids: BTreeSet<&str> = self
            .root()
            .children()
            .iter()
            .filter(|c| c.kind().is_schedulable())
            .filter_map(Component::uid)
            .collect();
        if uids.len() > 1 {
            return Err(IcalError::InvalidCalendarData(
                "calendar resources may not contain components with different UIDs".into(),
            ));
        }
        Ok(())
    }

    /// More than one master, or two overrides sharing a RECURRENCE-ID, is a
    /// defect with no safe automatic repair.
    fn check_duplicates(&self, do_fix: bool, unfixed: &mut Vec<String>) -> IcalResult<()> {
        let mut defects = Vec::new();
        let masters = self.root().children().iter().filter(|c| c.is_master()).count();
        if masters > 1 {
            defects.push("More than one master component".to_string());
        }
        let mut seen = BTreeSet::new();
        for comp in self.override_components() {
            if let Some(rid) = comp.recurrence_id() {
                let key = rid.to_string();
                if !seen.insert(key.clone()) {
                    defects.push(format!("Duplicate RECURRENCE-ID: {key}"));
                }
            }
        }
        if !do_fix {
            if let Some(first) = defects.first() {
                return Err(IcalError::InvalidCalendarData(first.clone()));
            }
        }
        unfixed.extend(defects);
        Ok(())
    }

    /// RRULE UNTIL must match DTSTART's value type (RFC 5545 §3.3.10); the
    /// repair converts UNTIL, applying DTSTART's time and zone when going
    /// from date to date-time.
    fn fix_rrule_until(&mut self, do_fix: bool, fixed: &mut Vec<String>) -> IcalResult<()> {
        let resolver = TzResolver::from_calendar(self);
        let Some(master) = self.master_component() else { return Ok(()) };
        let Some(dtstart) = master.dtstart() else { return Ok(()) };

        let mut rewrites: Vec<Option<(RRuleUntil, String)>> = Vec::new();
        for prop in master.get_properties("RRULE") {
            let Some(rrule) = prop.value().as_recur() else {
                rewrites.push(None);
                continue;
            };
            let new_until = match (&rrule.until, &dtstart) {
                (Some(RRuleUntil::Date(d)), CalDateTime::DateTime(start)) => {
                    let mut local = start.clone();
                    local.year = d.year;
                    local.month = d.month;
                    local.day = d.day;
                    let utc = resolver.datetime_to_utc(&local)?;
                    Some(RRuleUntil::DateTime(DateTime::from_utc(utc)))
                }
                (Some(RRuleUntil::DateTime(dt)), CalDateTime::Date(_)) => {
                    Some(RRuleUntil::Date(dt.date()))
                }
                _ => None,
            };
            rewrites.push(new_until.map(|u| {
                let report = format!("Fixed RRULE UNTIL value: {u}");
                (u, report)
            }));
        }
        if rewrites.iter().all(Option::is_none) {
            return Ok(());
        }
        if !do_fix {
            let report = rewrites.iter().flatten().next().map(|(_, r)| r.clone());
            return Err(IcalError::InvalidCalendarData(report.unwrap_or_else(|| {
                "RRULE UNTIL value type does not match DTSTART".into()
            })));
        }

        if let Some(master) = self.master_component_mut() {
            let mut idx = 0;
            for prop in master.properties_mut() {
                if prop.name.eq_ignore_ascii_case("RRULE") {
                    if let Some(Some((until, report))) = rewrites.get(idx) {
                        if let Value::Recur(rrule) = prop.value().clone() {
                            let mut rewritten = *rrule;
                            rewritten.until = Some(until.clone());
                            prop.set_value(Value::Recur(Box::new(rewritten)));
                            fixed.push(report.clone());
                        }
                    }
                    idx += 1;
                }
            }
        }
        Ok(())
    }

    /// EXDATE entries at or before the master's own DTSTART are artifacts of
    /// client-side series splitting; the repair removes them, reporting each
    /// removed value by its literal text.
    fn fix_earlier_exdates(&mut self, do_fix: bool, fixed: &mut Vec<String>) -> IcalResult<()> {
        let resolver = TzResolver::from_calendar(self);
        let Some(master) = self.master_component() else { return Ok(()) };
        let Some(dtstart) = master.dtstart() else { return Ok(()) };
        let dtstart_utc = resolver.to_utc(&dtstart)?;

        let mut rebuilt: Vec<Property> = Vec::new();
        let mut removed: Vec<(UtcDateTime<Utc>, String)> = Vec::new();
        for prop in master.get_properties("EXDATE") {
            let mut kept = Vec::new();
            for value in prop.value().caldatetimes() {
                let utc = resolver.to_utc(&value)?;
                if utc <= dtstart_utc {
                    removed.push((utc, value.to_string()));
                } else {
                    kept.push(value);
                }
            }
            if !kept.is_empty() {
                let value = caldatetime_list_value(kept);
                let raw = value.to_ical_string();
                rebuilt.push(Property::from_parts("EXDATE", prop.params.clone(), value, raw));
            }
        }
        if removed.is_empty() {
            return Ok(());
        }
        removed.sort_by_key(|(utc, _)| *utc);
        if !do_fix {
            return Err(IcalError::InvalidCalendarData(format!(
                "Removed earlier EXDATE: {}",
                removed[0].1
            )));
        }

        if let Some(master) = self.master_component_mut() {
            master.remove_properties("EXDATE");
            for prop in rebuilt {
                master.add_property(prop);
            }
        }
        for (_, literal) in removed {
            fixed.push(format!("Removed earlier EXDATE: {literal}"));
        }
        Ok(())
    }

    /// Every override's RECURRENCE-ID must be a generated occurrence; the
    /// repair materializes a matching RDATE on the master, preserving the
    /// override's data rather than deleting it.
    fn fix_invalid_overrides(&mut self, do_fix: bool, fixed: &mut Vec<String>) -> IcalResult<()> {
        let resolver = TzResolver::from_calendar(self);
        let Some(master) = self.master_component() else { return Ok(()) };
        let Some(dtstart) = master.dtstart() else { return Ok(()) };

        let mut override_rids: Vec<(UtcDateTime<Utc>, Property)> = Vec::new();
        for comp in self.override_components() {
            if let Some(prop) = comp.get_property("RECURRENCE-ID") {
                if let Some(rid) = prop.as_caldatetime() {
                    override_rids.push((resolver.to_utc(&rid)?, prop.clone()));
                }
            }
        }
        let Some(max) = override_rids.iter().map(|(utc, _)| *utc).max() else {
            return Ok(());
        };
        let valid = master_rids(
            master,
            &resolver,
            &dtstart,
            Some(max + chrono::Duration::seconds(1)),
        )?;

        let mut additions: Vec<Property> = Vec::new();
        let mut covered: BTreeSet<UtcDateTime<Utc>> = BTreeSet::new();
        for (utc, prop) in override_rids {
            if valid.contains(&utc) || covered.contains(&utc) {
                continue;
            }
            if !do_fix {
                return Err(IcalError::InvalidCalendarData(format!(
                    "Invalid overridden instance: {}",
                    prop.raw_value()
                )));
            }
            let raw = prop.raw_value().to_owned();
            additions.push(Property::from_parts(
                "RDATE",
                prop.params.clone(),
                prop.value().clone(),
                raw.clone(),
            ));
            fixed.push(format!("Added RDATE for invalid occurrence: {raw}"));
            covered.insert(utc);
        }

        if let Some(master) = self.master_component_mut() {
            for prop in additions {
                master.add_property(prop);
            }
        }
        Ok(())
    }

    /// Narrower recurrence pass: an override whose RECURRENCE-ID is itself
    /// EXDATE'd has the EXDATE removed, and gains an RDATE when nothing else
    /// generates the date. Without `do_fix` the defects are returned in the
    /// unfixed list and the tree is left untouched.
    pub fn valid_recurrence_ids(&mut self, do_fix: bool) -> IcalResult<(Vec<String>, Vec<String>)> {
        let resolver = TzResolver::from_calendar(self);
        let Some(master) = self.master_component() else {
            return Ok((Vec::new(), Vec::new()));
        };
        let Some(dtstart) = master.dtstart() else {
            return Ok((Vec::new(), Vec::new()));
        };

        let mut override_rids: Vec<(UtcDateTime<Utc>, Property)> = Vec::new();
        for comp in self.override_components() {
            if let Some(prop) = comp.get_property("RECURRENCE-ID") {
                if let Some(rid) = prop.as_caldatetime() {
                    override_rids.push((resolver.to_utc(&rid)?, prop.clone()));
                }
            }
        }
        let Some(max) = override_rids.iter().map(|(utc, _)| *utc).max() else {
            return Ok((Vec::new(), Vec::new()));
        };
        let limit = Some(max + chrono::Duration::seconds(1));
        let generated = rule_rids(master, &resolver, &dtstart, limit)?;
        let exdates: BTreeSet<UtcDateTime<Utc>> =
            list_utc(master, "EXDATE", &resolver)?.into_iter().collect();

        let mut messages = Vec::new();
        let mut exdates_to_remove: BTreeSet<UtcDateTime<Utc>> = BTreeSet::new();
        let mut additions: Vec<Property> = Vec::new();
        for (utc, prop) in override_rids {
            if exdates.contains(&utc) && exdates_to_remove.insert(utc) {
                messages.push(format!("Removed EXDATE for overridden instance: {}", prop.raw_value()));
            }
            if !generated.contains(&utc) {
                let raw = prop.raw_value().to_owned();
                additions.push(Property::from_parts(
                    "RDATE",
                    prop.params.clone(),
                    prop.value().clone(),
                    raw.clone(),
                ));
                messages.push(format!("Added RDATE for overridden instance: {raw}"));
            }
        }
        if messages.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }
        if !do_fix {
            return Ok((Vec::new(), messages));
        }

        // Rebuild EXDATEs without the overridden values.
        let mut rebuilt: Vec<Property> = Vec::new();
        for prop in master.get_properties("EXDATE") {
            let mut kept = Vec::new();
            for value in prop.value().caldatetimes() {
                if !exdates_to_remove.contains(&resolver.to_utc(&value)?) {
                    kept.push(value);
                }
            }
            if !kept.is_empty() {
                let value = caldatetime_list_value(kept);
                let raw = value.to_ical_string();
                rebuilt.push(Property::from_parts("EXDATE", prop.params.clone(), value, raw));
            }
        }
        if let Some(master) = self.master_component_mut() {
            if !exdates_to_remove.is_empty() {
                master.remove_properties("EXDATE");
                for prop in rebuilt {
                    master.add_property(prop);
                }
            }
            for prop in additions {
                master.add_property(prop);
            }
        }
        Ok((messages, Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    const MISMATCHED_UNTIL: &str = concat!(
        "BEGIN:VCALENDAR\r\n",
        "VERSION:2.0\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:u1\r\n",
        "DTSTART;TZID=America/Los_Angeles:20110107T123000\r\n",
        "DTEND;TZID=America/Los_Angeles:20110107T141500\r\n",
        "RRULE:FREQ=DAILY;INTERVAL=1;UNTIL=20110121\r\n",
        "DTSTAMP:20110105T192229Z\r\n",
        "END:VEVENT\r\n",
        "END:VCALENDAR\r\n",
    );

    #[test]
    fn until_date_with_datetime_dtstart_is_fixed() {
        let mut cal = parse(MISMATCHED_UNTIL).unwrap();
        assert!(cal.valid_calendar_data(false, false).is_err());

        let mut cal = parse(MISMATCHED_UNTIL).unwrap();
        let (fixed, unfixed) = cal.valid_calendar_data(true, false).unwrap();
        assert_eq!(fixed.len(), 1);
        assert!(unfixed.is_empty());
        assert!(cal.serialized().contains("RRULE:FREQ=DAILY;INTERVAL=1;UNTIL=20110121T203000Z\r\n"));

        // Now passes without fixing.
        cal.valid_calendar_data(false, false).unwrap();
    }

    #[test]
    fn until_datetime_with_date_dtstart_is_fixed() {
        let text = concat!(
            "BEGIN:VCALENDAR\r\n",
            "VERSION:2.0\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:u1\r\n",
            "DTSTART;VALUE=DATE:20110107\r\n",
            "DTEND;VALUE=DATE:20110108\r\n",
            "RRULE:FREQ=DAILY;INTERVAL=1;UNTIL=20110131T123456\r\n",
            "DTSTAMP:20110106T231917Z\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        );
        let mut cal = parse(text).unwrap();
        assert!(cal.valid_calendar_data(false, false).is_err());
        let mut cal = parse(text).unwrap();
        cal.valid_calendar_data(true, false).unwrap();
        assert!(cal.serialized().contains("RRULE:FREQ=DAILY;INTERVAL=1;UNTIL=20110131\r\n"));
        cal.valid_calendar_data(false, false).unwrap();
    }

    const EARLIER_EXDATES: &str = concat!(
        "BEGIN:VCALENDAR\r\n",
        "VERSION:2.0\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:u1\r\n",
        "DTSTART;TZID=America/Los_Angeles:20120218T140000\r\n",
        "DTEND;TZID=America/Los_Angeles:20120218T160000\r\n",
        "RRULE:FREQ=DAILY;COUNT=396\r\n",
        "EXDATE;TZID=America/Los_Angeles:20120201T113000,20120202T113000\r\n",
        "EXDATE;TZID=America/Los_Angeles:20120214T113000,20120225T113000,20120215T113000\r\n",
        "EXDATE;TZID=America/Los_Angeles:20120216T113000\r\n",
        "EXDATE;TZID=America/Los_Angeles:20120220T113000\r\n",
        "DTSTAMP:20120213T224523Z\r\n",
        "END:VEVENT\r\n",
        "END:VCALENDAR\r\n",
    );

    #[test]
    fn earlier_exdates_are_removed_and_reported() {
        let mut cal = parse(EARLIER_EXDATES).unwrap();
        assert!(cal.valid_calendar_data(false, true).is_err());

        let mut cal = parse(EARLIER_EXDATES).unwrap();
        let (fixed, unfixed) = cal.valid_calendar_data(true, true).unwrap();
        assert_eq!(
            fixed,
            vec![
                "Removed earlier EXDATE: 20120201T113000",
                "Removed earlier EXDATE: 20120202T113000",
                "Removed earlier EXDATE: 20120214T113000",
                "Removed earlier EXDATE: 20120215T113000",
                "Removed earlier EXDATE: 20120216T113000",
            ]
        );
        assert!(unfixed.is_empty());

        let out = cal.serialized();
        assert!(!out.contains("20120201T113000"));
        assert!(!out.contains("20120216T113000"));
        assert!(out.contains("EXDATE;TZID=America/Los_Angeles:20120225T113000\r\n"));
        assert!(out.contains("EXDATE;TZID=America/Los_Angeles:20120220T113000\r\n"));

        cal.valid_calendar_data(false, true).unwrap();
    }

    const BOGUS_OVERRIDE: &str = concat!(
        "BEGIN:VCALENDAR\r\n",
        "VERSION:2.0\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:u1\r\n",
        "DTSTART;TZID=America/Los_Angeles:20111207T143000\r\n",
        "DTEND;TZID=America/Los_Angeles:20111207T153000\r\n",
        "RRULE:FREQ=WEEKLY;COUNT=400\r\n",
        "DTSTAMP:20111206T203553Z\r\n",
        "END:VEVENT\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:u1\r\n",
        "RECURRENCE-ID;TZID=America/Los_Angeles:20111215T143000\r\n",
        "DTSTART;TZID=America/Los_Angeles:20111214T153000\r\n",
        "DTEND;TZID=America/Los_Angeles:20111214T163000\r\n",
        "DTSTAMP:20111206T203606Z\r\n",
        "END:VEVENT\r\n",
        "END:VCALENDAR\r\n",
    );

    #[test]
    fn invalid_override_gets_materialized_rdate() {
        let mut cal = parse(BOGUS_OVERRIDE).unwrap();
        assert!(cal.valid_calendar_data(false, true).is_err());

        let mut cal = parse(BOGUS_OVERRIDE).unwrap();
        let (fixed, _) = cal.valid_calendar_data(true, true).unwrap();
        assert_eq!(fixed.len(), 1);
        assert!(cal
            .serialized()
            .contains("RDATE;TZID=America/Los_Angeles:20111215T143000\r\n"));

        cal.valid_calendar_data(false, true).unwrap();
    }

    #[test]
    fn differing_uids_always_hard_fail() {
        let text = concat!(
            "BEGIN:VCALENDAR\r\n",
            "VERSION:2.0\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:u1\r\n",
            "DTSTART:20110101T120000Z\r\n",
            "END:VEVENT\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:u2\r\n",
            "DTSTART:20110102T120000Z\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        );
        let mut cal = parse(text).unwrap();
        assert!(cal.valid_calendar_data(true, false).is_err());
        let mut cal = parse(text).unwrap();
        assert!(cal.valid_calendar_data(false, false).is_err());
    }

    #[test]
    fn duplicate_masters_reported_unfixed() {
        let text = concat!(
            "BEGIN:VCALENDAR\r\n",
            "VERSION:2.0\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:u1\r\n",
            "DTSTART:20110101T120000Z\r\n",
            "END:VEVENT\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:u1\r\n",
            "DTSTART:20110102T120000Z\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        );
        let mut cal = parse(text).unwrap();
        let (fixed, unfixed) = cal.valid_calendar_data(true, false).unwrap();
        assert!(fixed.is_empty());
        assert_eq!(unfixed, vec!["More than one master component"]);
        let mut cal = parse(text).unwrap();
        assert!(cal.valid_calendar_data(false, false).is_err());
    }

    // --- valid_recurrence_ids ---

    fn fake_master() -> &'static str {
        concat!(
            "BEGIN:VCALENDAR\r\n",
            "VERSION:2.0\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:u1\r\n",
            "DTSTART:20071114T000000Z\r\n",
            "DTSTAMP:20080601T120000Z\r\n",
            "END:VEVENT\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:u1\r\n",
            "RECURRENCE-ID:20071114T000000Z\r\n",
            "DTSTART:20071114T000000Z\r\n",
            "DTSTAMP:20080601T120000Z\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        )
    }

    #[test]
    fn fake_master_gains_rdate() {
        let mut cal = parse(fake_master()).unwrap();
        let (fixed, unfixed) = cal.valid_recurrence_ids(true).unwrap();
        assert_eq!(fixed.len(), 1);
        assert!(unfixed.is_empty());
        assert!(cal.serialized().contains("RDATE:20071114T000000Z\r\n"));
    }

    #[test]
    fn exdated_override_loses_exdate() {
        let text = concat!(
            "BEGIN:VCALENDAR\r\n",
            "VERSION:2.0\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:u1\r\n",
            "DTSTART:20071114T000000Z\r\n",
            "DTSTAMP:20080601T120000Z\r\n",
            "EXDATE:20071115T000000Z,20071116T000000Z\r\n",
            "RRULE:FREQ=DAILY\r\n",
            "END:VEVENT\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:u1\r\n",
            "RECURRENCE-ID:20071115T000000Z\r\n",
            "DTSTART:20071115T000000Z\r\n",
            "DTSTAMP:20080601T120000Z\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        );
        let mut cal = parse(text).unwrap();
        let (fixed, _) = cal.valid_recurrence_ids(true).unwrap();
        assert_eq!(fixed.len(), 1);
        let out = cal.serialized();
        assert!(out.contains("EXDATE:20071116T000000Z\r\n"));
        assert!(!out.contains("20071115T000000Z,"));
        // Daily rule still generates the date, so no RDATE is needed.
        assert!(!out.contains("RDATE"));
    }

    #[test]
    fn exdated_invalid_override_gets_both_fixes() {
        let text = concat!(
            "BEGIN:VCALENDAR\r\n",
            "VERSION:2.0\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:u1\r\n",
            "DTSTART:20071114T000000Z\r\n",
            "DTSTAMP:20080601T120000Z\r\n",
            "EXDATE:20071115T000000Z,20071121T000000Z\r\n",
            "RRULE:FREQ=WEEKLY\r\n",
            "END:VEVENT\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:u1\r\n",
            "RECURRENCE-ID:20071115T000000Z\r\n",
            "DTSTART:20071115T000000Z\r\n",
            "DTSTAMP:20080601T120000Z\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        );
        let mut cal = parse(text).unwrap();
        let (fixed, _) = cal.valid_recurrence_ids(true).unwrap();
        assert_eq!(fixed.len(), 2);
        let out = cal.serialized();
        assert!(out.contains("EXDATE:20071121T000000Z\r\n"));
        assert!(out.contains("RDATE:20071115T000000Z\r\n"));
    }

    #[test]
    fn no_fix_reports_without_mutating() {
        let mut cal = parse(fake_master()).unwrap();
        let before = cal.serialized();
        let (fixed, unfixed) = cal.valid_recurrence_ids(false).unwrap();
        assert!(fixed.is_empty());
        assert_eq!(unfixed.len(), 1);
        assert_eq!(cal.serialized(), before);
    }
}
