//! Per-user overlay resolution (X-CALENDARSERVER-PERUSER).
//!
//! A shared calendar object carries one X-CALENDARSERVER-PERUSER component
//! per user, each holding X-CALENDARSERVER-PERINSTANCE blocks with that
//! user's private properties (TRANSP, VALARMs, private comments). A block
//! without RECURRENCE-ID is the user's default; a block with one applies to
//! that instance only.

use tsubame_core::constants;

use crate::core::{CalDateTime, Calendar, Component, ComponentKind};
use crate::error::IcalResult;
use crate::expand::TzResolver;

fn peruser_uid(comp: &Component) -> Option<&str> {
    comp.get_property(constants::PERUSER_UID)?.as_text()
}

fn is_transparent(comp: &Component) -> Option<bool> {
    comp.get_property("TRANSP")
        .map(|p| p.raw_value().eq_ignore_ascii_case("TRANSPARENT"))
}

impl Calendar {
    /// User ids carrying per-user data in this object, sorted.
    #[must_use]
    pub fn all_per_user_uids(&self) -> Vec<String> {
        let mut uids: Vec<String> = self
            .per_user_components()
            .iter()
            .filter_map(|c| peruser_uid(c))
            .map(str::to_owned)
            .collect();
        uids.sort_unstable();
        uids.dedup();
        uids
    }

    /// Resolved busy-time transparency per user for one instance (None for
    /// the master). Each entry is `(user id, transparent)`; the shared view
    /// appears under the empty user id. Resolution order per user:
    /// instance-specific block, then the user's default block, then the
    /// shared component's own TRANSP.
    #[tracing::instrument(skip(self, rid))]
    pub fn per_user_transparency(
        &self,
        rid: Option<&CalDateTime>,
    ) -> IcalResult<Vec<(String, bool)>> {
        let resolver = TzResolver::from_calendar(self);
        let rid_utc = match rid {
            Some(rid) => Some(resolver.to_utc(rid)?),
            None => None,
        };

        // Shared view: the override for this instance if present, else the
        // master.
        let mut shared_comp = self.master_component();
        if let Some(target) = rid_utc {
            for over in self.override_components() {
                if let Some(orid) = over.recurrence_id() {
                    if resolver.to_utc(&orid)? == target {
                        shared_comp = Some(over);
                        break;
                    }
                }
            }
        }
        let shared = shared_comp.and_then(is_transparent).unwrap_or(false);

        let mut out = vec![(String::new(), shared)];
        for peruser in self.per_user_components() {
            let Some(uid) = peruser_uid(peruser) else { continue };
            let mut user_default: Option<bool> = None;
            let mut instance_specific: Option<bool> = None;
            for block in peruser.children_of_kind(ComponentKind::PerInstance) {
                match block.recurrence_id() {
                    None => user_default = is_transparent(block).or(user_default),
                    Some(brid) => {
                        if rid_utc == Some(resolver.to_utc(&brid)?) {
                            instance_specific = is_transparent(block).or(instance_specific);
                        }
                    }
                }
            }
            out.push((
                uid.to_owned(),
                instance_specific.or(user_default).unwrap_or(shared),
            ));
        }
        out.sort_unstable();
        Ok(out)
    }

    /// Detects (and with `do_fix` removes) repeated identical VALARMs.
    ///
    /// Scoped per component: each schedulable component and each per-instance
    /// block is deduplicated independently, keeping the first occurrence.
    pub fn has_duplicate_alarms(&mut self, do_fix: bool) -> bool {
        let mut found = false;
        visit_alarm_scopes(self.root_mut(), &mut |scope| {
            found |= dedup_alarms(scope, do_fix);
        });
        found
    }

    /// Detects (and with `do_fix` removes) repeated identical private
    /// attendee comments, with the same per-scope keep-first semantics as
    /// alarm deduplication.
    pub fn has_duplicate_private_comments(&mut self, do_fix: bool) -> bool {
        let mut found = false;
        visit_alarm_scopes(self.root_mut(), &mut |scope| {
            found |= dedup_properties(scope, constants::ATTENDEE_COMMENT, do_fix);
        });
        found
    }
}

/// Calls `f` on every component that owns its own alarm/comment scope.
fn visit_alarm_scopes(comp: &mut Component, f: &mut impl FnMut(&mut Component)) {
    for child in comp.children_mut() {
        match child.kind() {
            ComponentKind::Event | ComponentKind::Todo | ComponentKind::PerInstance => f(child),
            ComponentKind::PerUser => visit_alarm_scopes(child, f),
            _ => {}
        }
    }
}

fn dedup_alarms(scope: &mut Component, do_fix: bool) -> bool {
    let alarms = scope.children_of_kind(ComponentKind::Alarm);
    let mut seen: Vec<&Component> = Vec::new();
    let mut keep = Vec::with_capacity(alarms.len());
    for alarm in alarms {
        let duplicate = seen.contains(&alarm);
        keep.push(!duplicate);
        if !duplicate {
            seen.push(alarm);
        }
    }
    let found = keep.iter().any(|k| !k);
    if found && do_fix {
        let mut decisions = keep.into_iter();
        scope.retain_children(|c| {
            if c.kind() == ComponentKind::Alarm {
                decisions.next().unwrap_or(true)
            } else {
                true
            }
        });
    }
    found
}

fn dedup_properties(scope: &mut Component, name: &str, do_fix: bool) -> bool {
    let props = scope.get_properties(name);
    let mut seen: Vec<String> = Vec::new();
    let mut keep = Vec::with_capacity(props.len());
    for prop in props {
        let line = crate::build::serialize_property(prop);
        let duplicate = seen.contains(&line);
        keep.push(!duplicate);
        if !duplicate {
            seen.push(line);
        }
    }
    let found = keep.iter().any(|k| !k);
    if found && do_fix {
        let mut decisions = keep.into_iter();
        scope.properties_mut().retain(|p| {
            if p.name.eq_ignore_ascii_case(name) {
                decisions.next().unwrap_or(true)
            } else {
                true
            }
        });
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    const SHARED_OBJECT: &str = concat!(
        "BEGIN:VCALENDAR\r\n",
        "VERSION:2.0\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:u1\r\n",
        "DTSTART:20110101T120000Z\r\n",
        "DTSTAMP:20110101T120000Z\r\n",
        "RRULE:FREQ=DAILY\r\n",
        "TRANSP:OPAQUE\r\n",
        "END:VEVENT\r\n",
        "BEGIN:X-CALENDARSERVER-PERUSER\r\n",
        "UID:u1\r\n",
        "X-CALENDARSERVER-PERUSER-UID:user01\r\n",
        "BEGIN:X-CALENDARSERVER-PERINSTANCE\r\n",
        "TRANSP:TRANSPARENT\r\n",
        "END:X-CALENDARSERVER-PERINSTANCE\r\n",
        "BEGIN:X-CALENDARSERVER-PERINSTANCE\r\n",
        "RECURRENCE-ID:20110102T120000Z\r\n",
        "TRANSP:OPAQUE\r\n",
        "END:X-CALENDARSERVER-PERINSTANCE\r\n",
        "END:X-CALENDARSERVER-PERUSER\r\n",
        "BEGIN:X-CALENDARSERVER-PERUSER\r\n",
        "UID:u1\r\n",
        "X-CALENDARSERVER-PERUSER-UID:user02\r\n",
        "BEGIN:X-CALENDARSERVER-PERINSTANCE\r\n",
        "RECURRENCE-ID:20110102T120000Z\r\n",
        "TRANSP:TRANSPARENT\r\n",
        "END:X-CALENDARSERVER-PERINSTANCE\r\n",
        "END:X-CALENDARSERVER-PERUSER\r\n",
        "END:VCALENDAR\r\n",
    );

    #[test]
    fn per_user_uids_are_sorted() {
        let cal = parse(SHARED_OBJECT).unwrap();
        assert_eq!(cal.all_per_user_uids(), vec!["user01", "user02"]);
    }

    #[test]
    fn transparency_resolution_order() {
        let cal = parse(SHARED_OBJECT).unwrap();

        // Master instance: user01's default block applies; user02 has no
        // default and falls back to the shared OPAQUE.
        let master = cal.per_user_transparency(None).unwrap();
        assert_eq!(
            master,
            vec![
                (String::new(), false),
                ("user01".to_string(), true),
                ("user02".to_string(), false),
            ]
        );

        // Second occurrence: instance-specific blocks win over defaults.
        let rid = CalDateTime::DateTime(crate::core::DateTime::utc(2011, 1, 2, 12, 0, 0));
        let second = cal.per_user_transparency(Some(&rid)).unwrap();
        assert_eq!(
            second,
            vec![
                (String::new(), false),
                ("user01".to_string(), false),
                ("user02".to_string(), true),
            ]
        );
    }

    const ALARM: &str = concat!(
        "BEGIN:VALARM\r\n",
        "ACTION:DISPLAY\r\n",
        "DESCRIPTION:Reminder\r\n",
        "TRIGGER:-PT15M\r\n",
        "END:VALARM\r\n",
    );

    #[test]
    fn duplicate_alarms_are_deduplicated() {
        let text = format!(
            concat!(
                "BEGIN:VCALENDAR\r\n",
                "VERSION:2.0\r\n",
                "BEGIN:VEVENT\r\n",
                "UID:u1\r\n",
                "DTSTART:20110101T120000Z\r\n",
                "DTSTAMP:20110101T120000Z\r\n",
                "{a}{a}{a}",
                "END:VEVENT\r\n",
                "END:VCALENDAR\r\n",
            ),
            a = ALARM
        );
        let mut cal = parse(&text).unwrap();
        assert!(cal.has_duplicate_alarms(false));
        assert_eq!(cal.serialized().matches("BEGIN:VALARM").count(), 3);

        assert!(cal.has_duplicate_alarms(true));
        assert_eq!(cal.serialized().matches("BEGIN:VALARM").count(), 1);
        assert!(!cal.has_duplicate_alarms(false));
    }

    #[test]
    fn distinct_alarms_are_kept() {
        let text = format!(
            concat!(
                "BEGIN:VCALENDAR\r\n",
                "VERSION:2.0\r\n",
                "BEGIN:VEVENT\r\n",
                "UID:u1\r\n",
                "DTSTART:20110101T120000Z\r\n",
                "DTSTAMP:20110101T120000Z\r\n",
                "{a}",
                "BEGIN:VALARM\r\n",
                "ACTION:DISPLAY\r\n",
                "DESCRIPTION:Reminder\r\n",
                "TRIGGER:-PT30M\r\n",
                "END:VALARM\r\n",
                "END:VEVENT\r\n",
                "END:VCALENDAR\r\n",
            ),
            a = ALARM
        );
        let mut cal = parse(&text).unwrap();
        assert!(!cal.has_duplicate_alarms(true));
        assert_eq!(cal.serialized().matches("BEGIN:VALARM").count(), 2);
    }

    #[test]
    fn duplicate_private_comments_scoped_per_component() {
        let text = concat!(
            "BEGIN:VCALENDAR\r\n",
            "VERSION:2.0\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:u1\r\n",
            "DTSTART:20110101T120000Z\r\n",
            "DTSTAMP:20110101T120000Z\r\n",
            "X-CALENDARSERVER-ATTENDEE-COMMENT:running late\r\n",
            "X-CALENDARSERVER-ATTENDEE-COMMENT:running late\r\n",
            "END:VEVENT\r\n",
            "BEGIN:X-CALENDARSERVER-PERUSER\r\n",
            "UID:u1\r\n",
            "X-CALENDARSERVER-PERUSER-UID:user01\r\n",
            "BEGIN:X-CALENDARSERVER-PERINSTANCE\r\n",
            "X-CALENDARSERVER-ATTENDEE-COMMENT:running late\r\n",
            "END:X-CALENDARSERVER-PERINSTANCE\r\n",
            "END:X-CALENDARSERVER-PERUSER\r\n",
            "END:VCALENDAR\r\n",
        );
        let mut cal = parse(text).unwrap();
        assert!(cal.has_duplicate_private_comments(true));
        // The per-instance copy is a different scope and survives.
        assert_eq!(
            cal.serialized().matches("X-CALENDARSERVER-ATTENDEE-COMMENT").count(),
            2
        );
    }
}
