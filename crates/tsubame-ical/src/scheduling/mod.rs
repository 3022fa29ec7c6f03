//! Attendee/organizer extraction and iTIP bookkeeping (RFC 5546).
//!
//! The engine does not send scheduling messages; it answers the questions a
//! scheduling layer asks (who is involved, per instance) and maintains the
//! iTIP change-tracking state (SEQUENCE, DTSTAMP, UID) across stores.

pub mod address;

use std::collections::{BTreeMap, BTreeSet};

use crate::core::{CalDateTime, Calendar, Component, DateTime, Property};

fn rid_key(comp: &Component) -> Option<String> {
    comp.recurrence_id().map(|rid| rid.to_string())
}

/// Whether an ATTENDEE is under server scheduling control
/// (SCHEDULE-AGENT=SERVER, the default when absent).
fn server_scheduled(prop: &Property) -> bool {
    prop.param_value("SCHEDULE-AGENT")
        .is_none_or(|v| v.eq_ignore_ascii_case("SERVER"))
}

fn matches_address(prop: &Property, addresses: &[&str]) -> bool {
    addresses.iter().any(|a| prop.raw_value().eq_ignore_ascii_case(a))
}

impl Calendar {
    /// ORGANIZER addresses in document order, tagged with the instance they
    /// come from (None for the master). A component carrying more than one
    /// ORGANIZER is malformed and contributes nothing.
    #[must_use]
    pub fn organizers_by_instance(&self) -> Vec<(String, Option<CalDateTime>)> {
        let mut out = Vec::new();
        for comp in self.schedulable_components() {
            let organizers = comp.get_properties("ORGANIZER");
            if organizers.len() == 1 {
                out.push((organizers[0].raw_value().to_owned(), comp.recurrence_id()));
            }
        }
        out
    }

    /// ATTENDEE addresses in document order, tagged with the instance they
    /// come from.
    #[must_use]
    pub fn attendees_by_instance(
        &self,
        only_schedule_agent_server: bool,
    ) -> Vec<(String, Option<CalDateTime>)> {
        let mut out = Vec::new();
        for comp in self.schedulable_components() {
            for prop in comp.get_properties("ATTENDEE") {
                if only_schedule_agent_server && !server_scheduled(prop) {
                    continue;
                }
                out.push((prop.raw_value().to_owned(), comp.recurrence_id()));
            }
        }
        out
    }

    /// Reduces the object to what one attendee (under any of `addresses`)
    /// is entitled to see. An override that no longer names the attendee is
    /// dropped, and its occurrence is EXDATE'd on the master so the
    /// attendee's copy skips it.
    #[tracing::instrument(skip(self, addresses))]
    pub fn attendees_view(&mut self, addresses: &[&str], only_schedule_agent_server: bool) {
        let mut exdates: Vec<CalDateTime> = Vec::new();
        let mut drop_rids: BTreeSet<Option<String>> = BTreeSet::new();
        for comp in self.schedulable_components() {
            let attending = comp.get_properties("ATTENDEE").iter().any(|p| {
                matches_address(p, addresses)
                    && (!only_schedule_agent_server || server_scheduled(p))
            });
            if !attending {
                drop_rids.insert(rid_key(comp));
                if let Some(rid) = comp.recurrence_id() {
                    exdates.push(rid);
                }
            }
        }
        if drop_rids.is_empty() {
            return;
        }

        let master_dropped = drop_rids.contains(&None);
        self.root_mut().retain_children(|c| {
            !(c.kind().is_schedulable() && drop_rids.contains(&rid_key(c)))
        });
        if !master_dropped {
            if let Some(master) = self.master_component_mut() {
                for rid in exdates {
                    master.add_property(Property::caldatetime("EXDATE", &rid));
                }
            }
        }
    }

    /// Strips every ATTENDEE except the given address from every component.
    /// Used when storing an attendee's own copy of a scheduling message.
    pub fn remove_all_but_one_attendee(&mut self, address: &str) {
        for comp in self.root_mut().children_mut() {
            if comp.kind().is_schedulable() {
                comp.properties_mut().retain(|p| {
                    p.name != "ATTENDEE" || p.raw_value().eq_ignore_ascii_case(address)
                });
            }
        }
    }

    /// Filters properties of every schedulable component: `keep` is an
    /// allow-list (None keeps everything), `remove` a deny-list applied
    /// after it.
    pub fn filter_properties(&mut self, keep: Option<&[&str]>, remove: &[&str]) {
        for comp in self.root_mut().children_mut() {
            if comp.kind().is_schedulable() {
                comp.properties_mut().retain(|p| {
                    keep.is_none_or(|k| k.iter().any(|n| p.name.eq_ignore_ascii_case(n)))
                        && !remove.iter().any(|n| p.name.eq_ignore_ascii_case(n))
                });
            }
        }
    }

    /// Whether this version must get a SEQUENCE bump before being sent:
    /// true when any component's SEQUENCE has not advanced past the
    /// matching component in `old` (RFC 5546 §2.1.4). An override new in
    /// this version is measured against the old master it derives from.
    #[must_use]
    pub fn needs_itip_sequence_change(&self, old: &Self) -> bool {
        let old_seqs: BTreeMap<Option<String>, i32> = old
            .schedulable_components()
            .iter()
            .map(|c| (rid_key(c), c.sequence()))
            .collect();
        let old_master = old_seqs.get(&None).copied().unwrap_or(0);
        self.schedulable_components().iter().any(|comp| {
            let old_seq = old_seqs.get(&rid_key(comp)).copied().unwrap_or(old_master);
            comp.sequence() <= old_seq
        })
    }

    /// Stamps every schedulable component with a fresh DTSTAMP guaranteed
    /// to differ from all of `old`'s, and with `do_sequence` moves every
    /// SEQUENCE to one past the highest seen on either side, in lockstep.
    #[tracing::instrument(skip(self, old))]
    pub fn bump_itip_info(&mut self, old: Option<&Self>, do_sequence: bool) {
        let old_stamps: BTreeSet<String> = old
            .map(|cal| {
                cal.schedulable_components()
                    .iter()
                    .filter_map(|c| c.get_property("DTSTAMP"))
                    .map(|p| p.raw_value().to_owned())
                    .collect()
            })
            .unwrap_or_default();
        let mut now = chrono::Utc::now();
        while old_stamps.contains(&DateTime::from_utc(now).to_string()) {
            now += chrono::Duration::seconds(1);
        }
        let stamp = DateTime::from_utc(now);

        let next_sequence = do_sequence.then(|| {
            let new_max = self
                .schedulable_components()
                .iter()
                .map(|c| c.sequence())
                .max()
                .unwrap_or(0);
            let old_max = old
                .map(|cal| {
                    cal.schedulable_components().iter().map(|c| c.sequence()).max().unwrap_or(0)
                })
                .unwrap_or(0);
            new_max.max(old_max) + 1
        });

        for comp in self.root_mut().children_mut() {
            if !comp.kind().is_schedulable() {
                continue;
            }
            comp.replace_property(Property::datetime("DTSTAMP", stamp.clone()));
            if let Some(seq) = next_sequence {
                comp.replace_property(Property::integer("SEQUENCE", seq));
            }
        }
    }

    /// Raises any SEQUENCE that regressed below the matching component in
    /// `old`. Components new in this version are left alone.
    pub fn sequence_in_sync(&mut self, old: &Self) {
        let old_seqs: BTreeMap<Option<String>, i32> = old
            .schedulable_components()
            .iter()
            .map(|c| (rid_key(c), c.sequence()))
            .collect();
        for comp in self.root_mut().children_mut() {
            if !comp.kind().is_schedulable() {
                continue;
            }
            if let Some(&old_seq) = old_seqs.get(&rid_key(comp)) {
                if comp.sequence() < old_seq {
                    comp.replace_property(Property::integer("SEQUENCE", old_seq));
                }
            }
        }
    }

    /// Replaces the UID everywhere it appears (masters, overrides, per-user
    /// blocks) with a fresh v4 UUID, and returns it.
    pub fn new_uid(&mut self) -> String {
        let uid = uuid::Uuid::new_v4().to_string().to_ascii_uppercase();
        for comp in self.root_mut().children_mut() {
            if comp.has_property("UID") {
                comp.replace_property(Property::text("UID", uid.clone()));
            }
        }
        uid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    const MEETING: &str = concat!(
        "BEGIN:VCALENDAR\r\n",
        "VERSION:2.0\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:u1\r\n",
        "DTSTART:20110101T120000Z\r\n",
        "DTSTAMP:20110101T120000Z\r\n",
        "RRULE:FREQ=DAILY\r\n",
        "ORGANIZER:mailto:boss@example.com\r\n",
        "ATTENDEE:mailto:boss@example.com\r\n",
        "ATTENDEE:mailto:a@example.com\r\n",
        "ATTENDEE;SCHEDULE-AGENT=CLIENT:mailto:b@example.com\r\n",
        "END:VEVENT\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:u1\r\n",
        "RECURRENCE-ID:20110102T120000Z\r\n",
        "DTSTART:20110102T130000Z\r\n",
        "DTSTAMP:20110101T120000Z\r\n",
        "ORGANIZER:mailto:boss@example.com\r\n",
        "ATTENDEE:mailto:boss@example.com\r\n",
        "END:VEVENT\r\n",
        "END:VCALENDAR\r\n",
    );

    #[test]
    fn organizers_and_attendees_by_instance() {
        let cal = parse(MEETING).unwrap();
        let organizers = cal.organizers_by_instance();
        assert_eq!(organizers.len(), 2);
        assert_eq!(organizers[0].0, "mailto:boss@example.com");
        assert!(organizers[0].1.is_none());
        assert!(organizers[1].1.is_some());

        let all = cal.attendees_by_instance(false);
        assert_eq!(all.len(), 4);
        let server_only = cal.attendees_by_instance(true);
        assert_eq!(server_only.len(), 3);
        assert!(!server_only.iter().any(|(a, _)| a == "mailto:b@example.com"));
    }

    #[test]
    fn attendees_view_exdates_dropped_override() {
        let mut cal = parse(MEETING).unwrap();
        cal.attendees_view(&["mailto:a@example.com"], false);

        // The override does not name a@example.com, so it is dropped and
        // its occurrence excluded on the master.
        assert!(cal.override_components().is_empty());
        let out = cal.serialized();
        assert!(out.contains("EXDATE:20110102T120000Z\r\n"));
        assert!(out.contains("ATTENDEE:mailto:a@example.com\r\n"));
    }

    #[test]
    fn remove_all_but_one_attendee_keeps_target() {
        let mut cal = parse(MEETING).unwrap();
        cal.remove_all_but_one_attendee("mailto:a@example.com");
        let out = cal.serialized();
        assert_eq!(out.matches("\r\nATTENDEE").count(), 1);
        assert!(out.contains("ATTENDEE:mailto:a@example.com\r\n"));
    }

    #[test]
    fn filter_properties_keep_and_remove() {
        let mut cal = parse(MEETING).unwrap();
        cal.filter_properties(None, &["ATTENDEE"]);
        assert!(!cal.serialized().contains("ATTENDEE"));

        let mut cal = parse(MEETING).unwrap();
        cal.filter_properties(Some(&["UID", "DTSTART", "DTSTAMP", "RECURRENCE-ID"]), &[]);
        let out = cal.serialized();
        assert!(!out.contains("ORGANIZER"));
        assert!(out.contains("UID:u1\r\n"));
        assert!(out.contains("RECURRENCE-ID:20110102T120000Z\r\n"));
    }

    #[test]
    fn sequence_change_detection() {
        // Absent SEQUENCE counts as 0 on both sides.
        let old = parse(MEETING).unwrap();

        // old < new on every component: no bump needed, even when other
        // properties changed too.
        let advanced = parse(
            &MEETING
                .replace("UID:u1\r\n", "UID:u1\r\nSEQUENCE:1\r\n")
                .replace("DTSTART:20110101T120000Z", "DTSTART:20110101T130000Z"),
        )
        .unwrap();
        assert!(!advanced.needs_itip_sequence_change(&old));

        // old == new: the copy being prepared must be bumped.
        let same = parse(MEETING).unwrap();
        assert!(same.needs_itip_sequence_change(&old));

        // old > new: a regressed component forces a bump.
        let old_ahead =
            parse(&MEETING.replace("UID:u1\r\n", "UID:u1\r\nSEQUENCE:2\r\n")).unwrap();
        let behind =
            parse(&MEETING.replace("UID:u1\r\n", "UID:u1\r\nSEQUENCE:1\r\n")).unwrap();
        assert!(behind.needs_itip_sequence_change(&old_ahead));
    }

    #[test]
    fn sequence_change_uses_master_for_new_overrides() {
        let old_master = |seq: u32| {
            parse(&format!(
                concat!(
                    "BEGIN:VCALENDAR\r\n",
                    "VERSION:2.0\r\n",
                    "BEGIN:VEVENT\r\n",
                    "UID:u1\r\n",
                    "DTSTART:20110101T120000Z\r\n",
                    "DTSTAMP:20110101T120000Z\r\n",
                    "RRULE:FREQ=DAILY\r\n",
                    "SEQUENCE:{}\r\n",
                    "END:VEVENT\r\n",
                    "END:VCALENDAR\r\n",
                ),
                seq
            ))
            .unwrap()
        };
        // A newly overridden instance derives from the master, so its
        // SEQUENCE is compared against the old master's.
        let new = parse(&MEETING.replace("UID:u1\r\n", "UID:u1\r\nSEQUENCE:2\r\n")).unwrap();
        assert!(!new.needs_itip_sequence_change(&old_master(1)));
        assert!(new.needs_itip_sequence_change(&old_master(2)));
    }

    #[test]
    fn bump_itip_info_moves_sequence_in_lockstep() {
        let old = parse(&MEETING.replace(
            "DTSTAMP:20110101T120000Z\r\nRRULE",
            "DTSTAMP:20110101T120000Z\r\nSEQUENCE:3\r\nRRULE",
        ))
        .unwrap();
        let mut new = parse(MEETING).unwrap();
        new.bump_itip_info(Some(&old), true);

        for comp in new.schedulable_components() {
            assert_eq!(comp.sequence(), 4);
            let stamp = comp.get_property("DTSTAMP").map(Property::raw_value);
            assert!(stamp.is_some_and(|s| s != "20110101T120000Z"));
        }
    }

    #[test]
    fn regressed_sequence_is_raised() {
        let old = parse(&MEETING.replace(
            "DTSTAMP:20110101T120000Z\r\nRRULE",
            "DTSTAMP:20110101T120000Z\r\nSEQUENCE:5\r\nRRULE",
        ))
        .unwrap();
        let mut new = parse(MEETING).unwrap();
        assert_eq!(new.master_component().map(Component::sequence), Some(0));
        new.sequence_in_sync(&old);
        assert_eq!(new.master_component().map(Component::sequence), Some(5));
        // The override had no old SEQUENCE either; both sides default to 0.
        assert_eq!(new.override_components()[0].sequence(), 0);
    }

    #[test]
    fn new_uid_rewrites_every_component() {
        let mut cal = parse(MEETING).unwrap();
        let uid = cal.new_uid();
        assert_eq!(uid.len(), 36);
        let out = cal.serialized();
        assert!(!out.contains("UID:u1\r\n"));
        assert_eq!(out.matches(&format!("UID:{uid}\r\n")).count(), 2);
    }
}
