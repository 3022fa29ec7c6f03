//! Calendar user address normalization against a directory.
//!
//! The directory itself lives outside the engine; callers supply a lookup
//! implementation and the engine rewrites ATTENDEE/ORGANIZER values (and
//! room LOCATIONs) to the requested canonical form.

use tsubame_core::constants;

use crate::core::{Calendar, Component, Parameter, Property, Value};

/// What kind of calendar user a directory record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarUserKind {
    Individual,
    Group,
    Room,
    Resource,
}

/// A directory record for one calendar user.
#[derive(Debug, Clone)]
pub struct DirectoryRecord {
    pub display_name: String,
    /// Stable directory identifier, independent of address churn.
    pub short_id: String,
    /// All addresses this user is known by.
    pub addresses: Vec<String>,
    pub kind: CalendarUserKind,
}

impl DirectoryRecord {
    /// The preferred externally-visible address: mailto, then a principal
    /// path, then http(s), then urn.
    #[must_use]
    pub fn preferred_address(&self) -> Option<&str> {
        for prefix in ["mailto:", "/", "http", "urn:"] {
            if let Some(addr) = self
                .addresses
                .iter()
                .find(|a| a.to_ascii_lowercase().starts_with(prefix))
            {
                return Some(addr);
            }
        }
        None
    }

    /// The stable directory form of this user's address.
    #[must_use]
    pub fn short_id_address(&self) -> String {
        format!("urn:x-uid:{}", self.short_id)
    }
}

/// Directory resolution supplied by the caller.
pub trait DirectoryLookup {
    /// Resolves any known address form to the user's record.
    fn record_for_address(&self, address: &str) -> Option<DirectoryRecord>;
}

impl Calendar {
    /// Rewrites every ATTENDEE and ORGANIZER value to its canonical form.
    ///
    /// With `to_short_id`, values become the stable `urn:x-uid:` form and
    /// the replaced address is preserved under the CALENDARSERVER-OLD-CUA
    /// parameter so the outbound direction can restore a user-facing form.
    /// Without it, values become the record's preferred address and the
    /// marker parameter is dropped. A LOCATION naming a room is kept in
    /// sync with the room's directory display name.
    #[tracing::instrument(skip_all)]
    pub fn normalize_calendar_user_addresses(
        &mut self,
        lookup: &dyn DirectoryLookup,
        to_short_id: bool,
    ) {
        for comp in self.root_mut().children_mut() {
            if comp.kind().is_schedulable() {
                normalize_component(comp, lookup, to_short_id);
            }
        }
    }
}

fn normalize_component(comp: &mut Component, lookup: &dyn DirectoryLookup, to_short_id: bool) {
    // (CN before normalization, directory display name) of a room attendee.
    let mut room_rename: Option<(String, String)> = None;
    for prop in comp.properties_mut() {
        if prop.name != "ATTENDEE" && prop.name != "ORGANIZER" {
            continue;
        }
        let current = prop.raw_value().to_owned();
        let Some(record) = lookup.record_for_address(&current) else { continue };
        let prior_cn = prop.param_value("CN").map(str::to_owned);

        if to_short_id {
            let target = record.short_id_address();
            if target != current {
                prop.set_value(Value::Uri(target));
                prop.set_param(Parameter::new(constants::OLD_CUA_PARAM, current));
            }
        } else {
            let restored = prop
                .param_value(constants::OLD_CUA_PARAM)
                .map(str::to_owned)
                .or_else(|| record.preferred_address().map(str::to_owned));
            if let Some(target) = restored {
                if target != current {
                    prop.set_value(Value::Uri(target));
                }
            }
            prop.remove_param(constants::OLD_CUA_PARAM);
        }
        if !record.display_name.is_empty() {
            prop.set_param(Parameter::new("CN", record.display_name.clone()));
        }

        let is_room = prop
            .param_value("CUTYPE")
            .is_some_and(|v| v.eq_ignore_ascii_case("ROOM"));
        if prop.name == "ATTENDEE" && is_room && record.kind == CalendarUserKind::Room {
            if let Some(prior) = prior_cn {
                room_rename = Some((prior, record.display_name.clone()));
            }
        }
    }
    // A LOCATION naming the room (by its old CN) follows the rename; any
    // other LOCATION value is the user's own text and stays put.
    if let Some((prior, display)) = room_rename {
        let location_matches = comp
            .get_property("LOCATION")
            .and_then(|p| p.as_text())
            .is_some_and(|l| l == prior);
        if !display.is_empty() && location_matches {
            comp.replace_property(Property::text("LOCATION", display));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    struct FakeDirectory;

    impl DirectoryLookup for FakeDirectory {
        fn record_for_address(&self, address: &str) -> Option<DirectoryRecord> {
            match address {
                "mailto:jane@example.com" | "urn:x-uid:jane-01" => Some(DirectoryRecord {
                    display_name: "Jane Doe".into(),
                    short_id: "jane-01".into(),
                    addresses: vec![
                        "/principals/users/jane/".into(),
                        "mailto:jane@example.com".into(),
                    ],
                    kind: CalendarUserKind::Individual,
                }),
                "urn:x-uid:room-12" | "mailto:bigroom@example.com" => Some(DirectoryRecord {
                    display_name: "Conference Room 12".into(),
                    short_id: "room-12".into(),
                    addresses: vec!["mailto:bigroom@example.com".into()],
                    kind: CalendarUserKind::Room,
                }),
                _ => None,
            }
        }
    }

    const INVITE: &str = concat!(
        "BEGIN:VCALENDAR\r\n",
        "VERSION:2.0\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:u1\r\n",
        "DTSTART:20110101T120000Z\r\n",
        "DTSTAMP:20110101T120000Z\r\n",
        "ORGANIZER:mailto:jane@example.com\r\n",
        "ATTENDEE:mailto:jane@example.com\r\n",
        "ATTENDEE;CN=Big Room;CUTYPE=ROOM:mailto:bigroom@example.com\r\n",
        "ATTENDEE:mailto:stranger@example.com\r\n",
        "LOCATION:Big Room\r\n",
        "END:VEVENT\r\n",
        "END:VCALENDAR\r\n",
    );

    #[test]
    fn to_short_id_preserves_old_address() {
        let mut cal = parse(INVITE).unwrap();
        cal.normalize_calendar_user_addresses(&FakeDirectory, true);
        let out = cal.serialized();

        assert!(out.contains("urn:x-uid:jane-01"));
        assert!(out.contains("CALENDARSERVER-OLD-CUA=\"mailto:jane@example.com\""));
        assert!(out.contains("CN=Jane Doe"));
        // Unknown addresses pass through untouched.
        assert!(out.contains("ATTENDEE:mailto:stranger@example.com\r\n"));
    }

    #[test]
    fn outbound_restores_preferred_form() {
        let mut cal = parse(INVITE).unwrap();
        cal.normalize_calendar_user_addresses(&FakeDirectory, true);
        cal.normalize_calendar_user_addresses(&FakeDirectory, false);
        let out = cal.serialized();

        assert!(out.contains("mailto:jane@example.com"));
        assert!(!out.contains("urn:x-uid:jane-01"));
        assert!(!out.contains("OLD-CUA"));
    }

    #[test]
    fn location_matching_room_follows_rename() {
        let mut cal = parse(INVITE).unwrap();
        cal.normalize_calendar_user_addresses(&FakeDirectory, true);
        let out = cal.serialized();
        assert!(out.contains("LOCATION:Conference Room 12\r\n"));
        assert!(out.contains("CN=Conference Room 12"));
    }

    #[test]
    fn location_not_naming_room_is_kept() {
        let mut cal =
            parse(&INVITE.replace("LOCATION:Big Room", "LOCATION:Front steps")).unwrap();
        cal.normalize_calendar_user_addresses(&FakeDirectory, true);
        let out = cal.serialized();
        assert!(out.contains("LOCATION:Front steps\r\n"));
        assert!(out.contains("CN=Conference Room 12"));
    }

    #[test]
    fn preferred_address_ordering() {
        let record = DirectoryRecord {
            display_name: String::new(),
            short_id: "x".into(),
            addresses: vec![
                "urn:x-uid:x".into(),
                "https://cal.example.com/users/x".into(),
                "mailto:x@example.com".into(),
            ],
            kind: CalendarUserKind::Individual,
        };
        assert_eq!(record.preferred_address(), Some("mailto:x@example.com"));
    }
}
