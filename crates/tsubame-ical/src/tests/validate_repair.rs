use super::fixtures::{cal, utc};

/// Scenario: date-form UNTIL against a date-time DTSTART, plus an EXDATE
/// predating the series. Both repairs apply in one fix pass and the result
/// validates and expands cleanly.
const DOUBLY_BROKEN: &str = concat!(
    "BEGIN:VCALENDAR\r\n",
    "VERSION:2.0\r\n",
    "BEGIN:VEVENT\r\n",
    "UID:broken-1\r\n",
    "DTSTART;TZID=America/Los_Angeles:20110107T123000\r\n",
    "DTEND;TZID=America/Los_Angeles:20110107T141500\r\n",
    "RRULE:FREQ=DAILY;UNTIL=20110121\r\n",
    "EXDATE;TZID=America/Los_Angeles:20110101T123000\r\n",
    "DTSTAMP:20110105T192229Z\r\n",
    "END:VEVENT\r\n",
    "END:VCALENDAR\r\n",
);

#[test_log::test]
fn fix_pass_repairs_then_validates_clean() {
    let mut calendar = cal(DOUBLY_BROKEN);
    assert!(calendar.valid_calendar_data(false, true).is_err());

    let mut calendar = cal(DOUBLY_BROKEN);
    let (fixed, unfixed) = calendar.valid_calendar_data(true, true).unwrap();
    assert!(unfixed.is_empty());
    assert!(fixed.iter().any(|m| m == "Removed earlier EXDATE: 20110101T123000"));
    assert!(fixed.iter().any(|m| m.starts_with("Fixed RRULE UNTIL")));

    let out = calendar.serialized();
    // 12:30 PST is 20:30 UTC; the date-form UNTIL takes DTSTART's time.
    assert!(out.contains("UNTIL=20110121T203000Z"));
    assert!(!out.contains("EXDATE"));

    calendar.valid_calendar_data(false, true).unwrap();
    let set = calendar
        .expand_time_ranges(utc(2011, 2, 1, 0, 0, 0), None, false)
        .unwrap();
    assert_eq!(set.len(), 15);
}

#[test_log::test]
fn invalid_override_blocks_expansion_unless_ignored() {
    let text = concat!(
        "BEGIN:VCALENDAR\r\n",
        "VERSION:2.0\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:ghost-1\r\n",
        "DTSTART:20110103T090000Z\r\n",
        "DTSTAMP:20110101T120000Z\r\n",
        "RRULE:FREQ=WEEKLY;COUNT=4\r\n",
        "END:VEVENT\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:ghost-1\r\n",
        "RECURRENCE-ID:20110105T090000Z\r\n",
        "DTSTART:20110105T100000Z\r\n",
        "DTSTAMP:20110101T120000Z\r\n",
        "END:VEVENT\r\n",
        "END:VCALENDAR\r\n",
    );
    let mut calendar = cal(text);
    assert!(calendar
        .expand_time_ranges(utc(2011, 2, 1, 0, 0, 0), None, false)
        .is_err());

    let mut calendar = cal(text);
    let set = calendar
        .expand_time_ranges(utc(2011, 2, 1, 0, 0, 0), None, true)
        .unwrap();
    assert_eq!(set.len(), 4);

    // The repair keeps the override by materializing its RDATE; expansion
    // then accepts it as a fifth, overridden instance.
    let mut calendar = cal(text);
    let (fixed, _) = calendar.valid_calendar_data(true, true).unwrap();
    assert_eq!(fixed, vec!["Added RDATE for invalid occurrence: 20110105T090000Z"]);
    let set = calendar
        .expand_time_ranges(utc(2011, 2, 1, 0, 0, 0), None, false)
        .unwrap();
    assert_eq!(set.len(), 5);
    assert!(set.get(utc(2011, 1, 5, 9, 0, 0)).unwrap().override_index.is_some());
}

#[test_log::test]
fn overrides_without_master_are_legal() {
    let text = concat!(
        "BEGIN:VCALENDAR\r\n",
        "VERSION:2.0\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:orphan-1\r\n",
        "RECURRENCE-ID:20110105T090000Z\r\n",
        "DTSTART:20110105T100000Z\r\n",
        "DTEND:20110105T110000Z\r\n",
        "DTSTAMP:20110101T120000Z\r\n",
        "END:VEVENT\r\n",
        "END:VCALENDAR\r\n",
    );
    let mut calendar = cal(text);
    calendar.valid_calendar_data(true, true).unwrap();
    let set = calendar
        .expand_time_ranges(utc(2011, 2, 1, 0, 0, 0), None, false)
        .unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(
        set.get(utc(2011, 1, 5, 9, 0, 0)).map(|i| i.start),
        Some(utc(2011, 1, 5, 10, 0, 0))
    );
}
