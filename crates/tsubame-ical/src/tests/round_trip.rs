use super::fixtures::{WEEKLY_WITH_OVERRIDE, cal};
use crate::parse::{parse, parse_stored};

#[test_log::test]
fn parse_serialize_preserves_semantics() {
    let original = cal(WEEKLY_WITH_OVERRIDE);
    let reparsed = parse(&original.serialized()).unwrap();
    assert!(original.same_calendar_data(&reparsed));
}

#[test_log::test]
fn long_lines_fold_and_unfold() {
    let summary = "planning session ".repeat(12);
    let text = format!(
        concat!(
            "BEGIN:VCALENDAR\r\n",
            "VERSION:2.0\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:fold-1\r\n",
            "DTSTART:20110101T120000Z\r\n",
            "DTSTAMP:20110101T120000Z\r\n",
            "SUMMARY:{summary}\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        ),
        summary = summary
    );
    let calendar = parse(&text).unwrap();
    let out = calendar.serialized();

    // Every physical line obeys the 75-octet limit.
    for line in out.split("\r\n") {
        assert!(line.len() <= 75, "line too long: {line:?}");
    }
    let again = parse(&out).unwrap();
    assert_eq!(
        again.master_component().and_then(|m| m.summary().map(str::to_owned)),
        Some(summary)
    );
}

#[test_log::test]
fn escaped_text_survives_round_trip() {
    let text = concat!(
        "BEGIN:VCALENDAR\r\n",
        "VERSION:2.0\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:esc-1\r\n",
        "DTSTART:20110101T120000Z\r\n",
        "DTSTAMP:20110101T120000Z\r\n",
        "DESCRIPTION:line one\\nsemi\\; comma\\, backslash\\\\ done\r\n",
        "END:VEVENT\r\n",
        "END:VCALENDAR\r\n",
    );
    let calendar = parse(text).unwrap();
    let description = calendar
        .master_component()
        .and_then(|m| m.get_property("DESCRIPTION"))
        .and_then(|p| p.as_text().map(str::to_owned))
        .unwrap();
    assert_eq!(description, "line one\nsemi; comma, backslash\\ done");

    let reparsed = parse(&calendar.serialized()).unwrap();
    assert!(calendar.same_calendar_data(&reparsed));
}

#[test_log::test]
fn caret_escaped_param_survives_round_trip() {
    let text = concat!(
        "BEGIN:VCALENDAR\r\n",
        "VERSION:2.0\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:caret-1\r\n",
        "DTSTART:20110101T120000Z\r\n",
        "DTSTAMP:20110101T120000Z\r\n",
        "SUMMARY;X-NOTE=\"up^^next\":status\r\n",
        "END:VEVENT\r\n",
        "END:VCALENDAR\r\n",
    );
    let calendar = parse(text).unwrap();
    let note = calendar
        .master_component()
        .and_then(|m| m.get_property("SUMMARY"))
        .and_then(|p| p.param_value("X-NOTE").map(str::to_owned));
    assert_eq!(note.as_deref(), Some("up^next"));

    // Serializing keeps the caret encoded, so a second parse sees the
    // same value instead of decoding a stray ^n into a newline.
    let once = calendar.serialized();
    let reparsed = parse(&once).unwrap();
    let note = reparsed
        .master_component()
        .and_then(|m| m.get_property("SUMMARY"))
        .and_then(|p| p.param_value("X-NOTE").map(str::to_owned));
    assert_eq!(note.as_deref(), Some("up^next"));
    assert_eq!(once, reparsed.serialized());
}

#[test_log::test]
fn stored_data_integrity_check() {
    assert!(parse_stored("\u{feff}BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n").is_ok());
    assert!(parse_stored("BEGIN:VEVENT\r\nEND:VEVENT\r\n").is_err());
    assert!(parse_stored("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n").is_err());
}
