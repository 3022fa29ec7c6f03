//! iCalendar text parsing (RFC 5545 §3.1).

pub mod error;
pub mod lexer;
mod parser;
pub mod values;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use parser::parse;

use crate::core::Calendar;
use crate::error::{IcalError, IcalResult};

/// Parses calendar text read back from storage.
///
/// Stored data we wrote ourselves always begins with `BEGIN:VCALENDAR` and
/// ends with `END:VCALENDAR`; anything else means the stored resource was
/// corrupted (truncated write, foreign file) and is reported as such rather
/// than as a plain parse error.
pub fn parse_stored(text: &str) -> IcalResult<Calendar> {
    let trimmed = text.trim_start_matches('\u{feff}').trim();
    if !trimmed.starts_with("BEGIN:VCALENDAR") || !trimmed.ends_with("END:VCALENDAR") {
        return Err(IcalError::CorruptStoredData(
            "stored data is not bounded by BEGIN:VCALENDAR/END:VCALENDAR".into(),
        ));
    }
    Ok(parse(trimmed)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_data_must_be_bounded() {
        let err = parse_stored("not a calendar").unwrap_err();
        assert!(matches!(err, IcalError::CorruptStoredData(_)));

        let truncated = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:u1\r\n";
        let err = parse_stored(truncated).unwrap_err();
        assert!(matches!(err, IcalError::CorruptStoredData(_)));
    }

    #[test]
    fn stored_data_accepts_valid_calendar() {
        let text = concat!(
            "BEGIN:VCALENDAR\r\n",
            "VERSION:2.0\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:u1\r\n",
            "DTSTART:20110101T120000Z\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        );
        assert!(parse_stored(text).is_ok());
    }
}
