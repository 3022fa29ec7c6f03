use thiserror::Error;

use crate::parse::ParseError;

/// Calendar-data engine errors.
#[derive(Error, Debug)]
pub enum IcalError {
    /// Malformed iCalendar text; fatal to the parse call, never auto-fixed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Parsed but CalDAV-illegal calendar data.
    #[error("Invalid calendar data: {0}")]
    InvalidCalendarData(String),

    /// An override's RECURRENCE-ID does not correspond to any generated
    /// occurrence of the master rule set.
    #[error("Invalid overridden instance: {0}")]
    InvalidOverriddenInstance(String),

    /// Stored calendar text failed the integrity check at the storage
    /// boundary (not properly bounded by BEGIN/END:VCALENDAR).
    #[error("Corrupt stored calendar data: {0}")]
    CorruptStoredData(String),

    /// A TZID that neither resolves to an IANA zone nor matches an
    /// embedded VTIMEZONE.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Recurrence rule rejected by the occurrence generator.
    #[error("Recurrence rule error: {0}")]
    Recurrence(String),

    #[error(transparent)]
    Core(#[from] tsubame_core::error::CoreError),
}

pub type IcalResult<T> = std::result::Result<T, IcalError>;
