//! Calendar-data constants shared across crates.

/// PRODID stamped on calendars created by this engine.
pub const PRODID: &str = "-//tsubame.org//NONSGML Tsubame Calendar Engine//EN";

/// Component wrapping one user's private view of a shared calendar object.
pub const PERUSER_COMPONENT: &str = "X-CALENDARSERVER-PERUSER";

/// Component wrapping per-instance data inside a per-user component.
pub const PERINSTANCE_COMPONENT: &str = "X-CALENDARSERVER-PERINSTANCE";

/// Property naming the owning user inside a per-user component.
pub const PERUSER_UID: &str = "X-CALENDARSERVER-PERUSER-UID";

/// Private attendee comment property scanned for duplicates.
pub const ATTENDEE_COMMENT: &str = "X-CALENDARSERVER-ATTENDEE-COMMENT";

/// Per-component managed-attachment collection path.
pub const DROPBOX: &str = "X-APPLE-DROPBOX";

/// Parameter preserving the original TZID when a value is normalized to UTC.
pub const ORIGINAL_TZID_PARAM: &str = "X-VOBJ-ORIGINAL-TZID";

/// Parameter preserving a calendar user address replaced by a directory id.
pub const OLD_CUA_PARAM: &str = "X-CALENDARSERVER-OLD-CUA";
