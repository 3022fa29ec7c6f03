//! CalDAV resource-level checks (RFC 4791 §4.1).
//!
//! These apply to calendar object resources stored via CalDAV, on top of the
//! data-level validation: one calendar, one component kind, no METHOD unless
//! the request context allows scheduling messages.

use std::collections::BTreeSet;

use crate::core::{Calendar, Component, ComponentKind};
use crate::error::{IcalError, IcalResult};

impl Calendar {
    /// Validates this calendar as a CalDAV calendar object resource.
    ///
    /// `method_allowed` permits a METHOD property, for iTIP message bodies
    /// travelling through scheduling inboxes rather than ordinary storage.
    #[tracing::instrument(skip(self))]
    pub fn valid_calendar_for_caldav(&mut self, method_allowed: bool) -> IcalResult<()> {
        if self.version() != Some("2.0") {
            return Err(IcalError::InvalidCalendarData(format!(
                "calendar resources must be version 2.0, not {}",
                self.version().unwrap_or("missing")
            )));
        }
        if !method_allowed && self.root().has_property("METHOD") {
            return Err(IcalError::InvalidCalendarData(
                "calendar resources may not contain a METHOD property".into(),
            ));
        }

        let kinds: BTreeSet<&str> = self
            .root()
            .children()
            .iter()
            .filter(|c| resource_kind(c))
            .map(Component::name)
            .collect();
        if kinds.is_empty() {
            return Err(IcalError::InvalidCalendarData(
                "calendar resources must contain at least one calendar component".into(),
            ));
        }
        if kinds.len() > 1 {
            return Err(IcalError::InvalidCalendarData(format!(
                "calendar resources may not mix component types: {}",
                kinds.into_iter().collect::<Vec<_>>().join(", ")
            )));
        }

        self.valid_calendar_data(false, false)?;
        Ok(())
    }
}

/// Components that count toward the one-kind-per-resource rule. VTIMEZONE
/// and the per-user overlay are carriers, not resource content.
fn resource_kind(comp: &Component) -> bool {
    matches!(
        comp.kind(),
        ComponentKind::Event | ComponentKind::Todo | ComponentKind::Journal | ComponentKind::FreeBusy
    )
}
