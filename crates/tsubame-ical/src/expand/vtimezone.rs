//! Offset rules from embedded VTIMEZONE components.
//!
//! Fallback for TZIDs that do not resolve to an IANA zone: the STANDARD and
//! DAYLIGHT observances carried in the calendar itself decide the offset.

use chrono::{NaiveDateTime, TimeZone, Utc};

use crate::core::{Component, ComponentKind, UtcOffset, Value};

const MAX_ONSETS: usize = 400;

/// One STANDARD or DAYLIGHT observance.
#[derive(Debug, Clone)]
struct Observance {
    onset: NaiveDateTime,
    to: UtcOffset,
    rrule: Option<String>,
    rdates: Vec<NaiveDateTime>,
}

/// Offset rules extracted from one VTIMEZONE.
#[derive(Debug, Clone)]
pub struct TimezoneModel {
    observances: Vec<Observance>,
    /// TZOFFSETFROM of the earliest observance, used before any onset.
    initial: UtcOffset,
}

impl TimezoneModel {
    /// Extracts offset rules from a VTIMEZONE component.
    ///
    /// Returns None when no observance carries the required DTSTART and
    /// TZOFFSETTO properties.
    #[must_use]
    pub fn from_component(vtz: &Component) -> Option<Self> {
        let mut observances = Vec::new();
        let mut initial: Option<(NaiveDateTime, UtcOffset)> = None;
        for child in vtz.children() {
            if !matches!(child.kind(), ComponentKind::Standard | ComponentKind::Daylight) {
                continue;
            }
            let onset = child.dtstart()?.to_naive()?;
            let to = offset_prop(child, "TZOFFSETTO")?;
            let from = offset_prop(child, "TZOFFSETFROM").unwrap_or(to);
            let rrule = child.get_property("RRULE").map(|p| p.raw_value().to_owned());
            let rdates = child
                .get_properties("RDATE")
                .iter()
                .flat_map(|p| p.value().caldatetimes())
                .filter_map(|v| v.to_naive())
                .collect();
            if initial.is_none_or(|(first, _)| onset < first) {
                initial = Some((onset, from));
            }
            observances.push(Observance { onset, to, rrule, rdates });
        }
        let (_, initial) = initial?;
        Some(Self { observances, initial })
    }

    /// The UTC offset in effect at the given wall-clock time.
    #[must_use]
    pub fn offset_at(&self, local: NaiveDateTime) -> UtcOffset {
        let mut best: Option<(NaiveDateTime, UtcOffset)> = None;
        for obs in &self.observances {
            for onset in obs.onsets_up_to(local) {
                if onset <= local && best.is_none_or(|(b, _)| onset > b) {
                    best = Some((onset, obs.to));
                }
            }
        }
        best.map_or(self.initial, |(_, to)| to)
    }
}

impl Observance {
    /// All onsets of this observance at or before `local`, in wall-clock
    /// terms. RRULE onsets are generated by feeding the rule with the
    /// observance's floating DTSTART rendered as a nominal UTC instant.
    fn onsets_up_to(&self, local: NaiveDateTime) -> Vec<NaiveDateTime> {
        let mut onsets = vec![self.onset];
        onsets.extend(self.rdates.iter().copied().filter(|d| *d <= local));
        if let Some(rrule) = &self.rrule {
            let input = format!(
                "DTSTART:{}Z\nRRULE:{rrule}",
                self.onset.format("%Y%m%dT%H%M%S")
            );
            if let Ok(set) = input.parse::<rrule::RRuleSet>() {
                let cutoff = Utc.from_utc_datetime(&local);
                for occ in set.into_iter().take(MAX_ONSETS) {
                    let occ = occ.with_timezone(&Utc);
                    if occ > cutoff {
                        break;
                    }
                    onsets.push(occ.naive_utc());
                }
            }
        }
        onsets
    }
}

fn offset_prop(comp: &Component, name: &str) -> Option<UtcOffset> {
    match comp.get_property(name)?.value() {
        Value::UtcOffset(o) => Some(*o),
        _ => None,
    }
}
