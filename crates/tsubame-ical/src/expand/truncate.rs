//! Bounding runaway recurrence rules.

use crate::core::{Calendar, RRule, RRuleUntil, Value};
use crate::error::{IcalError, IcalResult};
use crate::expand::timezone::TzResolver;

/// Estimated occurrence count for an UNTIL-bounded rule: span divided by the
/// rule's nominal period, inclusive of the first occurrence.
fn estimated_count(rrule: &RRule, span_seconds: i64) -> i64 {
    let Some(freq) = rrule.freq else { return 0 };
    let period = freq.period_seconds() * i64::from(rrule.effective_interval());
    if span_seconds <= 0 || period <= 0 {
        return 1;
    }
    span_seconds / period + 1
}

impl Calendar {
    /// True iff the master carries a rule with neither COUNT nor UNTIL.
    #[must_use]
    pub fn is_recurring_unbounded(&self) -> bool {
        self.master_component().is_some_and(|master| {
            master
                .get_properties("RRULE")
                .iter()
                .any(|p| p.value().as_recur().is_some_and(RRule::is_unbounded))
        })
    }

    /// Caps every master rule that could generate more than `max_instances`
    /// occurrences by rewriting it to `COUNT=max_instances`. Returns whether
    /// anything changed; rules already bounded below the cap are untouched.
    pub fn truncate_recurrence(&mut self, max_instances: u32) -> IcalResult<bool> {
        let resolver = TzResolver::from_calendar(self);
        let dtstart_utc = match self.master_component().and_then(|m| m.dtstart()) {
            Some(dtstart) => Some(resolver.to_utc(&dtstart)?),
            None => None,
        };

        let Some(master) = self.master_component() else {
            return Ok(false);
        };
        let mut rewrites: Vec<Option<RRule>> = Vec::new();
        let mut changed = false;
        for prop in master.get_properties("RRULE") {
            let Some(rrule) = prop.value().as_recur() else {
                rewrites.push(None);
                continue;
            };
            let needs_cap = if let Some(count) = rrule.count {
                count > max_instances
            } else if let Some(until) = &rrule.until {
                let until_utc = match until {
                    RRuleUntil::Date(d) => {
                        resolver.to_utc(&crate::core::CalDateTime::Date(*d))?
                    }
                    RRuleUntil::DateTime(dt) => resolver.datetime_to_utc(dt)?,
                };
                let span = dtstart_utc.map_or(0, |s| (until_utc - s).num_seconds());
                estimated_count(rrule, span) > i64::from(max_instances)
            } else {
                true
            };
            if needs_cap {
                let mut rewritten = rrule.clone();
                rewritten.count = Some(max_instances);
                rewritten.until = None;
                changed = true;
                rewrites.push(Some(rewritten));
            } else {
                rewrites.push(None);
            }
        }

        if changed {
            let master = self.master_component_mut().ok_or(IcalError::Core(
                tsubame_core::error::CoreError::InvariantViolation("master disappeared"),
            ))?;
            let mut idx = 0;
            for prop in master.properties_mut() {
                if prop.name.eq_ignore_ascii_case("RRULE") {
                    if let Some(Some(rewritten)) = rewrites.get(idx) {
                        prop.set_value(Value::Recur(Box::new(rewritten.clone())));
                    }
                    idx += 1;
                }
            }
        }
        Ok(changed)
    }
}
