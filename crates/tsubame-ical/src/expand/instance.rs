//! Instance expansion: (RRULE ∪ RDATE) \ EXDATE resolved against overrides.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime as UtcDateTime, Utc};

use crate::core::{CalDateTime, Calendar, Component, Value};
use crate::error::{IcalError, IcalResult};
use crate::expand::timezone::TzResolver;

/// Hard cap on occurrences generated from a single rule set.
pub const MAX_INSTANCES: usize = 10_000;

/// One concrete occurrence of a recurring (or single) component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    /// The occurrence's recurrence id (the generated start for the master,
    /// the RECURRENCE-ID for overrides).
    pub rid: UtcDateTime<Utc>,
    pub start: UtcDateTime<Utc>,
    pub end: UtcDateTime<Utc>,
    /// True when the governing DTSTART is date-only.
    pub all_day: bool,
    /// Index of the override component in the root's child list, when this
    /// instance is overridden.
    pub override_index: Option<usize>,
}

/// The expansion result: recurrence id → instance, plus the horizon it was
/// computed for. Cached on the calendar and dropped on any tree mutation.
#[derive(Debug, Clone)]
pub struct InstanceSet {
    map: BTreeMap<UtcDateTime<Utc>, Instance>,
    /// Upper expansion horizon this set is valid for.
    pub limit: UtcDateTime<Utc>,
    /// Lower cutoff actually applied, None when nothing was dropped.
    pub lower_limit: Option<UtcDateTime<Utc>>,
}

impl InstanceSet {
    #[must_use]
    pub fn get(&self, rid: UtcDateTime<Utc>) -> Option<&Instance> {
        self.map.get(&rid)
    }

    #[must_use]
    pub fn contains(&self, rid: UtcDateTime<Utc>) -> bool {
        self.map.contains_key(&rid)
    }

    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.map.values()
    }

    /// Recurrence ids in ascending order.
    pub fn rids(&self) -> impl Iterator<Item = UtcDateTime<Utc>> + '_ {
        self.map.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The span a component's instances cover, from DTEND/DUE, DURATION, or the
/// defaults (one day for all-day starts, zero otherwise).
pub(crate) fn component_span(
    comp: &Component,
    resolver: &TzResolver,
    dtstart: &CalDateTime,
) -> IcalResult<chrono::Duration> {
    if let Some(end) = comp.dtend() {
        let start_utc = resolver.to_utc(dtstart)?;
        let end_utc = resolver.to_utc(&end)?;
        return Ok(end_utc - start_utc);
    }
    if let Some(duration) = comp.duration_value() {
        return Ok(duration.to_chrono());
    }
    if dtstart.is_date_only() {
        Ok(chrono::Duration::days(1))
    } else {
        Ok(chrono::Duration::zero())
    }
}

pub(crate) fn list_utc(
    comp: &Component,
    name: &str,
    resolver: &TzResolver,
) -> IcalResult<Vec<UtcDateTime<Utc>>> {
    let mut out = Vec::new();
    for prop in comp.get_properties(name) {
        match prop.value() {
            Value::Period(p) => out.push(resolver.datetime_to_utc(p.start())?),
            Value::PeriodList(ps) => {
                for p in ps {
                    out.push(resolver.datetime_to_utc(p.start())?);
                }
            }
            other => {
                for v in other.caldatetimes() {
                    out.push(resolver.to_utc(&v)?);
                }
            }
        }
    }
    Ok(out)
}

/// The recurrence ids a master's rules produce: RRULE occurrences plus
/// RDATE values, without the bare DTSTART and before EXDATE subtraction.
pub(crate) fn rule_rids(
    master: &Component,
    resolver: &TzResolver,
    dtstart: &CalDateTime,
    limit: Option<UtcDateTime<Utc>>,
) -> IcalResult<BTreeSet<UtcDateTime<Utc>>> {
    let mut rids: BTreeSet<UtcDateTime<Utc>> = BTreeSet::new();

    let rrules = master.get_properties("RRULE");
    if !rrules.is_empty() {
        let mut input = dtstart_feed_line(resolver, dtstart)?;
        for prop in &rrules {
            input.push_str("\nRRULE:");
            input.push_str(prop.raw_value());
        }
        let set: rrule::RRuleSet =
            input.parse().map_err(|e: rrule::RRuleError| IcalError::Recurrence(e.to_string()))?;
        for occ in set.into_iter() {
            let utc = occ.with_timezone(&Utc);
            if limit.is_some_and(|l| utc >= l) {
                break;
            }
            rids.insert(utc);
            if rids.len() >= MAX_INSTANCES {
                break;
            }
        }
    }

    for rdate in list_utc(master, "RDATE", resolver)? {
        if limit.is_none_or(|l| rdate < l) {
            rids.insert(rdate);
        }
    }
    Ok(rids)
}

/// Generates the master's effective recurrence-id set up to `limit`:
/// (RRULE ∪ RDATE ∪ {DTSTART}) \ EXDATE, all compared as UTC instants.
pub(crate) fn master_rids(
    master: &Component,
    resolver: &TzResolver,
    dtstart: &CalDateTime,
    limit: Option<UtcDateTime<Utc>>,
) -> IcalResult<BTreeSet<UtcDateTime<Utc>>> {
    let dtstart_utc = resolver.to_utc(dtstart)?;
    let mut rids = rule_rids(master, resolver, dtstart, limit)?;

    if limit.is_none_or(|l| dtstart_utc < l) {
        rids.insert(dtstart_utc);
    }
    for exdate in list_utc(master, "EXDATE", resolver)? {
        rids.remove(&exdate);
    }
    Ok(rids)
}

/// Renders the DTSTART feed line for the occurrence generator: resolved IANA
/// zones keep their wall-clock form, everything else is fed as UTC.
fn dtstart_feed_line(resolver: &TzResolver, dtstart: &CalDateTime) -> IcalResult<String> {
    if let CalDateTime::DateTime(dt) = dtstart {
        if let Some(tzid) = dt.tzid() {
            if let Some(tz) = resolver.iana(tzid) {
                if let Some(naive) = dt.to_naive() {
                    return Ok(format!(
                        "DTSTART;TZID={}:{}",
                        tz.name(),
                        naive.format("%Y%m%dT%H%M%S")
                    ));
                }
            }
        }
    }
    let utc = resolver.to_utc(dtstart)?;
    Ok(format!("DTSTART:{}Z", utc.naive_utc().format("%Y%m%dT%H%M%S")))
}

fn expand_calendar(
    cal: &Calendar,
    limit: UtcDateTime<Utc>,
    lower_limit: Option<UtcDateTime<Utc>>,
    ignore_invalid_instances: bool,
) -> IcalResult<InstanceSet> {
    let resolver = TzResolver::from_calendar(cal);
    let mut map: BTreeMap<UtcDateTime<Utc>, Instance> = BTreeMap::new();

    let master = cal.master_component();
    if let Some(master) = master {
        let dtstart = master.dtstart().ok_or_else(|| {
            IcalError::InvalidCalendarData("recurring component has no DTSTART".into())
        })?;
        let all_day = dtstart.is_date_only();
        let span = component_span(master, &resolver, &dtstart)?;
        for rid in master_rids(master, &resolver, &dtstart, Some(limit))? {
            map.insert(
                rid,
                Instance { rid, start: rid, end: rid + span, all_day, override_index: None },
            );
        }
    }

    for (idx, comp) in cal.root().children().iter().enumerate() {
        if !comp.is_override() {
            continue;
        }
        let Some(rid_value) = comp.recurrence_id() else { continue };
        let rid = resolver.to_utc(&rid_value)?;
        // With no master present each override stands for itself.
        if master.is_some() && !map.contains_key(&rid) {
            if ignore_invalid_instances {
                continue;
            }
            return Err(IcalError::InvalidOverriddenInstance(rid_value.to_string()));
        }
        let dtstart = comp.dtstart().unwrap_or_else(|| rid_value.clone());
        let start = resolver.to_utc(&dtstart)?;
        if start >= limit {
            map.remove(&rid);
            continue;
        }
        let span = component_span(comp, &resolver, &dtstart)?;
        map.insert(
            rid,
            Instance {
                rid,
                start,
                end: start + span,
                all_day: dtstart.is_date_only(),
                override_index: Some(idx),
            },
        );
    }

    let mut applied_lower = None;
    if let Some(lower) = lower_limit {
        let before = map.len();
        map.retain(|_, inst| inst.end > lower);
        if map.len() != before {
            applied_lower = Some(lower);
        }
    }

    Ok(InstanceSet { map, limit, lower_limit: applied_lower })
}

impl Calendar {
    /// Expands the recurrence set up to `limit`, resolving overrides.
    ///
    /// Results are memoized by horizon: a cached set whose horizon covers
    /// the requested one is reused verbatim, so the returned set may be a
    /// superset of the requested window, with instances past `limit` or
    /// before `lower_limit`. Callers selecting a range must filter by it
    /// rather than iterate the set blindly. Any tree mutation drops the
    /// memo.
    #[tracing::instrument(skip(self))]
    pub fn expand_time_ranges(
        &mut self,
        limit: UtcDateTime<Utc>,
        lower_limit: Option<UtcDateTime<Utc>>,
        ignore_invalid_instances: bool,
    ) -> IcalResult<&InstanceSet> {
        let reusable = self.instances.as_ref().is_some_and(|cached| {
            cached.limit >= limit
                && match (cached.lower_limit, lower_limit) {
                    (None, _) => true,
                    (Some(applied), Some(requested)) => applied <= requested,
                    (Some(_), None) => false,
                }
        });
        if !reusable {
            let set = expand_calendar(self, limit, lower_limit, ignore_invalid_instances)?;
            self.instances = Some(set);
        }
        self.instances.as_ref().ok_or(IcalError::Core(
            tsubame_core::error::CoreError::InvariantViolation("instance memo missing"),
        ))
    }

    /// True iff `rid` is the master (None) or an exact expanded instance.
    pub fn valid_instance(&mut self, rid: Option<UtcDateTime<Utc>>) -> IcalResult<bool> {
        match rid {
            None => Ok(true),
            Some(rid) => Ok(self.valid_instances(&[rid])?.contains(&rid)),
        }
    }

    /// The subset of `rids` that are exact expanded instances.
    pub fn valid_instances(
        &mut self,
        rids: &[UtcDateTime<Utc>],
    ) -> IcalResult<BTreeSet<UtcDateTime<Utc>>> {
        let Some(max) = rids.iter().max().copied() else {
            return Ok(BTreeSet::new());
        };
        let limit = max + chrono::Duration::seconds(1);
        let set = self.expand_time_ranges(limit, None, true)?;
        Ok(rids.iter().copied().filter(|rid| set.contains(*rid)).collect())
    }

    /// Short-circuiting check for any instance ending after `cutoff`.
    ///
    /// Unbounded rules answer immediately; bounded series stop at the first
    /// qualifying occurrence instead of materializing instances.
    pub fn has_instances_after(&mut self, cutoff: UtcDateTime<Utc>) -> IcalResult<bool> {
        let resolver = TzResolver::from_calendar(self);

        for comp in self.root().children() {
            if !comp.is_override() {
                continue;
            }
            if let Some(dtstart) = comp.dtstart() {
                let start = resolver.to_utc(&dtstart)?;
                let span = component_span(comp, &resolver, &dtstart)?;
                if start + span > cutoff {
                    return Ok(true);
                }
            }
        }

        let Some(master) = self.master_component() else {
            return Ok(false);
        };
        let Some(dtstart) = master.dtstart() else {
            return Ok(false);
        };
        if self.is_recurring_unbounded() {
            return Ok(true);
        }
        let span = component_span(master, &resolver, &dtstart)?;
        let exdates: BTreeSet<UtcDateTime<Utc>> =
            list_utc(master, "EXDATE", &resolver)?.into_iter().collect();

        let dtstart_utc = resolver.to_utc(&dtstart)?;
        if !exdates.contains(&dtstart_utc) && dtstart_utc + span > cutoff {
            return Ok(true);
        }
        for rdate in list_utc(master, "RDATE", &resolver)? {
            if !exdates.contains(&rdate) && rdate + span > cutoff {
                return Ok(true);
            }
        }

        // Stream the bounded rule occurrence by occurrence rather than
        // materializing the whole recurrence-id set.
        let rrules = master.get_properties("RRULE");
        if !rrules.is_empty() {
            let mut input = dtstart_feed_line(&resolver, &dtstart)?;
            for prop in &rrules {
                input.push_str("\nRRULE:");
                input.push_str(prop.raw_value());
            }
            let set: rrule::RRuleSet = input
                .parse()
                .map_err(|e: rrule::RRuleError| IcalError::Recurrence(e.to_string()))?;
            for occ in set.into_iter().take(MAX_INSTANCES) {
                let rid = occ.with_timezone(&Utc);
                if !exdates.contains(&rid) && rid + span > cutoff {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
