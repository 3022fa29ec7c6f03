//! Splitting a recurring series into past and future halves.

use chrono::{DateTime as UtcDateTime, Utc};

use crate::core::{
    CalDateTime, Calendar, Component, ComponentKind, DateTime, Property, RRuleUntil, Value,
};
use crate::error::{IcalError, IcalResult};
use crate::expand::derive::offset_by;
use crate::expand::timezone::TzResolver;

/// Rebuilds every `name` property on `comp`, keeping only date values whose
/// UTC instant satisfies `keep`. Properties left with no values are removed.
fn filter_date_props(
    comp: &mut Component,
    name: &str,
    resolver: &TzResolver,
    keep: &dyn Fn(UtcDateTime<Utc>) -> bool,
) -> IcalResult<()> {
    let mut rebuilt: Vec<Property> = Vec::new();
    for prop in comp.get_properties(name) {
        let new_value = match prop.value() {
            Value::Date(d) => {
                keep(resolver.to_utc(&CalDateTime::Date(*d))?).then(|| Value::Date(*d))
            }
            Value::DateTime(dt) => {
                keep(resolver.datetime_to_utc(dt)?).then(|| Value::DateTime(dt.clone()))
            }
            Value::DateList(ds) => {
                let mut kept = Vec::new();
                for d in ds {
                    if keep(resolver.to_utc(&CalDateTime::Date(*d))?) {
                        kept.push(*d);
                    }
                }
                (!kept.is_empty()).then(|| Value::DateList(kept))
            }
            Value::DateTimeList(dts) => {
                let mut kept = Vec::new();
                for dt in dts {
                    if keep(resolver.datetime_to_utc(dt)?) {
                        kept.push(dt.clone());
                    }
                }
                (!kept.is_empty()).then(|| Value::DateTimeList(kept))
            }
            Value::Period(p) => {
                keep(resolver.datetime_to_utc(p.start())?).then(|| Value::Period(p.clone()))
            }
            Value::PeriodList(ps) => {
                let mut kept = Vec::new();
                for p in ps {
                    if keep(resolver.datetime_to_utc(p.start())?) {
                        kept.push(p.clone());
                    }
                }
                (!kept.is_empty()).then(|| Value::PeriodList(kept))
            }
            other => Some(other.clone()),
        };
        if let Some(value) = new_value {
            let raw = value.to_ical_string();
            rebuilt.push(Property::from_parts(&prop.name, prop.params.clone(), value, raw));
        }
    }
    comp.remove_properties(name);
    for prop in rebuilt {
        comp.add_property(prop);
    }
    Ok(())
}

/// Per-instance recurrence ids of a per-user overlay child, in order.
fn per_instance_rids(
    peruser: &Component,
    resolver: &TzResolver,
) -> IcalResult<Vec<Option<UtcDateTime<Utc>>>> {
    let mut rids = Vec::new();
    for child in peruser.children() {
        if child.kind() == ComponentKind::PerInstance {
            rids.push(match child.recurrence_id() {
                Some(rid) => Some(resolver.to_utc(&rid)?),
                None => None,
            });
        } else {
            rids.push(None);
        }
    }
    Ok(rids)
}

impl Calendar {
    fn split_at(
        &mut self,
        rid: &CalDateTime,
        keep_future: bool,
    ) -> IcalResult<()> {
        let resolver = TzResolver::from_calendar(self);
        let rid_utc = resolver.to_utc(rid)?;
        let keep = move |t: UtcDateTime<Utc>| {
            if keep_future { t >= rid_utc } else { t < rid_utc }
        };

        // Decide override retention before taking &mut.
        let mut override_keep: Vec<bool> = Vec::new();
        for child in self.root().children() {
            let retain = if child.is_override() {
                match child.recurrence_id() {
                    Some(orid) => keep(resolver.to_utc(&orid)?),
                    None => true,
                }
            } else {
                true
            };
            override_keep.push(retain);
        }

        // Master rewrite.
        let dtstart = self.master_component().and_then(Component::dtstart);
        if let Some(master) = self.master_component_mut() {
            if keep_future {
                // Shift the series start to the split point, keeping the rule.
                let span = match (dtstart.as_ref(), master.dtend()) {
                    (Some(start), Some(end)) => match (start.to_naive(), end.to_naive()) {
                        (Some(s), Some(e)) => Some(e - s),
                        _ => None,
                    },
                    _ => None,
                };
                let had_due = master.kind() == ComponentKind::Todo && master.has_property("DUE");
                let end_name = if had_due { "DUE" } else { "DTEND" };
                let had_end = master.has_property(end_name);
                master.replace_property(Property::caldatetime("DTSTART", rid));
                if had_end {
                    if let Some(end) = span.and_then(|s| offset_by(rid, s)) {
                        master.remove_properties(end_name);
                        master.add_property(Property::caldatetime(end_name, &end));
                    }
                }
            } else {
                // Cap the rule one second before the split point.
                let until = match &dtstart {
                    Some(start) if start.is_date_only() => {
                        offset_by(rid, chrono::Duration::days(-1)).and_then(|v| match v {
                            CalDateTime::Date(d) => Some(RRuleUntil::Date(d)),
                            CalDateTime::DateTime(_) => None,
                        })
                    }
                    _ => Some(RRuleUntil::DateTime(DateTime::from_utc(
                        rid_utc - chrono::Duration::seconds(1),
                    ))),
                };
                let until = until.ok_or_else(|| {
                    IcalError::InvalidCalendarData(format!("cannot cap series at {rid}"))
                })?;
                let rewrites: Vec<Option<Value>> = master
                    .get_properties("RRULE")
                    .iter()
                    .map(|p| {
                        p.value().as_recur().map(|r| {
                            let mut r = r.clone();
                            r.count = None;
                            r.until = Some(until.clone());
                            Value::Recur(Box::new(r))
                        })
                    })
                    .collect();
                let mut idx = 0;
                for prop in master.properties_mut() {
                    if prop.name.eq_ignore_ascii_case("RRULE") {
                        if let Some(Some(value)) = rewrites.get(idx) {
                            prop.set_value(value.clone());
                        }
                        idx += 1;
                    }
                }
            }
            filter_date_props(master, "RDATE", &resolver, &keep)?;
            filter_date_props(master, "EXDATE", &resolver, &keep)?;
        }

        // Drop overrides on the wrong side of the split.
        let mut decisions = override_keep.into_iter();
        self.root_mut().retain_children(|_| decisions.next().unwrap_or(true));
        Ok(())
    }

    /// Keeps only instances at or after `rid`: the master DTSTART/DTEND move
    /// to the split point, earlier RDATE/EXDATE values and overrides are
    /// dropped, and per-user per-instance blocks are filtered alike.
    pub fn only_future_instances(&mut self, rid: &CalDateTime) -> IcalResult<()> {
        self.split_and_filter(rid, true)
    }

    /// Keeps only instances strictly before `rid`: the rule is capped with
    /// UNTIL one second before the split point, later RDATE/EXDATE values and
    /// overrides are dropped, and per-user per-instance blocks are filtered
    /// alike.
    pub fn only_past_instances(&mut self, rid: &CalDateTime) -> IcalResult<()> {
        self.split_and_filter(rid, false)
    }

    fn split_and_filter(&mut self, rid: &CalDateTime, keep_future: bool) -> IcalResult<()> {
        self.split_at(rid, keep_future)?;

        // Per-user blocks, re-evaluated on the post-split tree.
        let resolver = TzResolver::from_calendar(self);
        let rid_utc = resolver.to_utc(rid)?;
        let keep = |t: UtcDateTime<Utc>| if keep_future { t >= rid_utc } else { t < rid_utc };
        let mut plans: Vec<Option<Vec<bool>>> = Vec::new();
        for child in self.root().children() {
            if child.kind() == ComponentKind::PerUser {
                let rids = per_instance_rids(child, &resolver)?;
                plans.push(Some(rids.into_iter().map(|r| r.is_none_or(keep)).collect()));
            } else {
                plans.push(None);
            }
        }
        for (child, plan) in self.root_mut().children_mut().iter_mut().zip(plans) {
            if let Some(plan) = plan {
                let mut decisions = plan.into_iter();
                child.retain_children(|_| decisions.next().unwrap_or(true));
            }
        }
        Ok(())
    }
}
