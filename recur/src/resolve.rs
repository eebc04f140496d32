// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The recurrence set of a component: DTSTART, RRULE and RDATE merged in
//! order, less EXDATE and EXRULE, with overridden slots kept.

use jiff::Timestamp;

use crate::component::Component;
use crate::datetime::calendar::{SECONDS_PER_DAY, epoch_day};
use crate::datetime::{
    DateTimeValue, Instance, PeriodEnd, RDateValue, TimeZoneRule, TimeZoneTable,
};
use crate::expand::RuleIter;
use crate::rrule::{RecurrenceRule, ValidationError};

/// One slot of the recurrence set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Start of the slot, also its RECURRENCE-ID
    pub instance: Instance,
    /// Where the slot comes from
    pub source: SlotSource,
    /// End given by an RDATE period, if any
    pub end: Option<Instance>,
}

/// Origin of a slot. When sources coincide the first variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotSource {
    /// DTSTART
    Start,
    /// An RRULE
    Rule,
    /// An RDATE
    Date,
}

/// Strictly increasing stream of the slots of a component.
#[derive(Debug, Clone)]
pub struct RecurrenceSet<'a> {
    component: &'a Component,
    zones: &'a TimeZoneTable,
    start: Option<Instance>,
    rules: Vec<RuleIter<'a>>,
    dates: Vec<Slot>,
    next_date: usize,
    exrules: Vec<RuleIter<'a>>,
    /// Instants of DATE-TIME exdates, sorted
    excluded: Vec<i64>,
    /// Days of DATE exdates, sorted
    excluded_days: Vec<i64>,
    /// Instants of override RECURRENCE-IDs, sorted
    overridden: Vec<i64>,
    last: Option<i64>,
}

impl<'a> RecurrenceSet<'a> {
    /// Build the set of `component`, resolving zones through `zones`.
    ///
    /// ## Errors
    ///
    /// If an RRULE or EXRULE fails validation.
    pub fn new(
        component: &'a Component,
        zones: &'a TimeZoneTable,
    ) -> Result<Self, ValidationError> {
        let anchor = zones.anchor(&component.dtstart);
        let zone = anchor.zone;
        let start = Instance::from_local(zone, anchor.local, anchor.all_day);

        let rule_iter = |rule: &RecurrenceRule| match &component.dtstart {
            DateTimeValue::Date(date) => RuleIter::new_all_day(rule, *date, zone),
            value => RuleIter::new(rule, value.datetime(), zone),
        };
        let rules = component
            .rrules
            .iter()
            .map(rule_iter)
            .collect::<Result<Vec<_>, _>>()?;
        let exrules = component
            .exrules
            .iter()
            .map(rule_iter)
            .collect::<Result<Vec<_>, _>>()?;

        let mut dates: Vec<Slot> = component
            .exceptions
            .rdates
            .iter()
            .filter_map(|rdate| date_slot(zones, zone, rdate))
            .collect();
        dates.sort_by_key(|slot| slot.instance);
        dates.dedup_by_key(|slot| slot.instance.timestamp());

        let mut excluded = Vec::new();
        let mut excluded_days = Vec::new();
        for exdate in &component.exceptions.exdates {
            match exdate {
                DateTimeValue::Date(date) => excluded_days.push(epoch_day(*date)),
                value => excluded.push(zones.utc_seconds(value)),
            }
        }
        excluded.sort_unstable();
        excluded_days.sort_unstable();

        let mut overridden: Vec<i64> = component
            .exceptions
            .overrides
            .iter()
            .map(|o| zones.utc_seconds(&o.recurrence_id))
            .collect();
        overridden.sort_unstable();

        Ok(Self {
            component,
            zones,
            start,
            rules,
            dates,
            next_date: 0,
            exrules,
            excluded,
            excluded_days,
            overridden,
            last: None,
        })
    }

    /// Seek every source so that the next slot is the first at or after
    /// `target`.
    pub fn skip_to(&mut self, target: Timestamp) {
        if self.start.is_some_and(|start| start.timestamp() < target) {
            self.start = None;
        }
        for rule in &mut self.rules {
            rule.skip_to(target);
        }
        for exrule in &mut self.exrules {
            exrule.skip_to(target);
        }
        let pending = self.dates.get(self.next_date..).unwrap_or_default();
        self.next_date += pending.partition_point(|slot| slot.instance.timestamp() < target);
    }

    /// Whether a slot starts at `timestamp`, excluded slots not counting.
    ///
    /// Probes a fresh copy of the set, so the stream is left as it was.
    #[must_use]
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        let Ok(mut probe) = Self::new(self.component, self.zones) else {
            return false;
        };
        probe.skip_to(timestamp);
        probe
            .next()
            .is_some_and(|slot| slot.instance.timestamp() == timestamp)
    }

    /// Whether the slot at `utc` has an override.
    pub(crate) fn is_overridden(&self, utc: i64) -> bool {
        self.overridden.binary_search(&utc).is_ok()
    }

    fn is_excluded(&mut self, instance: &Instance) -> bool {
        let utc = instance.utc();
        if self.excluded.binary_search(&utc).is_ok() {
            return true;
        }
        if self
            .excluded_days
            .binary_search(&instance.local().div_euclid(SECONDS_PER_DAY))
            .is_ok()
        {
            return true;
        }

        let mut hit = false;
        for exrule in &mut self.exrules {
            while exrule.peek().is_some_and(|e| e.utc() < utc) {
                exrule.next();
            }
            hit |= exrule.peek().is_some_and(|e| e.utc() == utc);
        }
        hit
    }

    /// The earliest pending slot of all sources, consuming every source that
    /// lands on the same instant.
    fn pop_earliest(&mut self) -> Option<Slot> {
        let mut earliest = self.start.map(|i| i.utc());
        for rule in &mut self.rules {
            if let Some(head) = rule.peek() {
                earliest = Some(earliest.map_or(head.utc(), |e| e.min(head.utc())));
            }
        }
        if let Some(date) = self.dates.get(self.next_date) {
            let utc = date.instance.utc();
            earliest = Some(earliest.map_or(utc, |e| e.min(utc)));
        }
        let utc = earliest?;

        let mut slot: Option<Slot> = None;
        let mut merge = |candidate: Slot| match &mut slot {
            Some(existing) => existing.end = existing.end.or(candidate.end),
            None => slot = Some(candidate),
        };

        if let Some(start) = self.start.take_if(|start| start.utc() == utc) {
            merge(Slot {
                instance: start,
                source: SlotSource::Start,
                end: None,
            });
        }
        for rule in &mut self.rules {
            if rule.peek().is_some_and(|head| head.utc() == utc)
                && let Some(instance) = rule.next()
            {
                merge(Slot {
                    instance,
                    source: SlotSource::Rule,
                    end: None,
                });
            }
        }
        if let Some(date) = self.dates.get(self.next_date).filter(|d| d.instance.utc() == utc) {
            merge(*date);
            self.next_date += 1;
        }
        slot
    }
}

impl Iterator for RecurrenceSet<'_> {
    type Item = Slot;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let slot = self.pop_earliest()?;
            let utc = slot.instance.utc();
            if self.last.is_some_and(|last| utc <= last) {
                continue;
            }
            self.last = Some(utc);

            if self.is_excluded(&slot.instance) && !self.is_overridden(utc) {
                tracing::trace!(uid = %self.component.uid, at = %slot.instance, "slot excluded");
                continue;
            }
            return Some(slot);
        }
    }
}

/// Slot of an RDATE value, read in the component's zone.
fn date_slot(zones: &TimeZoneTable, zone: &TimeZoneRule, rdate: &RDateValue) -> Option<Slot> {
    let instance = instance_of(zones, zone, rdate.start())?;
    let end = match rdate {
        RDateValue::Instant(_) => None,
        RDateValue::Period {
            end: PeriodEnd::DateTime(end),
            ..
        } => instance_of(zones, zone, end),
        RDateValue::Period {
            end: PeriodEnd::Duration(span),
            ..
        } => instance.add_span(zone, span),
    };
    Some(Slot {
        instance,
        source: SlotSource::Date,
        end,
    })
}

/// Place a value on the timeline; timed values get the wall clock of `zone`.
pub(crate) fn instance_of(
    zones: &TimeZoneTable,
    zone: &TimeZoneRule,
    value: &DateTimeValue,
) -> Option<Instance> {
    let anchor = zones.anchor(value);
    if anchor.all_day {
        Instance::from_local(anchor.zone, anchor.local, true)
    } else {
        Instance::from_utc(zone, anchor.zone.local_to_utc(anchor.local))
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, datetime};

    use super::*;
    use crate::component::ComponentKind;

    fn floating(y: i16, m: i8, d: i8, h: i8) -> DateTimeValue {
        DateTimeValue::Floating(datetime(y, m, d, h, 0, 0, 0))
    }

    fn daily(count: u32) -> Component {
        Component::new("daily", ComponentKind::Event, floating(2024, 1, 1, 9))
            .with_rrule(format!("FREQ=DAILY;COUNT={count}").parse().unwrap())
    }

    fn days(set: RecurrenceSet<'_>) -> Vec<i8> {
        set.map(|slot| slot.instance.date().day()).collect()
    }

    #[test]
    fn dtstart_is_the_first_slot() {
        let zones = TimeZoneTable::new();
        let component = daily(3);
        let slots: Vec<_> = RecurrenceSet::new(&component, &zones).unwrap().collect();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].source, SlotSource::Start);
        assert_eq!(slots[1].source, SlotSource::Rule);
    }

    #[test]
    fn dtstart_off_the_rule_is_kept() {
        let zones = TimeZoneTable::new();
        // 2024-01-01 is a Monday
        let component = Component::new("weekly", ComponentKind::Event, floating(2024, 1, 1, 9))
            .with_rrule("FREQ=WEEKLY;BYDAY=WE;COUNT=2".parse().unwrap());
        let set = RecurrenceSet::new(&component, &zones).unwrap();
        assert_eq!(days(set), [1, 3, 10]);
    }

    #[test]
    fn exdate_removes_and_rdate_adds() {
        let zones = TimeZoneTable::new();
        let component = daily(5)
            .with_exdate(floating(2024, 1, 3, 9))
            .with_rdate(floating(2024, 1, 2, 12))
            .with_rdate(floating(2024, 1, 4, 9));
        let slots: Vec<_> = RecurrenceSet::new(&component, &zones).unwrap().collect();
        let got: Vec<_> = slots
            .iter()
            .map(|s| (s.instance.date().day(), s.instance.datetime().hour(), s.source))
            .collect();
        assert_eq!(
            got,
            [
                (1, 9, SlotSource::Start),
                (2, 9, SlotSource::Rule),
                (2, 12, SlotSource::Date),
                (4, 9, SlotSource::Rule),
                (5, 9, SlotSource::Rule),
            ]
        );
    }

    #[test]
    fn date_exdate_matches_the_whole_day() {
        let zones = TimeZoneTable::new();
        let component = daily(3).with_exdate(DateTimeValue::Date(date(2024, 1, 2)));
        assert_eq!(days(RecurrenceSet::new(&component, &zones).unwrap()), [1, 3]);
    }

    #[test]
    fn exrule_removes_slots() {
        let zones = TimeZoneTable::new();
        let component =
            daily(7).with_exrule("FREQ=DAILY;INTERVAL=2;COUNT=10".parse().unwrap());
        assert_eq!(days(RecurrenceSet::new(&component, &zones).unwrap()), [2, 4, 6]);
    }

    #[test]
    fn overridden_slots_survive_exclusion() {
        let zones = TimeZoneTable::new();
        let replacement =
            Component::new("daily", ComponentKind::Event, floating(2024, 1, 2, 15));
        let component = daily(3)
            .with_exdate(floating(2024, 1, 2, 9))
            .with_override(floating(2024, 1, 2, 9), replacement);
        assert_eq!(days(RecurrenceSet::new(&component, &zones).unwrap()), [1, 2, 3]);
    }

    #[test]
    fn rdate_periods_carry_their_end() {
        let zones = TimeZoneTable::new();
        let rdates = RDateValue::parse_list("20240105T100000/PT2H", None).unwrap();
        let mut component = daily(1);
        component.exceptions.rdates = rdates;
        let slots: Vec<_> = RecurrenceSet::new(&component, &zones).unwrap().collect();
        let end = slots[1].end.unwrap();
        assert_eq!(end.datetime(), datetime(2024, 1, 5, 12, 0, 0, 0));
    }

    #[test]
    fn skip_and_contains() {
        let zones = TimeZoneTable::new();
        let component = daily(10).with_exdate(floating(2024, 1, 6, 9));
        let mut set = RecurrenceSet::new(&component, &zones).unwrap();

        let at = |day: i8| {
            datetime(2024, 1, day, 9, 0, 0, 0)
                .to_zoned(jiff::tz::TimeZone::UTC)
                .unwrap()
                .timestamp()
        };
        assert!(set.contains(at(5)));
        assert!(!set.contains(at(6)));

        set.skip_to(at(5));
        assert_eq!(days(set.clone()), [5, 7, 8, 9, 10]);
        assert!(set.contains(at(2)));
    }
}
