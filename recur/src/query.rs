// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Range queries over the occurrences of components.

use std::cmp::Ordering;
use std::ops::ControlFlow;
use std::sync::Arc;

use jiff::{Span, Timestamp};

use crate::component::{Component, ComponentEnd, ComponentKind};
use crate::config::ExpandConfig;
use crate::datetime::{DateTimeValue, Instance, TimeZoneRule, TimeZoneTable};
use crate::error::{QueryError, TimeZoneError};
use crate::resolve::{RecurrenceSet, SlotSource, instance_of};

/// One occurrence of a component.
#[derive(Debug, Clone, Copy)]
pub struct Occurrence<'a> {
    /// The slot in the recurrence set this occurrence fills
    pub recurrence_id: Instance,
    /// Start
    pub start: Instance,
    /// End, equal to the start for components without a length
    pub end: Instance,
    /// The base component, or the override that replaced this occurrence
    pub component: &'a Component,
    /// How the occurrence came to be
    pub kind: OccurrenceKind,
}

impl Occurrence<'_> {
    fn order(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then(self.recurrence_id.cmp(&other.recurrence_id))
    }
}

/// How an occurrence came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OccurrenceKind {
    /// From DTSTART or an RRULE
    Generated,
    /// From an RDATE
    Added,
    /// Replaced by an override
    Overridden,
}

/// Outcome of [`Expander::for_each_in_batch`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Components expanded without error
    pub expanded: usize,
    /// Occurrences handed to the callback
    pub occurrences: usize,
    /// Components that failed, by UID
    pub errors: Vec<(String, QueryError)>,
    /// Whether the callback stopped the batch
    pub stopped: bool,
}

impl BatchReport {
    /// Whether every component expanded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Expands components against a shared zone table.
///
/// Every query builds fresh iteration state; the expander itself is
/// read-only and can be shared between threads.
///
/// ```
/// use std::ops::ControlFlow;
/// use std::sync::Arc;
///
/// use aimcal_recur::{Component, ComponentKind, DateTimeValue, Expander, TimeZoneTable};
/// use jiff::Timestamp;
///
/// let component = Component::new(
///     "standup",
///     ComponentKind::Event,
///     "20240101T090000Z".parse::<DateTimeValue>().unwrap(),
/// )
/// .with_rrule("FREQ=WEEKLY;BYDAY=MO,WE,FR".parse().unwrap());
///
/// let expander = Expander::new(Arc::new(TimeZoneTable::new()));
/// let start: Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();
/// let end: Timestamp = "2024-01-08T00:00:00Z".parse().unwrap();
///
/// let mut days = Vec::new();
/// expander
///     .for_each_occurrence(&component, start, Some(end), |occurrence| {
///         days.push(occurrence.start.date().day());
///         ControlFlow::Continue(())
///     })
///     .unwrap();
/// assert_eq!(days, [1, 3, 5]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Expander {
    zones: Arc<TimeZoneTable>,
    max_occurrences: Option<usize>,
}

impl Expander {
    /// An expander resolving zones through `zones`.
    #[must_use]
    pub fn new(zones: Arc<TimeZoneTable>) -> Self {
        Self {
            zones,
            max_occurrences: None,
        }
    }

    /// Cap the number of occurrences a single query delivers.
    #[must_use]
    pub fn with_max_occurrences(mut self, max: usize) -> Self {
        self.max_occurrences = Some(max);
        self
    }

    /// An expander set up from configuration.
    ///
    /// ## Errors
    ///
    /// If a configured zone is unknown.
    pub fn from_config(config: &ExpandConfig) -> Result<Self, TimeZoneError> {
        Ok(Self {
            zones: Arc::new(config.time_zones()?),
            max_occurrences: config.max_occurrences,
        })
    }

    /// The zone table of the expander.
    #[must_use]
    pub fn zones(&self) -> &TimeZoneTable {
        &self.zones
    }

    /// Occurrences of `component` starting in `[start, end)`, in order.
    ///
    /// ## Errors
    ///
    /// - [`QueryError::Unbounded`] if `end` is `None` and a rule has neither
    ///   COUNT nor UNTIL
    /// - [`QueryError::InvalidRange`] if `end` is before `start`
    /// - [`QueryError::InvalidRule`] if a rule fails validation
    pub fn occurrences<'a>(
        &'a self,
        component: &'a Component,
        start: Timestamp,
        end: Option<Timestamp>,
    ) -> Result<Occurrences<'a>, QueryError> {
        if let Some(end) = end
            && end < start
        {
            return Err(QueryError::InvalidRange { start, end });
        }
        if end.is_none() && !component.is_bounded() {
            return Err(QueryError::Unbounded {
                uid: component.uid.clone(),
            });
        }

        let zones: &'a TimeZoneTable = &self.zones;
        let set =
            RecurrenceSet::new(component, zones).map_err(|source| QueryError::InvalidRule {
                uid: component.uid.clone(),
                source,
            })?;
        let zone = zones.zone_of(&component.dtstart);
        let length = Length::of(zones, component);

        let mut moved: Vec<Occurrence<'a>> = Vec::new();
        for o in &component.exceptions.overrides {
            let Some(recurrence_id) = instance_of(zones, zone, &o.recurrence_id) else {
                continue;
            };
            if moved.iter().any(|m| m.recurrence_id == recurrence_id) {
                tracing::debug!(%recurrence_id, "duplicate override ignored");
                continue;
            }
            if !set.contains(recurrence_id.timestamp()) {
                tracing::debug!(%recurrence_id, "override of a missing occurrence ignored");
                continue;
            }

            let own_zone = zones.zone_of(&o.component.dtstart);
            let Some(begin) = instance_of(zones, own_zone, &o.component.dtstart) else {
                continue;
            };
            if begin.timestamp() < start {
                continue;
            }
            moved.push(Occurrence {
                recurrence_id,
                start: begin,
                end: Length::of(zones, &o.component).end_of(own_zone, begin),
                component: &o.component,
                kind: OccurrenceKind::Overridden,
            });
        }
        moved.sort_by(Occurrence::order);

        let mut set = set;
        set.skip_to(start);
        Ok(Occurrences {
            set: Some(set),
            component,
            zone,
            length,
            moved,
            next_moved: 0,
            pending: None,
            end: end.map(|t| t.as_second()),
            remaining: self.max_occurrences,
        })
    }

    /// Call `callback` with every occurrence of `component` starting in
    /// `[start, end)`, in order, until it returns [`ControlFlow::Break`].
    ///
    /// No further candidate is computed once the callback breaks or the first
    /// slot at or after `end` is seen.
    ///
    /// ## Errors
    ///
    /// As [`Expander::occurrences`].
    #[tracing::instrument(skip_all, fields(uid = %component.uid))]
    pub fn for_each_occurrence<'a, F>(
        &'a self,
        component: &'a Component,
        start: Timestamp,
        end: Option<Timestamp>,
        mut callback: F,
    ) -> Result<(), QueryError>
    where
        F: FnMut(Occurrence<'a>) -> ControlFlow<()>,
    {
        for occurrence in self.occurrences(component, start, end)? {
            if callback(occurrence).is_break() {
                tracing::debug!("stopped by callback");
                break;
            }
        }
        Ok(())
    }

    /// Expand several components into one callback. A component that fails
    /// is recorded in the report and the others still expand; a
    /// [`ControlFlow::Break`] from the callback ends the whole batch.
    #[tracing::instrument(skip_all)]
    pub fn for_each_in_batch<'a, I, F>(
        &'a self,
        components: I,
        start: Timestamp,
        end: Option<Timestamp>,
        mut callback: F,
    ) -> BatchReport
    where
        I: IntoIterator<Item = &'a Component>,
        F: FnMut(Occurrence<'a>) -> ControlFlow<()>,
    {
        let mut report = BatchReport::default();
        for component in components {
            let occurrences = match self.occurrences(component, start, end) {
                Ok(occurrences) => occurrences,
                Err(err) => {
                    tracing::warn!(uid = %component.uid, %err, "skipping component");
                    report.errors.push((component.uid.clone(), err));
                    continue;
                }
            };

            report.expanded += 1;
            for occurrence in occurrences {
                report.occurrences += 1;
                if callback(occurrence).is_break() {
                    report.stopped = true;
                    return report;
                }
            }
        }
        report
    }

    /// Whether `recurrence_id` names a slot of the recurrence set of
    /// `component`. Excluded slots are not occurrences unless overridden.
    ///
    /// ## Errors
    ///
    /// If a rule fails validation.
    pub fn is_occurrence(
        &self,
        component: &Component,
        recurrence_id: &DateTimeValue,
    ) -> Result<bool, QueryError> {
        let set = RecurrenceSet::new(component, &self.zones).map_err(|source| {
            QueryError::InvalidRule {
                uid: component.uid.clone(),
                source,
            }
        })?;
        let zone = self.zones.zone_of(&component.dtstart);
        Ok(instance_of(&self.zones, zone, recurrence_id)
            .is_some_and(|instance| set.contains(instance.timestamp())))
    }
}

/// Iterator over the occurrences of one component in a range.
#[derive(Debug)]
pub struct Occurrences<'a> {
    /// `None` once a slot at or after the range end was seen
    set: Option<RecurrenceSet<'a>>,
    component: &'a Component,
    zone: &'a TimeZoneRule,
    length: Length,
    moved: Vec<Occurrence<'a>>,
    next_moved: usize,
    pending: Option<Occurrence<'a>>,
    end: Option<i64>,
    remaining: Option<usize>,
}

impl<'a> Occurrences<'a> {
    /// Next occurrence of the base component, overridden slots left out.
    fn next_generated(&mut self) -> Option<Occurrence<'a>> {
        let set = self.set.as_mut()?;
        loop {
            let Some(slot) = set.next() else {
                self.set = None;
                return None;
            };
            let utc = slot.instance.utc();
            if self.end.is_some_and(|end| utc >= end) {
                self.set = None;
                return None;
            }
            if set.is_overridden(utc) {
                continue;
            }

            return Some(Occurrence {
                recurrence_id: slot.instance,
                start: slot.instance,
                end: slot
                    .end
                    .unwrap_or_else(|| self.length.end_of(self.zone, slot.instance)),
                component: self.component,
                kind: match slot.source {
                    SlotSource::Date => OccurrenceKind::Added,
                    SlotSource::Start | SlotSource::Rule => OccurrenceKind::Generated,
                },
            });
        }
    }
}

impl<'a> Iterator for Occurrences<'a> {
    type Item = Occurrence<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            tracing::debug!(uid = %self.component.uid, "occurrence limit reached");
            return None;
        }

        if self.pending.is_none() {
            self.pending = self.next_generated();
        }
        let end = self.end;
        let moved = self
            .moved
            .get(self.next_moved)
            .filter(|o| end.is_none_or(|end| o.start.utc() < end));

        let next = match (self.pending, moved) {
            (Some(generated), Some(moved)) if moved.order(&generated).is_lt() => {
                self.next_moved += 1;
                Some(*moved)
            }
            (Some(_), _) => self.pending.take(),
            (None, Some(moved)) => {
                let moved = *moved;
                self.next_moved += 1;
                Some(moved)
            }
            (None, None) => None,
        };

        if next.is_some()
            && let Some(remaining) = &mut self.remaining
        {
            *remaining -= 1;
        }
        next
    }
}

/// Length of the occurrences of a component.
#[derive(Debug, Clone, Copy)]
enum Length {
    /// Whole days on the wall clock
    Days(i64),
    /// Exact seconds
    Seconds(i64),
    Span(Span),
}

impl Length {
    fn of(zones: &TimeZoneTable, component: &Component) -> Self {
        match &component.end {
            Some(ComponentEnd::Duration(span)) => Self::Span(*span),
            Some(ComponentEnd::DtEnd(end)) => match (&component.dtstart, end) {
                (DateTimeValue::Date(start), DateTimeValue::Date(end)) => {
                    Self::Days(start.until(*end).map_or(0, |span| i64::from(span.get_days())))
                }
                (start, end) => Self::Seconds(zones.utc_seconds(end) - zones.utc_seconds(start)),
            },
            // An all-day event without an end takes its day
            None if component.dtstart.is_date() && component.kind == ComponentKind::Event => {
                Self::Days(1)
            }
            None => Self::Seconds(0),
        }
    }

    fn end_of(self, zone: &TimeZoneRule, start: Instance) -> Instance {
        let end = match self {
            Self::Seconds(0) => Some(start),
            Self::Seconds(seconds) => Instance::from_utc(zone, start.utc() + seconds),
            Self::Days(days) => Span::new()
                .try_days(days)
                .ok()
                .and_then(|span| start.add_span(zone, &span)),
            Self::Span(span) => start.add_span(zone, &span),
        };
        end.unwrap_or(start)
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, datetime};

    use super::*;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn utc(y: i16, m: i8, d: i8, h: i8) -> DateTimeValue {
        DateTimeValue::Utc(datetime(y, m, d, h, 0, 0, 0))
    }

    fn expander() -> Expander {
        Expander::new(Arc::new(TimeZoneTable::new()))
    }

    fn starts(expander: &Expander, component: &Component, start: &str, end: &str) -> Vec<String> {
        expander
            .occurrences(component, ts(start), Some(ts(end)))
            .unwrap()
            .map(|o| o.start.to_string())
            .collect()
    }

    #[test]
    fn unbounded_without_end_is_rejected() {
        let component = Component::new("forever", ComponentKind::Event, utc(2024, 1, 1, 9))
            .with_rrule("FREQ=DAILY".parse().unwrap());
        let err = expander()
            .for_each_occurrence(&component, ts("2024-01-01T00:00:00Z"), None, |_| {
                ControlFlow::Continue(())
            })
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::Unbounded {
                uid: "forever".to_string()
            }
        );
    }

    #[test]
    fn bounded_without_end_runs_out() {
        let component = Component::new("count", ComponentKind::Event, utc(2024, 1, 1, 9))
            .with_rrule("FREQ=DAILY;COUNT=4".parse().unwrap());
        let expander = expander();
        let all: Vec<_> = expander
            .occurrences(&component, ts("2024-01-02T00:00:00Z"), None)
            .unwrap()
            .collect();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn reversed_range_is_rejected() {
        let component = Component::new("single", ComponentKind::Event, utc(2024, 1, 1, 9));
        let err = expander()
            .occurrences(
                &component,
                ts("2024-02-01T00:00:00Z"),
                Some(ts("2024-01-01T00:00:00Z")),
            )
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidRange { .. }));
    }

    #[test]
    fn window_is_half_open() {
        let component = Component::new("daily", ComponentKind::Event, utc(2024, 1, 1, 9))
            .with_rrule("FREQ=DAILY".parse().unwrap());
        let got = starts(
            &expander(),
            &component,
            "2024-01-03T09:00:00Z",
            "2024-01-05T09:00:00Z",
        );
        assert_eq!(got, ["2024-01-03T09:00:00", "2024-01-04T09:00:00"]);
    }

    #[test]
    fn callback_stops_early() {
        let component = Component::new("daily", ComponentKind::Event, utc(2024, 1, 1, 9))
            .with_rrule("FREQ=DAILY".parse().unwrap());
        let mut seen = 0;
        expander()
            .for_each_occurrence(
                &component,
                ts("2024-01-01T00:00:00Z"),
                Some(ts("2025-01-01T00:00:00Z")),
                |_| {
                    seen += 1;
                    if seen == 3 {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                },
            )
            .unwrap();
        assert_eq!(seen, 3);
    }

    #[test]
    fn moved_override_is_delivered_at_its_new_time() {
        let moved = Component::new("daily", ComponentKind::Event, utc(2024, 1, 4, 18))
            .with_summary("moved");
        let component = Component::new("daily", ComponentKind::Event, utc(2024, 1, 1, 9))
            .with_rrule("FREQ=DAILY;COUNT=5".parse().unwrap())
            .with_override(utc(2024, 1, 2, 9), moved);

        let expander = expander();
        let occurrences: Vec<_> = expander
            .occurrences(
                &component,
                ts("2024-01-01T00:00:00Z"),
                Some(ts("2024-02-01T00:00:00Z")),
            )
            .unwrap()
            .collect();
        let got: Vec<_> = occurrences
            .iter()
            .map(|o| (o.start.to_string(), o.kind))
            .collect();
        assert_eq!(
            got,
            [
                ("2024-01-01T09:00:00".to_string(), OccurrenceKind::Generated),
                ("2024-01-03T09:00:00".to_string(), OccurrenceKind::Generated),
                ("2024-01-04T09:00:00".to_string(), OccurrenceKind::Generated),
                ("2024-01-04T18:00:00".to_string(), OccurrenceKind::Overridden),
                ("2024-01-05T09:00:00".to_string(), OccurrenceKind::Generated),
            ]
        );
        let overridden = &occurrences[3];
        assert_eq!(overridden.recurrence_id.to_string(), "2024-01-02T09:00:00");
        assert_eq!(overridden.component.summary.as_deref(), Some("moved"));
    }

    #[test]
    fn override_of_missing_slot_is_ignored() {
        let stray = Component::new("daily", ComponentKind::Event, utc(2024, 1, 2, 12));
        let component = Component::new("daily", ComponentKind::Event, utc(2024, 1, 1, 9))
            .with_rrule("FREQ=DAILY;COUNT=3".parse().unwrap())
            .with_override(utc(2024, 1, 2, 10), stray);
        let got = starts(
            &expander(),
            &component,
            "2024-01-01T00:00:00Z",
            "2024-02-01T00:00:00Z",
        );
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn ends_follow_the_component_length() {
        let component = Component::new("meeting", ComponentKind::Event, utc(2024, 1, 1, 9))
            .with_end(ComponentEnd::DtEnd(utc(2024, 1, 1, 10)))
            .with_rrule("FREQ=WEEKLY;COUNT=2".parse().unwrap());
        let expander = expander();
        let ends: Vec<_> = expander
            .occurrences(&component, ts("2024-01-01T00:00:00Z"), None)
            .unwrap()
            .map(|o| o.end.to_string())
            .collect();
        assert_eq!(ends, ["2024-01-01T10:00:00", "2024-01-08T10:00:00"]);

        let all_day = Component::new(
            "holiday",
            ComponentKind::Event,
            DateTimeValue::Date(date(2024, 12, 25)),
        )
        .with_rrule("FREQ=YEARLY;COUNT=1".parse().unwrap());
        let occurrence = expander
            .occurrences(&all_day, ts("2024-01-01T00:00:00Z"), None)
            .unwrap()
            .next()
            .unwrap();
        assert_eq!(occurrence.end.to_string(), "2024-12-26");
    }

    #[test]
    fn limit_caps_a_query() {
        let component = Component::new("daily", ComponentKind::Event, utc(2024, 1, 1, 9))
            .with_rrule("FREQ=DAILY".parse().unwrap());
        let expander = expander().with_max_occurrences(10);
        let got = starts(
            &expander,
            &component,
            "2024-01-01T00:00:00Z",
            "2025-01-01T00:00:00Z",
        );
        assert_eq!(got.len(), 10);
    }

    #[test]
    fn batch_keeps_going_past_failures() {
        let good = Component::new("good", ComponentKind::Event, utc(2024, 1, 1, 9))
            .with_rrule("FREQ=DAILY;COUNT=2".parse().unwrap());
        let mut bad_rule = crate::RecurrenceRule::new(crate::RecurrenceFrequency::Daily);
        bad_rule.interval = 0;
        let bad = Component::new("bad", ComponentKind::Event, utc(2024, 1, 1, 9))
            .with_rrule(bad_rule);
        let forever = Component::new("forever", ComponentKind::Todo, utc(2024, 1, 1, 9))
            .with_rrule("FREQ=DAILY".parse().unwrap());

        let mut uids = Vec::new();
        let report = expander().for_each_in_batch(
            [&bad, &forever, &good],
            ts("2024-01-01T00:00:00Z"),
            None,
            |o| {
                uids.push(o.component.uid.clone());
                ControlFlow::Continue(())
            },
        );
        assert_eq!(uids, ["good", "good"]);
        assert_eq!(report.expanded, 1);
        assert_eq!(report.occurrences, 2);
        assert_eq!(report.errors.len(), 2);
        assert!(!report.stopped);
        assert!(!report.is_ok());
    }

    #[test]
    fn is_occurrence_checks_slots() {
        let component = Component::new("daily", ComponentKind::Event, utc(2024, 1, 1, 9))
            .with_rrule("FREQ=DAILY;COUNT=3".parse().unwrap())
            .with_exdate(utc(2024, 1, 2, 9));
        let expander = expander();
        assert!(expander.is_occurrence(&component, &utc(2024, 1, 3, 9)).unwrap());
        assert!(!expander.is_occurrence(&component, &utc(2024, 1, 2, 9)).unwrap());
        assert!(!expander.is_occurrence(&component, &utc(2024, 1, 4, 9)).unwrap());
    }
}
