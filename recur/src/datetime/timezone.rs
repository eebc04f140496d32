// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Time zones as offset tables, and the table of zones shared by queries.

use std::collections::HashMap;

use jiff::civil::DateTime;
use jiff::tz::{Offset, TimeZone};
use jiff::{Timestamp, civil};

use crate::datetime::DateTimeValue;
use crate::datetime::calendar::{SECONDS_PER_DAY, epoch_day, local_seconds};
use crate::error::TimeZoneError;
use crate::expand::RuleIter;
use crate::rrule::RecurrenceRule;

/// Identifier of the UTC zone.
pub const UTC_ID: &str = "UTC";

/// A named time zone: a mapping from instants to UTC offsets.
#[derive(Debug, Clone)]
pub struct TimeZoneRule {
    id: String,
    source: OffsetSource,
}

#[derive(Debug, Clone)]
enum OffsetSource {
    Fixed(i32),
    Iana(TimeZone),
    /// Sorted by instant, each entry is the offset in effect from that instant on
    Transitions {
        initial: i32,
        table: Vec<(i64, i32)>,
    },
}

/// How a wall-clock date-time maps onto the timeline of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalTime {
    /// Exactly one instant
    Unique(Timestamp),
    /// Clocks were turned back, the wall clock happens twice
    Ambiguous {
        /// Instant under the offset before the transition
        earlier: Timestamp,
        /// Instant under the offset after the transition
        later: Timestamp,
    },
    /// Clocks were turned forward, the wall clock never happens
    Skipped {
        /// Instant of the transition, the first valid wall clock after the gap
        transition: Timestamp,
    },
}

impl LocalTime {
    /// The instant picked for this wall clock: the earlier one of a fold, the
    /// transition instant of a gap.
    #[must_use]
    pub const fn resolved(self) -> Timestamp {
        match self {
            LocalTime::Unique(ts) => ts,
            LocalTime::Ambiguous { earlier, .. } => earlier,
            LocalTime::Skipped { transition } => transition,
        }
    }
}

enum Local {
    Unique(i64),
    Fold(i64, i64),
    Gap(i64),
}

impl TimeZoneRule {
    /// The UTC zone.
    #[must_use]
    pub fn utc() -> Self {
        Self::fixed(UTC_ID, Offset::UTC)
    }

    /// A zone with a constant offset.
    pub fn fixed(id: impl Into<String>, offset: Offset) -> Self {
        Self {
            id: id.into(),
            source: OffsetSource::Fixed(offset.seconds()),
        }
    }

    /// Wrap an already loaded jiff time zone.
    pub fn from_jiff(id: impl Into<String>, tz: TimeZone) -> Self {
        Self {
            id: id.into(),
            source: OffsetSource::Iana(tz),
        }
    }

    /// Look up an IANA zone in the bundled time zone database.
    ///
    /// ## Errors
    ///
    /// If the database has no zone of that name.
    pub fn iana(name: &str) -> Result<Self, TimeZoneError> {
        TimeZone::get(name)
            .map(|tz| Self::from_jiff(name, tz))
            .map_err(|_| TimeZoneError::Unknown(name.to_string()))
    }

    /// A zone from explicit offset transitions.
    ///
    /// `initial` applies before the first transition. Transitions may be given
    /// in any order.
    pub fn from_transitions(
        id: impl Into<String>,
        initial: Offset,
        transitions: impl IntoIterator<Item = Transition>,
    ) -> Self {
        let mut table: Vec<(i64, i32)> = transitions
            .into_iter()
            .map(|t| (t.at.as_second(), t.offset.seconds()))
            .collect();
        table.sort_by_key(|(at, _)| *at);
        table.dedup_by_key(|(at, _)| *at);

        Self {
            id: id.into(),
            source: OffsetSource::Transitions {
                initial: initial.seconds(),
                table,
            },
        }
    }

    /// Build a zone from VTIMEZONE style observances, expanding their onset
    /// rules up to the end of `until_year`.
    ///
    /// ## Errors
    ///
    /// If an observance carries a rule that fails validation.
    pub fn from_observances(
        id: impl Into<String>,
        observances: &[Observance],
        until_year: i16,
    ) -> Result<Self, TimeZoneError> {
        let id = id.into();
        let utc = Self::utc();
        let horizon = local_seconds(civil::date(until_year, 12, 31).at(23, 59, 59, 0));

        // (instant, offset before, offset after)
        let mut onsets: Vec<(i64, i32, i32)> = Vec::new();
        for observance in observances {
            let from = observance.offset_from.seconds();
            let to = observance.offset_to.seconds();
            let mut push = |local: i64| onsets.push((local - i64::from(from), from, to));

            push(local_seconds(observance.start));
            for rdate in &observance.rdates {
                push(local_seconds(*rdate));
            }
            if let Some(rule) = &observance.rrule {
                let iter = RuleIter::new(rule, observance.start, &utc).map_err(|source| {
                    TimeZoneError::InvalidObservance {
                        tz_id: id.clone(),
                        source,
                    }
                })?;
                for instance in iter {
                    let local = instance.timestamp().as_second();
                    if local > horizon {
                        break;
                    }
                    push(local);
                }
            }
        }
        onsets.sort_by_key(|(at, _, _)| *at);
        onsets.dedup_by_key(|(at, _, _)| *at);

        let initial = onsets.first().map_or(0, |(_, from, _)| *from);
        let table = onsets.into_iter().map(|(at, _, to)| (at, to)).collect();
        Ok(Self {
            id,
            source: OffsetSource::Transitions { initial, table },
        })
    }

    /// Identifier of the zone.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// UTC offset in effect at an instant.
    #[must_use]
    pub fn offset_at(&self, timestamp: Timestamp) -> Offset {
        let seconds = self.offset_seconds(timestamp.as_second());
        Offset::from_seconds(seconds).unwrap_or(Offset::UTC)
    }

    /// Wall clock of an instant in this zone.
    #[must_use]
    pub fn to_datetime(&self, timestamp: Timestamp) -> DateTime {
        self.offset_at(timestamp).to_datetime(timestamp)
    }

    /// Instant of a wall clock in this zone, earlier instant on a fold and
    /// the transition instant on a gap.
    ///
    /// ## Errors
    ///
    /// If the instant is outside the range jiff supports.
    pub fn to_timestamp(&self, datetime: DateTime) -> Result<Timestamp, jiff::Error> {
        Timestamp::from_second(self.local_to_utc(local_seconds(datetime)))
    }

    /// Classify how a wall clock maps onto the timeline.
    ///
    /// ## Errors
    ///
    /// If an instant is outside the range jiff supports.
    pub fn resolve_local(&self, datetime: DateTime) -> Result<LocalTime, jiff::Error> {
        Ok(match self.classify(local_seconds(datetime)) {
            Local::Unique(t) => LocalTime::Unique(Timestamp::from_second(t)?),
            Local::Fold(earlier, later) => LocalTime::Ambiguous {
                earlier: Timestamp::from_second(earlier)?,
                later: Timestamp::from_second(later)?,
            },
            Local::Gap(t) => LocalTime::Skipped {
                transition: Timestamp::from_second(t)?,
            },
        })
    }

    pub(crate) fn offset_seconds(&self, utc: i64) -> i32 {
        match &self.source {
            OffsetSource::Fixed(offset) => *offset,
            OffsetSource::Iana(tz) => {
                let ts = Timestamp::from_second(utc).unwrap_or(if utc < 0 {
                    Timestamp::MIN
                } else {
                    Timestamp::MAX
                });
                tz.to_offset(ts).seconds()
            }
            OffsetSource::Transitions { initial, table } => {
                match table.partition_point(|(at, _)| *at <= utc) {
                    0 => *initial,
                    i => table.get(i - 1).map_or(*initial, |(_, offset)| *offset),
                }
            }
        }
    }

    pub(crate) fn utc_to_local(&self, utc: i64) -> i64 {
        utc + i64::from(self.offset_seconds(utc))
    }

    pub(crate) fn local_to_utc(&self, local: i64) -> i64 {
        match self.classify(local) {
            Local::Unique(t) => t,
            Local::Fold(earlier, _) => {
                tracing::trace!(zone = %self.id, local, "ambiguous wall clock, using earlier");
                earlier
            }
            Local::Gap(transition) => {
                tracing::trace!(zone = %self.id, local, "skipped wall clock, moving forward");
                transition
            }
        }
    }

    /// Offsets a day either side stand for the offsets around any transition
    /// near `local`.
    fn classify(&self, local: i64) -> Local {
        if let OffsetSource::Fixed(offset) = self.source {
            return Local::Unique(local - i64::from(offset));
        }

        let before = i64::from(self.offset_seconds(local - SECONDS_PER_DAY));
        let after = i64::from(self.offset_seconds(local + SECONDS_PER_DAY));
        let (t1, t2) = (local - before, local - after);
        let valid = |t: i64, offset: i64| i64::from(self.offset_seconds(t)) == offset;

        match (valid(t1, before), valid(t2, after)) {
            (true, true) if t1 != t2 => Local::Fold(t1.min(t2), t1.max(t2)),
            (true, _) => Local::Unique(t1),
            (false, true) => Local::Unique(t2),
            (false, false) => {
                // In a gap t2 is still under the old offset and t1 already
                // under the new one.
                let (mut lo, mut hi) = (t1.min(t2), t1.max(t2));
                while hi - lo > 1 {
                    let mid = lo + (hi - lo) / 2;
                    if valid(mid, after) {
                        hi = mid;
                    } else {
                        lo = mid;
                    }
                }
                Local::Gap(hi)
            }
        }
    }
}

impl Default for TimeZoneRule {
    fn default() -> Self {
        Self::utc()
    }
}

/// An offset change, used to build a [`TimeZoneRule`] from explicit data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Instant the new offset takes effect
    pub at: Timestamp,
    /// Offset from that instant on
    pub offset: Offset,
}

/// Kind of a time zone observance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[expect(missing_docs)]
pub enum ObservanceKind {
    Standard,
    Daylight,
}

/// A STANDARD or DAYLIGHT sub-component of a VTIMEZONE.
#[derive(Debug, Clone)]
pub struct Observance {
    /// Standard or daylight time
    pub kind: ObservanceKind,
    /// First onset, a wall clock under `offset_from`
    pub start: DateTime,
    /// Offset before the onset
    pub offset_from: Offset,
    /// Offset after the onset
    pub offset_to: Offset,
    /// Rule of later onsets
    pub rrule: Option<RecurrenceRule>,
    /// Extra onsets, wall clocks under `offset_from`
    pub rdates: Vec<DateTime>,
    /// Customary name, e.g. "EST"
    pub name: Option<String>,
}

/// Read-only set of zones a query resolves TZIDs against.
///
/// Build it once, wrap it in an `Arc` and share it between threads.
#[derive(Debug, Clone)]
pub struct TimeZoneTable {
    zones: HashMap<String, TimeZoneRule>,
    floating: TimeZoneRule,
    utc: TimeZoneRule,
}

/// Where a date-time value sits: its zone and wall clock.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Anchor<'z> {
    pub zone: &'z TimeZoneRule,
    pub local: i64,
    pub all_day: bool,
}

impl TimeZoneTable {
    /// An empty table with UTC as floating zone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `floating` to place floating and date-only values on the timeline.
    #[must_use]
    pub fn with_floating(mut self, floating: TimeZoneRule) -> Self {
        self.floating = floating;
        self
    }

    /// Add a zone, replacing any zone with the same id.
    pub fn insert(&mut self, zone: TimeZoneRule) -> Option<TimeZoneRule> {
        self.zones.insert(zone.id.clone(), zone)
    }

    /// Load an IANA zone from the bundled database into the table.
    ///
    /// ## Errors
    ///
    /// If the database has no zone of that name.
    pub fn load_iana(&mut self, name: &str) -> Result<(), TimeZoneError> {
        if !self.zones.contains_key(name) {
            self.insert(TimeZoneRule::iana(name)?);
        }
        Ok(())
    }

    /// Zone with the given id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TimeZoneRule> {
        self.zones.get(id)
    }

    /// Zone of floating and date-only values.
    #[must_use]
    pub fn floating(&self) -> &TimeZoneRule {
        &self.floating
    }

    /// Zone a value's wall clock is read in. Unknown TZIDs fall back to the
    /// floating zone.
    pub(crate) fn zone_of(&self, value: &DateTimeValue) -> &TimeZoneRule {
        match value {
            DateTimeValue::Date(_) | DateTimeValue::Floating(_) => &self.floating,
            DateTimeValue::Utc(_) => &self.utc,
            DateTimeValue::Zoned { tz_id, .. } => match self.zones.get(tz_id) {
                Some(zone) => zone,
                None if tz_id == UTC_ID => &self.utc,
                None => {
                    tracing::warn!(%tz_id, "unknown timezone, treating as floating");
                    &self.floating
                }
            },
        }
    }

    pub(crate) fn anchor(&self, value: &DateTimeValue) -> Anchor<'_> {
        let zone = self.zone_of(value);
        match value {
            DateTimeValue::Date(date) => Anchor {
                zone,
                local: epoch_day(*date) * SECONDS_PER_DAY,
                all_day: true,
            },
            DateTimeValue::Floating(dt)
            | DateTimeValue::Utc(dt)
            | DateTimeValue::Zoned { datetime: dt, .. } => Anchor {
                zone,
                local: local_seconds(*dt),
                all_day: false,
            },
        }
    }

    /// Absolute instant of a value, in seconds.
    pub(crate) fn utc_seconds(&self, value: &DateTimeValue) -> i64 {
        let anchor = self.anchor(value);
        anchor.zone.local_to_utc(anchor.local)
    }
}

impl Default for TimeZoneTable {
    fn default() -> Self {
        Self {
            zones: HashMap::new(),
            floating: TimeZoneRule::utc(),
            utc: TimeZoneRule::utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::datetime;
    use jiff::tz::offset;

    use super::*;
    use crate::rrule::{RecurrenceFrequency, WeekDay, WeekDayNum};

    fn new_york() -> TimeZoneRule {
        TimeZoneRule::iana("America/New_York").unwrap()
    }

    #[test]
    fn resolves_unique_wall_clock() {
        let ts = new_york()
            .to_timestamp(datetime(2024, 1, 15, 9, 0, 0, 0))
            .unwrap();
        assert_eq!(ts.to_string(), "2024-01-15T14:00:00Z");
    }

    #[test]
    fn resolves_gap_to_transition() {
        let zone = new_york();
        let local = zone
            .resolve_local(datetime(2024, 3, 10, 2, 30, 0, 0))
            .unwrap();
        let expected: Timestamp = "2024-03-10T07:00:00Z".parse().unwrap();
        assert_eq!(local, LocalTime::Skipped { transition: expected });
        assert_eq!(local.resolved(), expected);
        assert_eq!(zone.to_datetime(expected), datetime(2024, 3, 10, 3, 0, 0, 0));
    }

    #[test]
    fn resolves_fold_to_earlier() {
        let local = new_york()
            .resolve_local(datetime(2024, 11, 3, 1, 30, 0, 0))
            .unwrap();
        let earlier: Timestamp = "2024-11-03T05:30:00Z".parse().unwrap();
        let later: Timestamp = "2024-11-03T06:30:00Z".parse().unwrap();
        assert_eq!(local, LocalTime::Ambiguous { earlier, later });
        assert_eq!(local.resolved(), earlier);
    }

    #[test]
    fn builds_zone_from_transitions() {
        let zone = TimeZoneRule::from_transitions(
            "Test/Zone",
            offset(1),
            [Transition {
                at: "2024-06-01T00:00:00Z".parse().unwrap(),
                offset: offset(2),
            }],
        );
        assert_eq!(
            zone.offset_at("2024-05-31T23:59:59Z".parse().unwrap()),
            offset(1)
        );
        assert_eq!(
            zone.offset_at("2024-06-01T00:00:00Z".parse().unwrap()),
            offset(2)
        );
        // 01:30 local on June 1st is skipped
        let local = zone
            .resolve_local(datetime(2024, 6, 1, 1, 30, 0, 0))
            .unwrap();
        assert!(matches!(local, LocalTime::Skipped { .. }));
    }

    #[test]
    fn builds_zone_from_observances() {
        let mut daylight_rule = RecurrenceRule::new(RecurrenceFrequency::Yearly);
        daylight_rule.by_month = vec![3];
        daylight_rule.by_day = vec![WeekDayNum::nth(2, WeekDay::Sunday)];
        let mut standard_rule = RecurrenceRule::new(RecurrenceFrequency::Yearly);
        standard_rule.by_month = vec![11];
        standard_rule.by_day = vec![WeekDayNum::nth(1, WeekDay::Sunday)];

        let observances = [
            Observance {
                kind: ObservanceKind::Daylight,
                start: datetime(2007, 3, 11, 2, 0, 0, 0),
                offset_from: offset(-5),
                offset_to: offset(-4),
                rrule: Some(daylight_rule),
                rdates: Vec::new(),
                name: Some("EDT".to_string()),
            },
            Observance {
                kind: ObservanceKind::Standard,
                start: datetime(2007, 11, 4, 2, 0, 0, 0),
                offset_from: offset(-4),
                offset_to: offset(-5),
                rrule: Some(standard_rule),
                rdates: Vec::new(),
                name: Some("EST".to_string()),
            },
        ];
        let zone = TimeZoneRule::from_observances("US-Eastern", &observances, 2030).unwrap();
        let iana = new_york();

        for ts in [
            "2024-03-10T06:59:59Z",
            "2024-03-10T07:00:00Z",
            "2024-07-01T12:00:00Z",
            "2024-11-03T05:59:59Z",
            "2024-11-03T06:00:00Z",
            "2024-12-25T12:00:00Z",
        ] {
            let ts: Timestamp = ts.parse().unwrap();
            assert_eq!(zone.offset_at(ts), iana.offset_at(ts), "at {ts}");
        }
    }

    #[test]
    fn table_falls_back_to_floating_for_unknown_zone() {
        let table = TimeZoneTable::new().with_floating(TimeZoneRule::fixed("Local", offset(8)));
        let value = DateTimeValue::Zoned {
            datetime: datetime(2024, 1, 1, 8, 0, 0, 0),
            tz_id: "Mars/Olympus_Mons".to_string(),
        };
        assert_eq!(table.zone_of(&value).id(), "Local");
        assert_eq!(table.utc_seconds(&value), 1_704_067_200);
    }

    #[test]
    fn table_resolves_utc_and_dates() {
        let mut table = TimeZoneTable::new();
        table.load_iana("America/New_York").unwrap();
        assert!(table.get("America/New_York").is_some());
        assert!(table.load_iana("Nowhere/Land").is_err());

        let utc = DateTimeValue::Utc(datetime(2024, 1, 1, 0, 0, 0, 0));
        assert_eq!(table.utc_seconds(&utc), 1_704_067_200);

        let date = DateTimeValue::Date(civil::date(2024, 1, 1));
        let anchor = table.anchor(&date);
        assert!(anchor.all_day);
        assert_eq!(anchor.local, 1_704_067_200);
    }
}
