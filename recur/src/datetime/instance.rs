// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display};

use jiff::civil::{Date, DateTime};
use jiff::{Span, Timestamp};

use crate::datetime::TimeZoneRule;
use crate::datetime::calendar::{SECONDS_PER_DAY, datetime_from_local_seconds, local_seconds};

/// A point on the timeline produced by expansion.
///
/// Ordered by instant first. The wall clock is the one of the component's
/// zone, after DST resolution, so equal instants carry equal wall clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instance {
    timestamp: Timestamp,
    datetime: DateTime,
    all_day: bool,
}

impl Instance {
    /// Place a wall clock of `zone` on the timeline.
    pub(crate) fn from_local(zone: &TimeZoneRule, local: i64, all_day: bool) -> Option<Self> {
        let utc = zone.local_to_utc(local);
        let wall = if all_day { local } else { zone.utc_to_local(utc) };
        Some(Self {
            timestamp: Timestamp::from_second(utc).ok()?,
            datetime: datetime_from_local_seconds(wall)?,
            all_day,
        })
    }

    /// A timed instance at `utc` seconds, read in `zone`.
    pub(crate) fn from_utc(zone: &TimeZoneRule, utc: i64) -> Option<Self> {
        Some(Self {
            timestamp: Timestamp::from_second(utc).ok()?,
            datetime: datetime_from_local_seconds(zone.utc_to_local(utc))?,
            all_day: false,
        })
    }

    /// The instant.
    #[must_use]
    pub const fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Wall clock in the component's zone, midnight for all-day instances.
    #[must_use]
    pub const fn datetime(&self) -> DateTime {
        self.datetime
    }

    /// Calendar date in the component's zone.
    #[must_use]
    pub fn date(&self) -> Date {
        self.datetime.date()
    }

    /// Whether the instance comes from a DATE value.
    #[must_use]
    pub const fn is_all_day(&self) -> bool {
        self.all_day
    }

    /// Shift by a duration: weeks and days move the wall clock, the time
    /// units are exact seconds on the timeline.
    pub(crate) fn add_span(&self, zone: &TimeZoneRule, span: &Span) -> Option<Self> {
        let days = i64::from(span.get_weeks()) * 7 + i64::from(span.get_days());
        let seconds = i64::from(span.get_hours()) * 3_600
            + span.get_minutes() * 60
            + span.get_seconds();
        let wall = self.local().checked_add(days.checked_mul(SECONDS_PER_DAY)?)?;
        if self.all_day && seconds == 0 {
            return Self::from_local(zone, wall, true);
        }
        let utc = zone.local_to_utc(wall).checked_add(seconds)?;
        Self::from_utc(zone, utc)
    }

    pub(crate) fn utc(&self) -> i64 {
        self.timestamp.as_second()
    }

    pub(crate) fn local(&self) -> i64 {
        local_seconds(self.datetime)
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.all_day {
            write!(f, "{}", self.date())
        } else {
            write!(f, "{}", self.datetime)
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::datetime;
    use jiff::tz::TimeZone;

    use super::*;

    fn new_york() -> TimeZoneRule {
        TimeZoneRule::from_jiff("America/New_York", TimeZone::get("America/New_York").unwrap())
    }

    #[test]
    fn days_keep_the_wall_clock_across_dst() {
        let zone = new_york();
        let start = Instance::from_local(
            &zone,
            local_seconds(datetime(2024, 3, 9, 9, 0, 0, 0)),
            false,
        )
        .unwrap();

        let next_day = start.add_span(&zone, &"P1D".parse().unwrap()).unwrap();
        assert_eq!(next_day.datetime(), datetime(2024, 3, 10, 9, 0, 0, 0));
        assert_eq!(next_day.timestamp().as_second() - start.timestamp().as_second(), 23 * 3_600);

        let a_day_of_hours = start.add_span(&zone, &"PT24H".parse().unwrap()).unwrap();
        assert_eq!(a_day_of_hours.datetime(), datetime(2024, 3, 10, 10, 0, 0, 0));
    }

    #[test]
    fn all_day_spans_stay_all_day() {
        let zone = TimeZoneRule::utc();
        let start =
            Instance::from_local(&zone, local_seconds(datetime(2024, 2, 28, 0, 0, 0, 0)), true)
                .unwrap();
        let end = start.add_span(&zone, &"P2D".parse().unwrap()).unwrap();
        assert!(end.is_all_day());
        assert_eq!(end.to_string(), "2024-03-01");
    }
}
