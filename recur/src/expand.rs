// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Lazy expansion of a single recurrence rule.

mod period;
mod plan;

use std::collections::VecDeque;

use jiff::Timestamp;
use jiff::civil::{Date, DateTime};

use crate::datetime::calendar::{SECONDS_PER_DAY, epoch_day, local_seconds};
use crate::datetime::{DateTimeValue, Instance, TimeZoneRule};
use crate::expand::period::Periods;
use crate::expand::plan::{Day, Plan};
use crate::rrule::{RecurrenceFrequency, RecurrenceRule, ValidationError};

/// Iterator over the instances of one rule seeded at DTSTART.
///
/// Instances come out strictly increasing. Candidates before DTSTART are
/// dropped, wall clocks are placed on the timeline through the zone, and
/// candidates that land on the same instant (a DST gap, or sub-daily steps
/// of an all-day rule) are coalesced into one. DTSTART itself is not added
/// when it does not match the rule; that is up to the caller.
///
/// ```
/// use aimcal_recur::datetime::TimeZoneRule;
/// use aimcal_recur::expand::RuleIter;
/// use jiff::civil::date;
///
/// let rule = "FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1;COUNT=3".parse().unwrap();
/// let utc = TimeZoneRule::utc();
/// let days: Vec<_> = RuleIter::new(&rule, date(2024, 1, 1).at(9, 0, 0, 0), &utc)
///     .unwrap()
///     .map(|instance| instance.date())
///     .collect();
/// assert_eq!(days, [date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 29)]);
/// ```
#[derive(Debug, Clone)]
pub struct RuleIter<'z> {
    plan: Plan,
    periods: Periods,
    zone: &'z TimeZoneRule,
    all_day: bool,
    /// DTSTART in local seconds
    start: i64,
    times: Vec<i64>,
    until: Option<Until>,
    count: Option<u32>,
    emitted: u32,
    next_period: i64,
    last_productive: i64,
    /// Local seconds of the current period not yet emitted, sorted
    buffer: VecDeque<i64>,
    peeked: Option<Instance>,
    last_utc: Option<i64>,
    done: bool,
}

impl<'z> RuleIter<'z> {
    /// Expand `rule` from a DATE-TIME DTSTART, reading wall clocks in `zone`.
    ///
    /// ## Errors
    ///
    /// If the rule fails validation.
    pub fn new(
        rule: &RecurrenceRule,
        dtstart: DateTime,
        zone: &'z TimeZoneRule,
    ) -> Result<Self, ValidationError> {
        rule.validate()?;
        Ok(Self::build(rule, local_seconds(dtstart), zone, false))
    }

    /// Expand `rule` from a DATE DTSTART; instances are all-day.
    ///
    /// ## Errors
    ///
    /// If the rule fails validation.
    pub fn new_all_day(
        rule: &RecurrenceRule,
        dtstart: Date,
        zone: &'z TimeZoneRule,
    ) -> Result<Self, ValidationError> {
        rule.validate()?;
        Ok(Self::build(
            rule,
            epoch_day(dtstart) * SECONDS_PER_DAY,
            zone,
            true,
        ))
    }

    fn build(rule: &RecurrenceRule, start: i64, zone: &'z TimeZoneRule, all_day: bool) -> Self {
        let plan = Plan::new(rule, start);
        let mut periods = Periods::new(rule.freq, rule.interval, rule.week_start(), start);
        if !rule.by_week_no.is_empty() {
            periods = periods.with_week_years(start);
        }
        let times = match rule.freq {
            RecurrenceFrequency::Hourly => plan.times_of_hour(),
            RecurrenceFrequency::Minutely => plan.times_of_minute().to_vec(),
            RecurrenceFrequency::Secondly => vec![0],
            _ => plan.times_of_day(),
        };

        let reachable = match periods.step_seconds() {
            Some(step) => plan.time_reachable(periods.origin(), step),
            None => !rule.freq.is_sub_daily(),
        };
        if !reachable {
            tracing::debug!(rule = %rule, "time parts never line up with the interval");
        }

        Self {
            plan,
            periods,
            zone,
            all_day,
            start,
            times,
            until: rule.until.as_ref().map(Until::new),
            count: rule.count,
            emitted: 0,
            next_period: 0,
            last_productive: 0,
            buffer: VecDeque::new(),
            peeked: None,
            last_utc: None,
            done: !reachable,
        }
    }

    /// The next instance without consuming it.
    pub fn peek(&mut self) -> Option<&Instance> {
        if self.peeked.is_none() {
            self.peeked = self.next();
        }
        self.peeked.as_ref()
    }

    /// Advance so that the next instance is the first at or after `target`.
    ///
    /// Rules bounded by COUNT have to count from DTSTART and walk there; the
    /// others jump straight to the period holding the target. Seeking never
    /// moves backwards.
    pub fn skip_to(&mut self, target: Timestamp) {
        let target = target.as_second();
        if self.peeked.is_some_and(|p| p.utc() >= target) {
            return;
        }
        self.peeked = None;

        if self.count.is_none() && !self.done {
            let wall = self.zone.utc_to_local(target) - 2 * SECONDS_PER_DAY;
            let k = self.periods.index_of(wall);
            if k > self.next_period {
                self.buffer.clear();
                self.next_period = k;
                self.last_productive = k;
            }
        }

        while let Some(instance) = self.next() {
            if instance.utc() >= target {
                self.peeked = Some(instance);
                break;
            }
        }
    }

    /// Expand periods until the buffer holds candidates. Returns `false` once
    /// the rule is exhausted.
    fn fill(&mut self) -> bool {
        let cycle = self.periods.cycle();
        while self.buffer.is_empty() {
            let k = self.next_period;
            if k.saturating_sub(self.last_productive) > cycle {
                tracing::debug!(period = k, "no candidate in a full calendar cycle, stopping");
                return false;
            }

            let Some(period_start) = self.periods.start(k) else {
                return false;
            };
            if self.until.is_some_and(|until| period_start > until.horizon()) {
                return false;
            }

            let expanded = if self.plan.freq.is_sub_daily() {
                self.expand_sub_daily(k, period_start)
            } else {
                self.expand_days(k)
            };
            let Some((set, next)) = expanded else {
                return false;
            };

            if !set.is_empty() {
                self.last_productive = k;
                let start = self.start;
                self.buffer.extend(
                    self.plan
                        .select_positions(set)
                        .into_iter()
                        .filter(|&local| local >= start),
                );
            }
            self.next_period = next;
        }
        true
    }

    fn expand_days(&self, k: i64) -> Option<(Vec<i64>, i64)> {
        let mut set = Vec::new();
        let week_year = self.periods.week_year(k);
        for days in self.periods.days(k)? {
            if self.plan.matches_day(&Day::new(days), week_year) {
                let base = days.checked_mul(SECONDS_PER_DAY)?;
                set.extend(self.times.iter().map(|t| base + t));
            }
        }
        Some((set, k.checked_add(1)?))
    }

    /// Candidates of the sub-daily period `k` starting at `at`. Periods whose
    /// day, hour or minute is filtered out are skipped up to the next
    /// boundary of that unit.
    fn expand_sub_daily(&self, k: i64, at: i64) -> Option<(Vec<i64>, i64)> {
        let step = self.periods.step_seconds()?;
        let skip_until = |boundary: i64| -> Option<(Vec<i64>, i64)> {
            let ahead = boundary - at;
            let periods = ((ahead + step - 1) / step).max(1);
            Some((Vec::new(), k.checked_add(periods)?))
        };

        let day = at.div_euclid(SECONDS_PER_DAY);
        let time = at.rem_euclid(SECONDS_PER_DAY);
        if !self.plan.matches_day(&Day::new(day), None) {
            return skip_until((day + 1) * SECONDS_PER_DAY);
        }
        if !self.plan.hour_allowed(time / 3_600) {
            return skip_until(at - time % 3_600 + 3_600);
        }
        if self.plan.freq != RecurrenceFrequency::Hourly
            && !self.plan.minute_allowed(time % 3_600 / 60)
        {
            return skip_until(at - time % 60 + 60);
        }
        if self.plan.freq == RecurrenceFrequency::Secondly
            && !self.plan.second_allowed(time % 60)
        {
            return Some((Vec::new(), k.checked_add(1)?));
        }

        let set = self.times.iter().map(|t| at + t).collect();
        Some((set, k.checked_add(1)?))
    }
}

impl Iterator for RuleIter<'_> {
    type Item = Instance;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(instance) = self.peeked.take() {
            return Some(instance);
        }

        loop {
            if self.done {
                return None;
            }
            if self.count.is_some_and(|count| self.emitted >= count) {
                self.done = true;
                return None;
            }

            let Some(candidate) = self.buffer.pop_front() else {
                if !self.fill() {
                    self.done = true;
                }
                continue;
            };

            let local = if self.all_day {
                candidate - candidate.rem_euclid(SECONDS_PER_DAY)
            } else {
                candidate
            };
            let utc = self.zone.local_to_utc(local);
            if self.until.is_some_and(|until| !until.admits(local, utc)) {
                self.done = true;
                return None;
            }
            if self.last_utc.is_some_and(|last| utc <= last) {
                continue;
            }

            let Some(instance) = Instance::from_local(self.zone, local, self.all_day) else {
                self.done = true;
                return None;
            };
            self.last_utc = Some(utc);
            self.emitted += 1;
            return Some(instance);
        }
    }
}

/// Inclusive UNTIL bound, compared the way its value type reads.
#[derive(Debug, Clone, Copy)]
enum Until {
    /// Wall clock bound, for DATE and floating values
    Local(i64),
    /// Absolute bound, for UTC values
    Instant(i64),
}

impl Until {
    fn new(value: &DateTimeValue) -> Self {
        match value {
            // A DATE covers its whole day
            DateTimeValue::Date(date) => {
                Self::Local(epoch_day(*date) * SECONDS_PER_DAY + SECONDS_PER_DAY - 1)
            }
            DateTimeValue::Utc(datetime) => Self::Instant(local_seconds(*datetime)),
            DateTimeValue::Floating(datetime) | DateTimeValue::Zoned { datetime, .. } => {
                Self::Local(local_seconds(*datetime))
            }
        }
    }

    const fn admits(self, local: i64, utc: i64) -> bool {
        match self {
            Self::Local(bound) => local <= bound,
            Self::Instant(bound) => utc <= bound,
        }
    }

    /// Local seconds past which no period can hold an admitted candidate.
    const fn horizon(self) -> i64 {
        match self {
            Self::Local(bound) | Self::Instant(bound) => bound.saturating_add(2 * SECONDS_PER_DAY),
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, datetime};
    use jiff::tz::TimeZone;

    use super::*;

    fn expand(rule: &str, start: DateTime) -> Vec<DateTime> {
        let utc = TimeZoneRule::utc();
        RuleIter::new(&rule.parse().unwrap(), start, &utc)
            .unwrap()
            .map(|i| i.datetime())
            .take(1_000)
            .collect()
    }

    #[test]
    fn daily_with_count() {
        let got = expand("FREQ=DAILY;COUNT=3", datetime(2024, 1, 1, 9, 0, 0, 0));
        assert_eq!(
            got,
            [
                datetime(2024, 1, 1, 9, 0, 0, 0),
                datetime(2024, 1, 2, 9, 0, 0, 0),
                datetime(2024, 1, 3, 9, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn monthly_on_the_31st_skips_short_months() {
        let got = expand(
            "FREQ=MONTHLY;BYMONTHDAY=31;UNTIL=20241231T235959Z",
            datetime(2024, 1, 31, 0, 0, 0, 0),
        );
        assert_eq!(got.len(), 7);
        assert!(got.iter().all(|d| d.day() == 31));
    }

    #[test]
    fn yearly_last_friday() {
        let got = expand("FREQ=YEARLY;BYDAY=-1FR;COUNT=3", datetime(2023, 1, 1, 0, 0, 0, 0));
        let dates: Vec<_> = got.iter().map(|d| d.date()).collect();
        assert_eq!(
            dates,
            [date(2023, 12, 29), date(2024, 12, 27), date(2025, 12, 26)]
        );
    }

    #[test]
    fn weekly_with_interval_and_week_start() {
        // RFC 5545: every other week on Tuesday and Sunday, WKST matters
        let got = expand(
            "FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=MO",
            datetime(1997, 8, 5, 9, 0, 0, 0),
        );
        let days: Vec<_> = got.iter().map(|d| d.day()).collect();
        assert_eq!(days, [5, 10, 19, 24]);

        let got = expand(
            "FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=SU",
            datetime(1997, 8, 5, 9, 0, 0, 0),
        );
        let days: Vec<_> = got.iter().map(|d| d.day()).collect();
        assert_eq!(days, [5, 17, 19, 31]);
    }

    #[test]
    fn candidates_before_dtstart_are_dropped() {
        let got = expand("FREQ=MONTHLY;BYMONTHDAY=1,15;COUNT=2", datetime(2024, 1, 10, 0, 0, 0, 0));
        assert_eq!(
            got,
            [datetime(2024, 1, 15, 0, 0, 0, 0), datetime(2024, 2, 1, 0, 0, 0, 0)]
        );
    }

    #[test]
    fn hourly_with_by_hour() {
        let got = expand(
            "FREQ=HOURLY;INTERVAL=3;BYHOUR=9,12;COUNT=4",
            datetime(2024, 1, 1, 9, 15, 0, 0),
        );
        assert_eq!(
            got,
            [
                datetime(2024, 1, 1, 9, 15, 0, 0),
                datetime(2024, 1, 1, 12, 15, 0, 0),
                datetime(2024, 1, 2, 9, 15, 0, 0),
                datetime(2024, 1, 2, 12, 15, 0, 0),
            ]
        );
    }

    #[test]
    fn minutely_within_a_day() {
        let got = expand(
            "FREQ=MINUTELY;INTERVAL=20;BYHOUR=9,10;COUNT=7",
            datetime(1997, 9, 2, 9, 0, 0, 0),
        );
        let times: Vec<_> = got.iter().map(|d| (d.day(), d.hour(), d.minute())).collect();
        assert_eq!(
            times,
            [
                (2, 9, 0),
                (2, 9, 20),
                (2, 9, 40),
                (2, 10, 0),
                (2, 10, 20),
                (2, 10, 40),
                (3, 9, 0),
            ]
        );
    }

    #[test]
    fn until_date_covers_the_whole_day() {
        let got = expand("FREQ=DAILY;UNTIL=20240103", datetime(2024, 1, 1, 18, 0, 0, 0));
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn impossible_rules_end() {
        assert!(expand("FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=30", datetime(2024, 1, 1, 0, 0, 0, 0)).is_empty());
        assert!(expand("FREQ=DAILY;BYMONTH=4;BYMONTHDAY=31", datetime(2024, 1, 1, 0, 0, 0, 0)).is_empty());
        assert!(
            expand("FREQ=SECONDLY;INTERVAL=2;BYSECOND=1", datetime(2024, 1, 1, 0, 0, 0, 0))
                .is_empty()
        );
    }

    #[test]
    fn leap_day_every_four_years() {
        let got = expand("FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=29;COUNT=3", datetime(2021, 1, 1, 0, 0, 0, 0));
        let years: Vec<_> = got.iter().map(|d| d.year()).collect();
        assert_eq!(years, [2024, 2028, 2032]);
    }

    #[test]
    fn all_day_instances() {
        let utc = TimeZoneRule::utc();
        let rule = "FREQ=WEEKLY;BYDAY=SA,SU;COUNT=3".parse().unwrap();
        let got: Vec<_> = RuleIter::new_all_day(&rule, date(2024, 1, 1), &utc)
            .unwrap()
            .collect();
        assert!(got.iter().all(Instance::is_all_day));
        let dates: Vec<_> = got.iter().map(Instance::date).collect();
        assert_eq!(dates, [date(2024, 1, 6), date(2024, 1, 7), date(2024, 1, 13)]);
    }

    #[test]
    fn dst_gap_is_coalesced_per_day() {
        let zone = TimeZoneRule::from_jiff("America/New_York", TimeZone::get("America/New_York").unwrap());
        let rule = "FREQ=DAILY;COUNT=3".parse().unwrap();
        let got: Vec<_> = RuleIter::new(&rule, datetime(2024, 3, 9, 2, 30, 0, 0), &zone)
            .unwrap()
            .map(|i| i.datetime())
            .collect();
        assert_eq!(
            got,
            [
                datetime(2024, 3, 9, 2, 30, 0, 0),
                datetime(2024, 3, 10, 3, 0, 0, 0),
                datetime(2024, 3, 11, 2, 30, 0, 0),
            ]
        );
    }

    #[test]
    fn skip_to_matches_filtering() {
        let utc = TimeZoneRule::utc();
        let rule = "FREQ=WEEKLY;BYDAY=MO,TH".parse().unwrap();
        let start = datetime(2020, 1, 1, 8, 0, 0, 0);
        let target = datetime(2023, 6, 15, 0, 0, 0, 0).to_zoned(TimeZone::UTC).unwrap().timestamp();

        let mut seek = RuleIter::new(&rule, start, &utc).unwrap();
        seek.skip_to(target);
        let seeked: Vec<_> = seek.take(10).collect();

        let walked: Vec<_> = RuleIter::new(&rule, start, &utc)
            .unwrap()
            .skip_while(|i| i.timestamp() < target)
            .take(10)
            .collect();
        assert_eq!(seeked, walked);
        assert_eq!(seeked[0].date(), date(2023, 6, 15));
    }

    #[test]
    fn skip_to_with_count_walks() {
        let utc = TimeZoneRule::utc();
        let rule = "FREQ=DAILY;COUNT=5".parse().unwrap();
        let mut iter = RuleIter::new(&rule, datetime(2024, 1, 1, 0, 0, 0, 0), &utc).unwrap();
        iter.skip_to(datetime(2024, 1, 4, 0, 0, 0, 0).to_zoned(TimeZone::UTC).unwrap().timestamp());
        assert_eq!(iter.count(), 2);
    }

    #[test]
    fn invalid_rule_is_rejected() {
        let utc = TimeZoneRule::utc();
        let mut rule = RecurrenceRule::new(RecurrenceFrequency::Daily);
        rule.interval = 0;
        assert!(RuleIter::new(&rule, datetime(2024, 1, 1, 0, 0, 0, 0), &utc).is_err());
    }
}
