// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! By-part filters of a rule, with the defaults taken from DTSTART.

use crate::datetime::calendar::{
    SECONDS_PER_DAY, civil_from_days, month_len, ordinal, week_number_of, weekday_of, year_len,
};
use crate::rrule::{RecurrenceFrequency, RecurrenceRule, WeekDay};

/// A calendar day with the fields the filters look at.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Day {
    pub days: i64,
    month: i8,
    mday: i8,
    yday: i16,
    year_len: i16,
    month_len: i8,
    weekday: i64,
}

impl Day {
    pub fn new(days: i64) -> Self {
        let (year, month, mday) = civil_from_days(days);
        Self {
            days,
            month,
            mday,
            yday: ordinal(year, month, mday),
            year_len: year_len(year),
            month_len: month_len(year, month),
            weekday: weekday_of(days),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Plan {
    pub freq: RecurrenceFrequency,
    pub wkst: WeekDay,
    by_month: Vec<i8>,
    by_week_no: Vec<i8>,
    by_year_day: Vec<i16>,
    by_month_day: Vec<i8>,
    by_weekday: Vec<i64>,
    by_nth_weekday: Vec<(i64, i8)>,
    nth_in_month: bool,
    /// Empty means any, which only happens for frequencies at or below the unit
    by_hour: Vec<i64>,
    by_minute: Vec<i64>,
    by_second: Vec<i64>,
    by_set_pos: Vec<i16>,
}

impl Plan {
    /// `start` is DTSTART in local seconds.
    pub fn new(rule: &RecurrenceRule, start: i64) -> Self {
        use RecurrenceFrequency::{Hourly, Minutely, Monthly, Secondly, Weekly, Yearly};

        let freq = rule.freq;
        let start_day = Day::new(start.div_euclid(SECONDS_PER_DAY));
        let start_time = start.rem_euclid(SECONDS_PER_DAY);

        let mut by_month: Vec<i8> = rule.by_month.iter().map(|&m| m.cast_signed()).collect();
        let mut by_month_day = rule.by_month_day.clone();
        let mut by_weekday = Vec::new();
        let mut by_nth_weekday = Vec::new();
        for day in &rule.by_day {
            let weekday = i64::from(day.day.days_from_monday());
            match day.occurrence {
                Some(n) => by_nth_weekday.push((weekday, n)),
                None => by_weekday.push(weekday),
            }
        }

        // Without any day-level part the rule repeats DTSTART's position
        if rule.by_week_no.is_empty()
            && rule.by_year_day.is_empty()
            && rule.by_month_day.is_empty()
            && rule.by_day.is_empty()
        {
            match freq {
                Yearly => {
                    if by_month.is_empty() {
                        by_month.push(start_day.month);
                    }
                    by_month_day.push(start_day.mday);
                }
                Monthly => by_month_day.push(start_day.mday),
                Weekly => by_weekday.push(start_day.weekday),
                _ => {}
            }
        }

        let time_part = |values: &[u8], coarser: bool, default: i64| -> Vec<i64> {
            let mut values: Vec<i64> = values.iter().map(|&v| i64::from(v.min(59))).collect();
            if values.is_empty() && coarser {
                values.push(default);
            }
            values.sort_unstable();
            values.dedup();
            values
        };
        let by_hour = time_part(&rule.by_hour, freq > Hourly, start_time / 3_600);
        let by_minute = time_part(&rule.by_minute, freq > Minutely, start_time % 3_600 / 60);
        let by_second = time_part(&rule.by_second, freq > Secondly, start_time % 60);

        Self {
            freq,
            wkst: rule.week_start(),
            nth_in_month: freq == Monthly || (freq == Yearly && !by_month.is_empty()),
            by_month,
            by_week_no: rule.by_week_no.clone(),
            by_year_day: rule.by_year_day.clone(),
            by_month_day,
            by_weekday,
            by_nth_weekday,
            by_hour,
            by_minute,
            by_second,
            by_set_pos: rule.by_set_pos.clone(),
        }
    }

    /// Whether every day-level part admits `day`. With `week_year` set, BYWEEKNO
    /// only counts weeks of that week-year.
    pub fn matches_day(&self, day: &Day, week_year: Option<i32>) -> bool {
        if !self.by_month.is_empty() && !self.by_month.contains(&day.month) {
            return false;
        }

        if !self.by_week_no.is_empty() {
            let wn = week_number_of(day.days, self.wkst);
            if week_year.is_some_and(|year| year != wn.year) {
                return false;
            }
            let hit = self.by_week_no.iter().any(|&n| {
                let n = if n > 0 { n } else { wn.weeks_in_year + n + 1 };
                n == wn.week
            });
            if !hit {
                return false;
            }
        }

        if !self.by_year_day.is_empty()
            && !self
                .by_year_day
                .iter()
                .any(|&n| resolve(i32::from(n), i32::from(day.year_len)) == i32::from(day.yday))
        {
            return false;
        }

        if !self.by_month_day.is_empty()
            && !self
                .by_month_day
                .iter()
                .any(|&n| resolve(i32::from(n), i32::from(day.month_len)) == i32::from(day.mday))
        {
            return false;
        }

        if self.by_weekday.is_empty() && self.by_nth_weekday.is_empty() {
            return true;
        }
        self.by_weekday.contains(&day.weekday)
            || self
                .by_nth_weekday
                .iter()
                .any(|&(weekday, n)| weekday == day.weekday && self.is_nth(day, n))
    }

    /// Whether `day` is the `n`-th of its weekday in the month or year,
    /// counting from the end for negative `n`.
    fn is_nth(&self, day: &Day, n: i8) -> bool {
        let (pos, len) = if self.nth_in_month {
            (i32::from(day.mday), i32::from(day.month_len))
        } else {
            (i32::from(day.yday), i32::from(day.year_len))
        };
        let n = i32::from(n);
        if n > 0 {
            (pos - 1) / 7 + 1 == n
        } else {
            (len - pos) / 7 + 1 == -n
        }
    }

    pub fn hour_allowed(&self, hour: i64) -> bool {
        self.by_hour.is_empty() || self.by_hour.contains(&hour)
    }

    pub fn minute_allowed(&self, minute: i64) -> bool {
        self.by_minute.is_empty() || self.by_minute.contains(&minute)
    }

    pub fn second_allowed(&self, second: i64) -> bool {
        self.by_second.is_empty() || self.by_second.contains(&second)
    }

    /// Seconds of day of the candidates of one day, for daily and coarser
    /// frequencies, sorted.
    pub fn times_of_day(&self) -> Vec<i64> {
        let mut times = Vec::with_capacity(
            self.by_hour.len() * self.by_minute.len() * self.by_second.len(),
        );
        for h in &self.by_hour {
            for m in &self.by_minute {
                for s in &self.by_second {
                    times.push(h * 3_600 + m * 60 + s);
                }
            }
        }
        times
    }

    /// Offsets within an hour of the candidates of an hourly period.
    pub fn times_of_hour(&self) -> Vec<i64> {
        let mut times = Vec::with_capacity(self.by_minute.len() * self.by_second.len());
        for m in &self.by_minute {
            for s in &self.by_second {
                times.push(m * 60 + s);
            }
        }
        times
    }

    /// Offsets within a minute of the candidates of a minutely period.
    pub fn times_of_minute(&self) -> &[i64] {
        &self.by_second
    }

    /// Whether a sub-daily grid with `step` seconds through `origin` can ever
    /// hit a time of day the parts allow.
    pub fn time_reachable(&self, origin: i64, step: i64) -> bool {
        let g = gcd(step, SECONDS_PER_DAY);
        let residue = origin.rem_euclid(g);
        let all = |values: &[i64], n: i64| -> Vec<i64> {
            if values.is_empty() {
                (0..n).collect()
            } else {
                values.to_vec()
            }
        };

        let hours = all(&self.by_hour, 24);
        let minutes = all(&self.by_minute, 60);
        let seconds = match self.freq {
            RecurrenceFrequency::Secondly => all(&self.by_second, 60),
            _ => vec![0],
        };
        let minutes = match self.freq {
            RecurrenceFrequency::Hourly => vec![0],
            _ => minutes,
        };

        hours.iter().any(|h| {
            minutes.iter().any(|m| {
                seconds
                    .iter()
                    .any(|s| (h * 3_600 + m * 60 + s).rem_euclid(g) == residue)
            })
        })
    }

    /// Keep the candidates at the BYSETPOS positions of a sorted period set.
    pub fn select_positions(&self, set: Vec<i64>) -> Vec<i64> {
        if self.by_set_pos.is_empty() {
            return set;
        }

        let len = i64::try_from(set.len()).unwrap_or(i64::MAX);
        let mut selected: Vec<i64> = self
            .by_set_pos
            .iter()
            .filter_map(|&pos| {
                let pos = i64::from(pos);
                let index = if pos > 0 { pos - 1 } else { len + pos };
                usize::try_from(index).ok().and_then(|i| set.get(i)).copied()
            })
            .collect();
        selected.sort_unstable();
        selected.dedup();
        selected
    }
}

/// Resolve a signed position against a length, -1 being the last.
fn resolve(n: i32, len: i32) -> i32 {
    if n > 0 { n } else { len + n + 1 }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs()
}
