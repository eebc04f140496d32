// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::ops::Range;

use crate::datetime::calendar::{
    DAYS_PER_CYCLE, SECONDS_PER_DAY, civil_from_days, days_from_civil,
    month_len,
    first_week_start, month_from_index, week_number_of, weekday_of,
};
use crate::rrule::{RecurrenceFrequency, WeekDay};

/// Indexing of the periods of a rule: period `k` is the `k * INTERVAL`-th
/// frequency unit after the one containing DTSTART.
///
/// Yearly rules with BYWEEKNO run over week-years: a year starts on the
/// first day of its week 1 and ends where week 1 of the next year begins.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Periods {
    freq: RecurrenceFrequency,
    interval: i64,
    wkst: WeekDay,
    week_years: bool,
    /// Year, month index, epoch day or local second of period 0
    origin: i64,
}

impl Periods {
    pub fn new(freq: RecurrenceFrequency, interval: u32, wkst: WeekDay, start: i64) -> Self {
        let day = start.div_euclid(SECONDS_PER_DAY);
        let origin = match freq {
            RecurrenceFrequency::Yearly => i64::from(civil_from_days(day).0),
            RecurrenceFrequency::Monthly => {
                let (year, month, _) = civil_from_days(day);
                i64::from(year) * 12 + i64::from(month) - 1
            }
            RecurrenceFrequency::Weekly => {
                day - (weekday_of(day) - i64::from(wkst.days_from_monday())).rem_euclid(7)
            }
            RecurrenceFrequency::Daily => day,
            RecurrenceFrequency::Hourly => start - start.rem_euclid(3_600),
            RecurrenceFrequency::Minutely => start - start.rem_euclid(60),
            RecurrenceFrequency::Secondly => start,
        };
        Self {
            freq,
            interval: i64::from(interval.max(1)),
            wkst,
            week_years: false,
            origin,
        }
    }

    /// Count yearly periods in week-years, as BYWEEKNO needs.
    pub fn with_week_years(mut self, start: i64) -> Self {
        if self.freq == RecurrenceFrequency::Yearly {
            self.week_years = true;
            self.origin = i64::from(self.year_of(start.div_euclid(SECONDS_PER_DAY)));
        }
        self
    }

    /// Year of the period holding `day`, a week-year if periods count them.
    fn year_of(&self, day: i64) -> i32 {
        if self.week_years {
            week_number_of(day, self.wkst).year
        } else {
            civil_from_days(day).0
        }
    }

    /// Week-year of period `k`, for yearly rules counting week-years.
    pub fn week_year(&self, k: i64) -> Option<i32> {
        if self.week_years {
            i32::try_from(self.unit(k)?).ok()
        } else {
            None
        }
    }

    pub const fn origin(&self) -> i64 {
        self.origin
    }

    /// Length of a sub-daily period in seconds.
    pub fn step_seconds(&self) -> Option<i64> {
        let unit = match self.freq {
            RecurrenceFrequency::Hourly => 3_600,
            RecurrenceFrequency::Minutely => 60,
            RecurrenceFrequency::Secondly => 1,
            _ => return None,
        };
        self.interval.checked_mul(unit)
    }

    /// Number of consecutive periods after which the calendar pattern seen by
    /// the rule repeats.
    pub fn cycle(&self) -> i64 {
        match self.freq {
            RecurrenceFrequency::Yearly => 400,
            RecurrenceFrequency::Monthly => 4_800,
            RecurrenceFrequency::Weekly => DAYS_PER_CYCLE / 7,
            RecurrenceFrequency::Daily => DAYS_PER_CYCLE,
            RecurrenceFrequency::Hourly => DAYS_PER_CYCLE * 24,
            RecurrenceFrequency::Minutely => DAYS_PER_CYCLE * 1_440,
            RecurrenceFrequency::Secondly => DAYS_PER_CYCLE * SECONDS_PER_DAY,
        }
    }

    /// Unit index of period `k`, `None` on overflow.
    fn unit(&self, k: i64) -> Option<i64> {
        let stride = match self.freq {
            RecurrenceFrequency::Weekly => self.interval.checked_mul(7)?,
            RecurrenceFrequency::Hourly
            | RecurrenceFrequency::Minutely
            | RecurrenceFrequency::Secondly => self.step_seconds()?,
            _ => self.interval,
        };
        self.origin.checked_add(k.checked_mul(stride)?)
    }

    /// Epoch days covered by period `k`, for daily and coarser frequencies.
    pub fn days(&self, k: i64) -> Option<Range<i64>> {
        let unit = self.unit(k)?;
        match self.freq {
            RecurrenceFrequency::Yearly if self.week_years => {
                let year = i32::try_from(unit).ok()?;
                Some(
                    first_week_start(year, self.wkst)
                        ..first_week_start(year.checked_add(1)?, self.wkst),
                )
            }
            RecurrenceFrequency::Yearly => {
                let year = i32::try_from(unit).ok()?;
                Some(days_from_civil(year, 1, 1)..days_from_civil(year.checked_add(1)?, 1, 1))
            }
            RecurrenceFrequency::Monthly => {
                let (year, month) = month_from_index(unit)?;
                let first = days_from_civil(year, month, 1);
                Some(first..first + i64::from(month_len(year, month)))
            }
            RecurrenceFrequency::Weekly => Some(unit..unit + 7),
            RecurrenceFrequency::Daily => Some(unit..unit + 1),
            _ => None,
        }
    }

    /// First local second of period `k`.
    pub fn start(&self, k: i64) -> Option<i64> {
        if self.freq.is_sub_daily() {
            self.unit(k)
        } else {
            self.days(k)?.start.checked_mul(SECONDS_PER_DAY)
        }
    }

    /// Index of the period containing the local second `local`, rounded down.
    pub fn index_of(&self, local: i64) -> i64 {
        let day = local.div_euclid(SECONDS_PER_DAY);
        let (units, stride) = match self.freq {
            RecurrenceFrequency::Yearly => {
                (i64::from(self.year_of(day)) - self.origin, self.interval)
            }
            RecurrenceFrequency::Monthly => {
                let (year, month, _) = civil_from_days(day);
                (
                    i64::from(year) * 12 + i64::from(month) - 1 - self.origin,
                    self.interval,
                )
            }
            RecurrenceFrequency::Weekly => (day - self.origin, self.interval.saturating_mul(7)),
            RecurrenceFrequency::Daily => (day - self.origin, self.interval),
            RecurrenceFrequency::Hourly
            | RecurrenceFrequency::Minutely
            | RecurrenceFrequency::Secondly => (
                local - self.origin,
                self.step_seconds().unwrap_or(i64::MAX),
            ),
        };
        units.div_euclid(stride)
    }
}
