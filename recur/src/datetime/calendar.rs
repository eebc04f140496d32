// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Proleptic Gregorian calendar arithmetic.
//!
//! Days are counted from 1970-01-01 ("epoch days") and wall-clock date-times
//! as seconds from 1970-01-01T00:00:00 in the same unspecified zone ("local
//! seconds"). Both are plain integers so that the expansion engine can walk
//! far outside jiff's supported range without failing mid-period. The public
//! helpers on [`Date`] and [`DateTime`] delegate to jiff.

use jiff::Span;
use jiff::civil::{Date, DateTime};

use crate::rrule::{RecurrenceFrequency, WeekDay};

pub(crate) const SECONDS_PER_DAY: i64 = 86_400;

/// Days in 400 Gregorian years, after which the calendar repeats itself.
pub(crate) const DAYS_PER_CYCLE: i64 = 146_097;

const CUMULATIVE_DAYS: [i16; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

/// Whether the year of `date` has 366 days.
#[must_use]
pub fn is_leap_year(date: Date) -> bool {
    date.in_leap_year()
}

/// Number of days in the year of `date`.
#[must_use]
pub fn days_in_year(date: Date) -> i16 {
    date.days_in_year()
}

/// Number of days in the month of `date`.
#[must_use]
pub fn days_in_month(date: Date) -> i8 {
    date.days_in_month()
}

/// Day of the year, 1-based.
#[must_use]
pub fn day_of_year(date: Date) -> i16 {
    date.day_of_year()
}

/// Day of the week.
#[must_use]
pub fn weekday(date: Date) -> WeekDay {
    date.weekday().into()
}

/// Week number of a date, as used by BYWEEKNO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekNumber {
    /// Year the week belongs to, may differ from the calendar year near New Year
    pub year: i32,
    /// Week of the year, 1-based
    pub week: i8,
    /// Number of weeks in that year, 52 or 53
    pub weeks_in_year: i8,
}

/// Week number of `date` for weeks starting on `wkst`.
///
/// Week 1 is the first week with at least four days in the year.
#[must_use]
pub fn week_number(date: Date, wkst: WeekDay) -> WeekNumber {
    week_number_of(epoch_day(date), wkst)
}

/// Add `months` to `date`, clamping the day to the end of the target month.
///
/// January 31 plus one month is February 28 (or 29). Returns `None` when the
/// result leaves the range of [`Date`].
#[must_use]
pub fn add_months(date: Date, months: i64) -> Option<Date> {
    let span = Span::new().try_months(months).ok()?;
    date.checked_add(span).ok()
}

/// Add `n` units of `freq` to `datetime`.
///
/// Months and years clamp the day of month like [`add_months`], the other
/// frequencies are exact wall-clock steps.
#[must_use]
pub fn step(datetime: DateTime, freq: RecurrenceFrequency, n: i64) -> Option<DateTime> {
    let span = match freq {
        RecurrenceFrequency::Secondly => Span::new().try_seconds(n),
        RecurrenceFrequency::Minutely => Span::new().try_minutes(n),
        RecurrenceFrequency::Hourly => Span::new().try_hours(n),
        RecurrenceFrequency::Daily => Span::new().try_days(n),
        RecurrenceFrequency::Weekly => Span::new().try_weeks(n),
        RecurrenceFrequency::Monthly => Span::new().try_months(n),
        RecurrenceFrequency::Yearly => Span::new().try_years(n),
    };
    datetime.checked_add(span.ok()?).ok()
}

pub(crate) const fn leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub(crate) const fn year_len(year: i32) -> i16 {
    if leap_year(year) { 366 } else { 365 }
}

/// Days in `month` (1-12) of `year`, 0 for an invalid month.
pub(crate) const fn month_len(year: i32, month: i8) -> i8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

pub(crate) fn shift_month(year: i32, month: i8, months: i64) -> Option<(i32, i8)> {
    let index = i64::from(year) * 12 + i64::from(month) - 1 + months;
    month_from_index(index)
}

/// Inverse of `year * 12 + month - 1`.
pub(crate) fn month_from_index(index: i64) -> Option<(i32, i8)> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    #[expect(clippy::cast_possible_truncation)]
    let month = index.rem_euclid(12) as i8 + 1;
    Some((year, month))
}

pub(crate) fn ordinal(year: i32, month: i8, day: i8) -> i16 {
    let before = usize::try_from(month - 1)
        .ok()
        .and_then(|i| CUMULATIVE_DAYS.get(i))
        .copied()
        .unwrap_or(0);
    let leap = i16::from(month > 2 && leap_year(year));
    before + leap + i16::from(day)
}

/// Epoch day of a civil date.
pub(crate) fn days_from_civil(year: i32, month: i8, day: i8) -> i64 {
    let (month, day) = (i64::from(month), i64::from(day));
    let year = i64::from(year) - i64::from(month <= 2);
    let era = year.div_euclid(400);
    let yoe = year.rem_euclid(400);
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * DAYS_PER_CYCLE + doe - 719_468
}

/// Civil date of an epoch day.
#[expect(clippy::cast_possible_truncation)]
pub(crate) fn civil_from_days(days: i64) -> (i32, i8, i8) {
    let z = days + 719_468;
    let era = z.div_euclid(DAYS_PER_CYCLE);
    let doe = z.rem_euclid(DAYS_PER_CYCLE);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year as i32, month as i8, day as i8)
}

pub(crate) fn epoch_day(date: Date) -> i64 {
    days_from_civil(i32::from(date.year()), date.month(), date.day())
}

pub(crate) fn date_from_epoch_day(days: i64) -> Option<Date> {
    let (year, month, day) = civil_from_days(days);
    Date::new(i16::try_from(year).ok()?, month, day).ok()
}

/// Days since Monday for an epoch day; 1970-01-01 was a Thursday.
pub(crate) fn weekday_of(days: i64) -> i64 {
    (days + 3).rem_euclid(7)
}

pub(crate) fn local_seconds(datetime: DateTime) -> i64 {
    epoch_day(datetime.date()) * SECONDS_PER_DAY
        + i64::from(datetime.hour()) * 3_600
        + i64::from(datetime.minute()) * 60
        + i64::from(datetime.second())
}

#[expect(clippy::cast_possible_truncation)]
pub(crate) fn datetime_from_local_seconds(local: i64) -> Option<DateTime> {
    let date = date_from_epoch_day(local.div_euclid(SECONDS_PER_DAY))?;
    let secs = local.rem_euclid(SECONDS_PER_DAY);
    let (hour, minute, second) = (secs / 3_600, secs % 3_600 / 60, secs % 60);
    Some(date.at(hour as i8, minute as i8, second as i8, 0))
}

/// Epoch day on which week 1 of `year` starts.
pub(crate) fn first_week_start(year: i32, wkst: WeekDay) -> i64 {
    let jan1 = days_from_civil(year, 1, 1);
    let offset = (weekday_of(jan1) - i64::from(wkst.days_from_monday())).rem_euclid(7);
    if offset <= 3 { jan1 - offset } else { jan1 + 7 - offset }
}

#[expect(clippy::cast_possible_truncation)]
pub(crate) fn week_number_of(days: i64, wkst: WeekDay) -> WeekNumber {
    let (mut year, _, _) = civil_from_days(days);
    let mut start = first_week_start(year, wkst);
    if days < start {
        year -= 1;
        start = first_week_start(year, wkst);
    } else {
        let next = first_week_start(year + 1, wkst);
        if days >= next {
            year += 1;
            start = next;
        }
    }

    let next = first_week_start(year + 1, wkst);
    WeekNumber {
        year,
        week: ((days - start) / 7 + 1) as i8,
        weeks_in_year: ((next - start) / 7) as i8,
    }
}
