// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Recurrence rule model.

mod parser;
mod validate;

use std::fmt::{self, Display, Write};
use std::str::FromStr;

use crate::datetime::DateTimeValue;
use crate::error::ParseError;
use crate::keyword::{
    KW_DAY_FR, KW_DAY_MO, KW_DAY_SA, KW_DAY_SU, KW_DAY_TH, KW_DAY_TU, KW_DAY_WE, KW_RRULE_BYDAY,
    KW_RRULE_BYHOUR, KW_RRULE_BYMINUTE, KW_RRULE_BYMONTH, KW_RRULE_BYMONTHDAY, KW_RRULE_BYSECOND,
    KW_RRULE_BYSETPOS, KW_RRULE_BYWEEKNO, KW_RRULE_BYYEARDAY, KW_RRULE_COUNT, KW_RRULE_FREQ,
    KW_RRULE_FREQ_DAILY, KW_RRULE_FREQ_HOURLY, KW_RRULE_FREQ_MINUTELY, KW_RRULE_FREQ_MONTHLY,
    KW_RRULE_FREQ_SECONDLY, KW_RRULE_FREQ_WEEKLY, KW_RRULE_FREQ_YEARLY, KW_RRULE_INTERVAL,
    KW_RRULE_UNTIL, KW_RRULE_WKST,
};

pub use crate::rrule::parser::parse;
pub use crate::rrule::validate::ValidationError;

/// Recurrence rule
///
/// Fields mirror the rule parts of RFC 5545 Section 3.3.10. Empty by-part
/// lists mean the part is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    /// Frequency of recurrence
    pub freq: RecurrenceFrequency,
    /// Until date for recurrence, inclusive
    pub until: Option<DateTimeValue>,
    /// Number of occurrences
    pub count: Option<u32>,
    /// Interval between recurrences, at least 1
    pub interval: u32,
    /// Second specifier
    pub by_second: Vec<u8>,
    /// Minute specifier
    pub by_minute: Vec<u8>,
    /// Hour specifier
    pub by_hour: Vec<u8>,
    /// Day of month specifier
    pub by_month_day: Vec<i8>,
    /// Day of year specifier
    pub by_year_day: Vec<i16>,
    /// Week number specifier
    pub by_week_no: Vec<i8>,
    /// Month specifier
    pub by_month: Vec<u8>,
    /// Day of week specifier
    pub by_day: Vec<WeekDayNum>,
    /// Position in the set of candidates of each period
    pub by_set_pos: Vec<i16>,
    /// Start day of week
    pub wkst: Option<WeekDay>,
}

impl RecurrenceRule {
    /// Create a rule with the given frequency and no other parts.
    #[must_use]
    pub fn new(freq: RecurrenceFrequency) -> Self {
        Self {
            freq,
            until: None,
            count: None,
            interval: 1,
            by_second: Vec::new(),
            by_minute: Vec::new(),
            by_hour: Vec::new(),
            by_month_day: Vec::new(),
            by_year_day: Vec::new(),
            by_week_no: Vec::new(),
            by_month: Vec::new(),
            by_day: Vec::new(),
            by_set_pos: Vec::new(),
            wkst: None,
        }
    }

    /// The day a week starts on, Monday unless WKST says otherwise.
    #[must_use]
    pub fn week_start(&self) -> WeekDay {
        self.wkst.unwrap_or(WeekDay::Monday)
    }

    /// Whether the rule stops on its own, through COUNT or UNTIL.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.count.is_some() || self.until.is_some()
    }

    pub(crate) fn has_by_part(&self) -> bool {
        !(self.by_second.is_empty()
            && self.by_minute.is_empty()
            && self.by_hour.is_empty()
            && self.by_month_day.is_empty()
            && self.by_year_day.is_empty()
            && self.by_week_no.is_empty()
            && self.by_month.is_empty()
            && self.by_day.is_empty())
    }
}

impl FromStr for RecurrenceRule {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Canonical RRULE text: parts in a fixed order, `INTERVAL=1` omitted.
impl Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{KW_RRULE_FREQ}={}", self.freq)?;
        if let Some(until) = &self.until {
            write!(f, ";{KW_RRULE_UNTIL}={until}")?;
        }
        if let Some(count) = self.count {
            write!(f, ";{KW_RRULE_COUNT}={count}")?;
        }
        if self.interval != 1 {
            write!(f, ";{KW_RRULE_INTERVAL}={}", self.interval)?;
        }
        write_list(f, KW_RRULE_BYSECOND, &self.by_second)?;
        write_list(f, KW_RRULE_BYMINUTE, &self.by_minute)?;
        write_list(f, KW_RRULE_BYHOUR, &self.by_hour)?;
        write_list(f, KW_RRULE_BYDAY, &self.by_day)?;
        write_list(f, KW_RRULE_BYMONTHDAY, &self.by_month_day)?;
        write_list(f, KW_RRULE_BYYEARDAY, &self.by_year_day)?;
        write_list(f, KW_RRULE_BYWEEKNO, &self.by_week_no)?;
        write_list(f, KW_RRULE_BYMONTH, &self.by_month)?;
        write_list(f, KW_RRULE_BYSETPOS, &self.by_set_pos)?;
        if let Some(wkst) = self.wkst {
            write!(f, ";{KW_RRULE_WKST}={wkst}")?;
        }
        Ok(())
    }
}

fn write_list<T: Display>(f: &mut fmt::Formatter<'_>, key: &str, values: &[T]) -> fmt::Result {
    let Some((first, rest)) = values.split_first() else {
        return Ok(());
    };

    write!(f, ";{key}={first}")?;
    for v in rest {
        f.write_char(',')?;
        write!(f, "{v}")?;
    }
    Ok(())
}

/// Recurrence frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[expect(missing_docs)]
pub enum RecurrenceFrequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceFrequency {
    /// Whether a period of this frequency is shorter than a day.
    #[must_use]
    pub const fn is_sub_daily(self) -> bool {
        matches!(self, Self::Secondly | Self::Minutely | Self::Hourly)
    }
}

impl Display for RecurrenceFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceFrequency::Secondly => write!(f, "{KW_RRULE_FREQ_SECONDLY}"),
            RecurrenceFrequency::Minutely => write!(f, "{KW_RRULE_FREQ_MINUTELY}"),
            RecurrenceFrequency::Hourly => write!(f, "{KW_RRULE_FREQ_HOURLY}"),
            RecurrenceFrequency::Daily => write!(f, "{KW_RRULE_FREQ_DAILY}"),
            RecurrenceFrequency::Weekly => write!(f, "{KW_RRULE_FREQ_WEEKLY}"),
            RecurrenceFrequency::Monthly => write!(f, "{KW_RRULE_FREQ_MONTHLY}"),
            RecurrenceFrequency::Yearly => write!(f, "{KW_RRULE_FREQ_YEARLY}"),
        }
    }
}

/// Day of week with optional occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekDayNum {
    /// Day of the week
    pub day: WeekDay,
    /// Occurrence within the month or year, negative counts from the end
    pub occurrence: Option<i8>,
}

impl WeekDayNum {
    /// Every `day` of the period.
    #[must_use]
    pub const fn every(day: WeekDay) -> Self {
        Self {
            day,
            occurrence: None,
        }
    }

    /// The `n`-th `day` of the period.
    #[must_use]
    pub const fn nth(n: i8, day: WeekDay) -> Self {
        Self {
            day,
            occurrence: Some(n),
        }
    }
}

impl Display for WeekDayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.occurrence {
            write!(f, "{n}")?;
        }
        write!(f, "{}", self.day)
    }
}

/// Day of the week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[expect(missing_docs)]
pub enum WeekDay {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl WeekDay {
    /// Days since Monday, Monday is 0 and Sunday is 6.
    #[must_use]
    pub const fn days_from_monday(self) -> i8 {
        match self {
            WeekDay::Monday => 0,
            WeekDay::Tuesday => 1,
            WeekDay::Wednesday => 2,
            WeekDay::Thursday => 3,
            WeekDay::Friday => 4,
            WeekDay::Saturday => 5,
            WeekDay::Sunday => 6,
        }
    }

    /// Inverse of [`WeekDay::days_from_monday`], taken modulo 7.
    #[must_use]
    pub const fn from_days_from_monday(days: i64) -> Self {
        match days.rem_euclid(7) {
            0 => WeekDay::Monday,
            1 => WeekDay::Tuesday,
            2 => WeekDay::Wednesday,
            3 => WeekDay::Thursday,
            4 => WeekDay::Friday,
            5 => WeekDay::Saturday,
            _ => WeekDay::Sunday,
        }
    }
}

impl From<jiff::civil::Weekday> for WeekDay {
    fn from(value: jiff::civil::Weekday) -> Self {
        Self::from_days_from_monday(i64::from(value.to_monday_zero_offset()))
    }
}

impl Display for WeekDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekDay::Sunday => write!(f, "{KW_DAY_SU}"),
            WeekDay::Monday => write!(f, "{KW_DAY_MO}"),
            WeekDay::Tuesday => write!(f, "{KW_DAY_TU}"),
            WeekDay::Wednesday => write!(f, "{KW_DAY_WE}"),
            WeekDay::Thursday => write!(f, "{KW_DAY_TH}"),
            WeekDay::Friday => write!(f, "{KW_DAY_FR}"),
            WeekDay::Saturday => write!(f, "{KW_DAY_SA}"),
        }
    }
}

/// Name of a rule part, used to point at the offending part in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[expect(missing_docs)]
pub enum RulePart {
    Freq,
    Until,
    Count,
    Interval,
    BySecond,
    ByMinute,
    ByHour,
    ByDay,
    ByMonthDay,
    ByYearDay,
    ByWeekNo,
    ByMonth,
    BySetPos,
    Wkst,
}

impl Display for RulePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RulePart::Freq => KW_RRULE_FREQ,
            RulePart::Until => KW_RRULE_UNTIL,
            RulePart::Count => KW_RRULE_COUNT,
            RulePart::Interval => KW_RRULE_INTERVAL,
            RulePart::BySecond => KW_RRULE_BYSECOND,
            RulePart::ByMinute => KW_RRULE_BYMINUTE,
            RulePart::ByHour => KW_RRULE_BYHOUR,
            RulePart::ByDay => KW_RRULE_BYDAY,
            RulePart::ByMonthDay => KW_RRULE_BYMONTHDAY,
            RulePart::ByYearDay => KW_RRULE_BYYEARDAY,
            RulePart::ByWeekNo => KW_RRULE_BYWEEKNO,
            RulePart::ByMonth => KW_RRULE_BYMONTH,
            RulePart::BySetPos => KW_RRULE_BYSETPOS,
            RulePart::Wkst => KW_RRULE_WKST,
        })
    }
}
