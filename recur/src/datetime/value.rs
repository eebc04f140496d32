// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Date and date-time values of DTSTART, EXDATE, RDATE and UNTIL.

use std::fmt::{self, Display};
use std::str::FromStr;

use chumsky::extra::ParserExtra;
use chumsky::input::Input;
use chumsky::label::LabelError;
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;
use jiff::Span;
use jiff::fmt::temporal::SpanParser;
use jiff::civil::{Date, DateTime, Time};

use crate::error::ParseError;
use crate::syntax::{Expected, Extra, fixed};

/// A DATE or DATE-TIME value as written in iCalendar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateTimeValue {
    /// All-day value, floating
    Date(Date),
    /// Date-time without zone, read in the viewer's zone
    Floating(DateTime),
    /// Date-time in UTC, written with a trailing `Z`
    Utc(DateTime),
    /// Date-time in a named zone, written with a TZID parameter
    Zoned {
        /// Wall clock in the zone
        datetime: DateTime,
        /// Time zone identifier
        tz_id: String,
    },
}

impl DateTimeValue {
    /// Parse a DATE or DATE-TIME, with the TZID parameter of its property.
    ///
    /// A TZID applies to floating date-times only, dates and UTC values
    /// ignore it.
    ///
    /// ## Errors
    ///
    /// If the text is not a valid DATE or DATE-TIME.
    pub fn parse(src: &str, tz_id: Option<&str>) -> Result<Self, ParseError> {
        value_date_or_date_time::<'_, &str, Extra<'_>>()
            .then_ignore(end())
            .parse(src)
            .into_result()
            .map(|v| v.with_tz(tz_id))
            .map_err(ParseError::from_rich)
    }

    /// Parse a comma separated list of values, as in EXDATE.
    ///
    /// ## Errors
    ///
    /// If any value is not a valid DATE or DATE-TIME.
    pub fn parse_list(src: &str, tz_id: Option<&str>) -> Result<Vec<Self>, ParseError> {
        value_date_or_date_time::<'_, &str, Extra<'_>>()
            .separated_by(just(','))
            .at_least(1)
            .collect::<Vec<_>>()
            .then_ignore(end())
            .parse(src)
            .into_result()
            .map(|vs| vs.into_iter().map(|v| v.with_tz(tz_id)).collect())
            .map_err(ParseError::from_rich)
    }

    /// Whether this is an all-day value.
    #[must_use]
    pub const fn is_date(&self) -> bool {
        matches!(self, DateTimeValue::Date(_))
    }

    /// Wall clock of the value, midnight for dates.
    #[must_use]
    pub fn datetime(&self) -> DateTime {
        match self {
            DateTimeValue::Date(date) => date.to_datetime(Time::midnight()),
            DateTimeValue::Floating(dt)
            | DateTimeValue::Utc(dt)
            | DateTimeValue::Zoned { datetime: dt, .. } => *dt,
        }
    }

    /// Time zone identifier, if the value carries one.
    #[must_use]
    pub fn tz_id(&self) -> Option<&str> {
        match self {
            DateTimeValue::Zoned { tz_id, .. } => Some(tz_id),
            _ => None,
        }
    }

    fn with_tz(self, tz_id: Option<&str>) -> Self {
        match (self, tz_id) {
            (DateTimeValue::Floating(datetime), Some(tz_id)) => DateTimeValue::Zoned {
                datetime,
                tz_id: tz_id.to_string(),
            },
            (v, _) => v,
        }
    }
}

impl FromStr for DateTimeValue {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, None)
    }
}

/// The value part only, the TZID of zoned values is a property parameter.
impl Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_date = |f: &mut fmt::Formatter<'_>, d: Date| {
            write!(f, "{:04}{:02}{:02}", d.year(), d.month(), d.day())
        };
        let write_date_time = |f: &mut fmt::Formatter<'_>, dt: &DateTime| {
            write_date(f, dt.date())?;
            write!(f, "T{:02}{:02}{:02}", dt.hour(), dt.minute(), dt.second())
        };

        match self {
            DateTimeValue::Date(date) => write_date(f, *date),
            DateTimeValue::Floating(dt) | DateTimeValue::Zoned { datetime: dt, .. } => {
                write_date_time(f, dt)
            }
            DateTimeValue::Utc(dt) => {
                write_date_time(f, dt)?;
                write!(f, "Z")
            }
        }
    }
}

/// A value of an RDATE property.
#[derive(Debug, Clone)]
pub enum RDateValue {
    /// A single date or date-time
    Instant(DateTimeValue),
    /// A PERIOD, which also fixes the duration of that occurrence
    Period {
        /// Start of the period
        start: DateTimeValue,
        /// End or duration of the period
        end: PeriodEnd,
    },
}

/// Second half of a PERIOD value.
#[derive(Debug, Clone)]
pub enum PeriodEnd {
    /// Explicit end
    DateTime(DateTimeValue),
    /// Duration from the start
    Duration(Span),
}

impl RDateValue {
    /// Parse a comma separated RDATE value list.
    ///
    /// ## Errors
    ///
    /// If any value is not a valid DATE, DATE-TIME or PERIOD.
    pub fn parse_list(src: &str, tz_id: Option<&str>) -> Result<Vec<Self>, ParseError> {
        let period_end = choice((
            value_date_or_date_time::<'_, &str, Extra<'_>>().map(PeriodEnd::DateTime),
            value_duration::<'_, &str, Extra<'_>>().map(PeriodEnd::Duration),
        ));
        let rdate = value_date_or_date_time::<'_, &str, Extra<'_>>()
            .then(just('/').ignore_then(period_end).or_not())
            .map(|(start, end)| match end {
                Some(end) => RDateValue::Period { start, end },
                None => RDateValue::Instant(start),
            });

        rdate
            .separated_by(just(','))
            .at_least(1)
            .collect::<Vec<_>>()
            .then_ignore(end())
            .parse(src)
            .into_result()
            .map(|vs| vs.into_iter().map(|v| v.with_tz(tz_id)).collect())
            .map_err(ParseError::from_rich)
    }

    /// Start of the value.
    #[must_use]
    pub fn start(&self) -> &DateTimeValue {
        match self {
            RDateValue::Instant(start) | RDateValue::Period { start, .. } => start,
        }
    }

    fn with_tz(self, tz_id: Option<&str>) -> Self {
        match self {
            RDateValue::Instant(v) => RDateValue::Instant(v.with_tz(tz_id)),
            RDateValue::Period { start, end } => RDateValue::Period {
                start: start.with_tz(tz_id),
                end: match end {
                    PeriodEnd::DateTime(v) => PeriodEnd::DateTime(v.with_tz(tz_id)),
                    PeriodEnd::Duration(d) => PeriodEnd::Duration(d),
                },
            },
        }
    }
}

impl From<DateTimeValue> for RDateValue {
    fn from(value: DateTimeValue) -> Self {
        RDateValue::Instant(value)
    }
}

/// Parse a DURATION value such as `PT1H30M` or `P1W`.
///
/// ## Errors
///
/// If the text is not a valid duration.
pub fn parse_duration(src: &str) -> Result<Span, ParseError> {
    value_duration::<'_, &str, Extra<'_>>()
        .then_ignore(end())
        .parse(src)
        .into_result()
        .map_err(ParseError::from_rich)
}

/// ```txt
/// date-value         = date-fullyear date-month date-mday
/// date-fullyear      = 4DIGIT
/// date-month         = 2DIGIT        ;01-12
/// date-mday          = 2DIGIT        ;01-28, 01-29, 01-30, 01-31
/// ```
fn value_date<'src, I, E>() -> impl Parser<'src, I, Date, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, Expected>,
{
    fixed::<_, _, i16>(4)
        .then(fixed::<_, _, i8>(2))
        .then(fixed::<_, _, i8>(2))
        .try_map(|((year, month), day), span| {
            Date::new(year, month, day)
                .map_err(|_| E::Error::expected_found([Expected::Date], None, span))
        })
}

/// ```txt
/// time         = time-hour time-minute time-second [time-utc]
/// ```
///
/// Leap second 60 is contracted to 59.
fn value_time<'src, I, E>() -> impl Parser<'src, I, (Time, bool), E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, Expected>,
{
    fixed::<_, _, i8>(2)
        .then(fixed::<_, _, i8>(2))
        .then(fixed::<_, _, i8>(2))
        .try_map(|((hour, minute), second), span| {
            Time::new(hour, minute, second.min(59), 0)
                .map_err(|_| E::Error::expected_found([Expected::Time], None, span))
        })
        .then(just('Z').or_not().map(|z| z.is_some()))
}

/// ```txt
/// date / date-time
/// ```
pub(crate) fn value_date_or_date_time<'src, I, E>() -> impl Parser<'src, I, DateTimeValue, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, Expected>,
{
    value_date()
        .then(just('T').ignore_then(value_time()).or_not())
        .map(|(date, time)| match time {
            Some((time, true)) => DateTimeValue::Utc(date.to_datetime(time)),
            Some((time, false)) => DateTimeValue::Floating(date.to_datetime(time)),
            None => DateTimeValue::Date(date),
        })
}

/// Accepts ISO 8601 durations only, not jiff's friendly `1h30m` form.
static DURATION_PARSER: SpanParser = SpanParser::new();

/// ISO 8601 duration such as `PT1H30M` or `-P1W`.
fn value_duration<'src, I, E>() -> impl Parser<'src, I, Span, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, Expected>,
{
    select! { c if char::is_ascii_alphanumeric(&c) || matches!(c, '+' | '-') => c }
        .repeated()
        .at_least(1)
        .collect::<String>()
        .try_map(|text: String, span| {
            DURATION_PARSER
                .parse_span(&text)
                .map_err(|_| E::Error::expected_found([Expected::Duration], None, span))
        })
}
