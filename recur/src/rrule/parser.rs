// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use chumsky::extra::ParserExtra;
use chumsky::input::Input;
use chumsky::label::LabelError;
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::datetime::{DateTimeValue, value_date_or_date_time};
use crate::error::ParseError;
use crate::keyword::{
    KW_DAY_FR, KW_DAY_MO, KW_DAY_SA, KW_DAY_SU, KW_DAY_TH, KW_DAY_TU, KW_DAY_WE, KW_RRULE_BYDAY,
    KW_RRULE_BYHOUR, KW_RRULE_BYMINUTE, KW_RRULE_BYMONTH, KW_RRULE_BYMONTHDAY, KW_RRULE_BYSECOND,
    KW_RRULE_BYSETPOS, KW_RRULE_BYWEEKNO, KW_RRULE_BYYEARDAY, KW_RRULE_COUNT, KW_RRULE_FREQ,
    KW_RRULE_FREQ_DAILY, KW_RRULE_FREQ_HOURLY, KW_RRULE_FREQ_MINUTELY, KW_RRULE_FREQ_MONTHLY,
    KW_RRULE_FREQ_SECONDLY, KW_RRULE_FREQ_WEEKLY, KW_RRULE_FREQ_YEARLY, KW_RRULE_INTERVAL,
    KW_RRULE_UNTIL, KW_RRULE_WKST,
};
use crate::rrule::{RecurrenceFrequency, RecurrenceRule, RulePart, WeekDay, WeekDayNum};
use crate::syntax::{Expected, Extra, number, signed};

/// Parse the value of an RRULE property.
///
/// Rule part names and values are case-insensitive. The rule is validated
/// after parsing, see [`RecurrenceRule::validate`].
///
/// ## Errors
///
/// Syntax errors and duplicate parts point at the offending bytes of `src`.
///
/// ## Examples
///
/// ```
/// # use aimcal_recur::rrule::parse;
/// let rule = parse("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;COUNT=10").unwrap();
/// assert_eq!(rule.to_string(), "FREQ=WEEKLY;COUNT=10;INTERVAL=2;BYDAY=MO,WE");
/// ```
///
/// Errors carry spans that can be rendered as reports
///
/// ```
/// # use aimcal_recur::rrule::parse;
/// use ariadne::{Color, Label, Report, ReportKind, Source};
/// let src = "FREQ=DAILY;COUNT=3;COUNT=4";
/// let err = parse(src).unwrap_err();
/// let span = err.span().unwrap();
/// assert_eq!(span, 19..26);
/// Report::build(ReportKind::Error, span.clone())
///     .with_config(ariadne::Config::new().with_index_type(ariadne::IndexType::Byte))
///     .with_message(err.to_string())
///     .with_label(Label::new(span).with_message("here").with_color(Color::Red))
///     .finish()
///     .eprint(Source::from(src))
///     .unwrap();
/// ```
pub fn parse(src: &str) -> Result<RecurrenceRule, ParseError> {
    let src = src.to_ascii_uppercase();
    let parts = recur::<'_, &str, Extra<'_>>()
        .parse(src.as_str())
        .into_result()
        .map_err(ParseError::from_rich)?;

    let rule = build_from_parts(parts)?;
    rule.validate()?;
    Ok(rule)
}

/// ```txt
/// recur           = recur-rule-part *( ";" recur-rule-part )
///                 ;
///                 ; The rule parts are not ordered in any
///                 ; particular sequence.
/// ```
fn recur<'src, I, E>() -> impl Parser<'src, I, Vec<(Part, SimpleSpan)>, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, Expected>,
{
    recur_rule_part()
        .map_with(|part, e| (part, e.span()))
        .separated_by(just(';'))
        .at_least(1)
        .collect()
        .then_ignore(end())
}

/// FREQ is required, every part occurs at most once.
fn build_from_parts(parts: Vec<(Part, SimpleSpan)>) -> Result<RecurrenceRule, ParseError> {
    let mut freq = None;
    let mut rule = RecurrenceRule::new(RecurrenceFrequency::Yearly);
    let mut seen = Vec::with_capacity(parts.len());

    for (part, span) in parts {
        let kind = part.kind();
        if seen.contains(&kind) {
            return Err(ParseError::DuplicatePart {
                part: kind,
                span: span.into_range(),
            });
        }
        seen.push(kind);

        match part {
            Part::Freq(v) => freq = Some(v),
            Part::Until(v) => rule.until = Some(v),
            Part::Count(v) => rule.count = Some(v),
            Part::Interval(v) => rule.interval = v,
            Part::BySecond(v) => rule.by_second = v,
            Part::ByMinute(v) => rule.by_minute = v,
            Part::ByHour(v) => rule.by_hour = v,
            Part::ByDay(v) => rule.by_day = v,
            Part::ByMonthDay(v) => rule.by_month_day = v,
            Part::ByYearDay(v) => rule.by_year_day = v,
            Part::ByWeekNo(v) => rule.by_week_no = v,
            Part::ByMonth(v) => rule.by_month = v,
            Part::BySetPos(v) => rule.by_set_pos = v,
            Part::Wkst(v) => rule.wkst = Some(v),
        }
    }

    rule.freq = freq.ok_or(ParseError::MissingFreq)?;
    Ok(rule)
}

#[derive(Debug, Clone)]
enum Part {
    Freq(RecurrenceFrequency),
    Until(DateTimeValue),
    Count(u32),
    Interval(u32),
    BySecond(Vec<u8>),
    ByMinute(Vec<u8>),
    ByHour(Vec<u8>),
    ByDay(Vec<WeekDayNum>),
    ByMonthDay(Vec<i8>),
    ByYearDay(Vec<i16>),
    ByWeekNo(Vec<i8>),
    ByMonth(Vec<u8>),
    BySetPos(Vec<i16>),
    Wkst(WeekDay),
}

impl Part {
    fn kind(&self) -> RulePart {
        match self {
            Part::Freq(_) => RulePart::Freq,
            Part::Until(_) => RulePart::Until,
            Part::Count(_) => RulePart::Count,
            Part::Interval(_) => RulePart::Interval,
            Part::BySecond(_) => RulePart::BySecond,
            Part::ByMinute(_) => RulePart::ByMinute,
            Part::ByHour(_) => RulePart::ByHour,
            Part::ByDay(_) => RulePart::ByDay,
            Part::ByMonthDay(_) => RulePart::ByMonthDay,
            Part::ByYearDay(_) => RulePart::ByYearDay,
            Part::ByWeekNo(_) => RulePart::ByWeekNo,
            Part::ByMonth(_) => RulePart::ByMonth,
            Part::BySetPos(_) => RulePart::BySetPos,
            Part::Wkst(_) => RulePart::Wkst,
        }
    }
}

/// ```txt
/// recur-rule-part = ( "FREQ" "=" freq )
///                 / ( "UNTIL" "=" enddate )
///                 / ( "COUNT" "=" 1*DIGIT )
///                 / ( "INTERVAL" "=" 1*DIGIT )
///                 / ( "BYSECOND" "=" byseclist )
///                 / ( "BYMINUTE" "=" byminlist )
///                 / ( "BYHOUR" "=" byhrlist )
///                 / ( "BYDAY" "=" bywdaylist )
///                 / ( "BYMONTHDAY" "=" bymodaylist )
///                 / ( "BYYEARDAY" "=" byyrdaylist )
///                 / ( "BYWEEKNO" "=" bywknolist )
///                 / ( "BYMONTH" "=" bymolist )
///                 / ( "BYSETPOS" "=" bysplist )
///                 / ( "WKST" "=" weekday )
/// ```
///
/// Value ranges are checked by validation, the grammar only bounds digits.
fn recur_rule_part<'src, I, E>() -> impl Parser<'src, I, Part, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, Expected>,
{
    let kw = |kw| just(kw).ignore_then(just('='));

    let freq = kw(KW_RRULE_FREQ).ignore_then(freq()).map(Part::Freq);

    let until = kw(KW_RRULE_UNTIL)
        .ignore_then(value_date_or_date_time())
        .map(Part::Until);

    let count = kw(KW_RRULE_COUNT)
        .ignore_then(number(10))
        .map(Part::Count);

    let interval = kw(KW_RRULE_INTERVAL)
        .ignore_then(number(10))
        .map(Part::Interval);

    let by_second = kw(KW_RRULE_BYSECOND)
        .ignore_then(list(number(2)))
        .map(Part::BySecond);

    let by_minute = kw(KW_RRULE_BYMINUTE)
        .ignore_then(list(number(2)))
        .map(Part::ByMinute);

    let by_hour = kw(KW_RRULE_BYHOUR)
        .ignore_then(list(number(2)))
        .map(Part::ByHour);

    let by_day = kw(KW_RRULE_BYDAY)
        .ignore_then(list(weekdaynum()))
        .map(Part::ByDay);

    let by_month_day = kw(KW_RRULE_BYMONTHDAY)
        .ignore_then(list(signed(2)))
        .map(Part::ByMonthDay);

    let by_year_day = kw(KW_RRULE_BYYEARDAY)
        .ignore_then(list(signed(3)))
        .map(Part::ByYearDay);

    let by_week_no = kw(KW_RRULE_BYWEEKNO)
        .ignore_then(list(signed(2)))
        .map(Part::ByWeekNo);

    let by_month = kw(KW_RRULE_BYMONTH)
        .ignore_then(list(number(2)))
        .map(Part::ByMonth);

    let by_set_pos = kw(KW_RRULE_BYSETPOS)
        .ignore_then(list(signed(3)))
        .map(Part::BySetPos);

    let wkst = kw(KW_RRULE_WKST).ignore_then(weekday()).map(Part::Wkst);

    choice((
        freq,
        until,
        count,
        interval,
        by_second,
        by_minute,
        by_hour,
        by_day,
        by_month_day,
        by_year_day,
        by_week_no,
        by_month,
        by_set_pos,
        wkst,
    ))
}

fn list<'src, I, E, T>(item: impl Parser<'src, I, T, E>) -> impl Parser<'src, I, Vec<T>, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    item.separated_by(just(',')).at_least(1).collect()
}

/// ```txt
/// freq        = "SECONDLY" / "MINUTELY" / "HOURLY" / "DAILY"
///             / "WEEKLY" / "MONTHLY" / "YEARLY"
/// ```
fn freq<'src, I, E>() -> impl Parser<'src, I, RecurrenceFrequency, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    choice((
        just(KW_RRULE_FREQ_SECONDLY).to(RecurrenceFrequency::Secondly),
        just(KW_RRULE_FREQ_MINUTELY).to(RecurrenceFrequency::Minutely),
        just(KW_RRULE_FREQ_HOURLY).to(RecurrenceFrequency::Hourly),
        just(KW_RRULE_FREQ_DAILY).to(RecurrenceFrequency::Daily),
        just(KW_RRULE_FREQ_WEEKLY).to(RecurrenceFrequency::Weekly),
        just(KW_RRULE_FREQ_MONTHLY).to(RecurrenceFrequency::Monthly),
        just(KW_RRULE_FREQ_YEARLY).to(RecurrenceFrequency::Yearly),
    ))
}

/// ```txt
/// weekdaynum  = [[plus / minus] ordwk] weekday
/// ```
fn weekdaynum<'src, I, E>() -> impl Parser<'src, I, WeekDayNum, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, Expected>,
{
    signed(2)
        .or_not()
        .then(weekday())
        .map(|(occurrence, day)| WeekDayNum { day, occurrence })
}

/// ```txt
/// weekday     = "SU" / "MO" / "TU" / "WE" / "TH" / "FR" / "SA"
/// ```
fn weekday<'src, I, E>() -> impl Parser<'src, I, WeekDay, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    choice((
        just(KW_DAY_SU).to(WeekDay::Sunday),
        just(KW_DAY_MO).to(WeekDay::Monday),
        just(KW_DAY_TU).to(WeekDay::Tuesday),
        just(KW_DAY_WE).to(WeekDay::Wednesday),
        just(KW_DAY_TH).to(WeekDay::Thursday),
        just(KW_DAY_FR).to(WeekDay::Friday),
        just(KW_DAY_SA).to(WeekDay::Saturday),
    ))
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, datetime};

    use super::*;
    use crate::rrule::ValidationError;

    #[test]
    fn parses_rrule_simple() {
        let rule = parse("FREQ=DAILY;COUNT=10").unwrap();
        assert_eq!(rule.freq, RecurrenceFrequency::Daily);
        assert_eq!(rule.count, Some(10));
        assert_eq!(rule.interval, 1);
        assert!(rule.until.is_none());
    }

    #[test]
    fn parses_rrule_with_until() {
        let rule = parse("FREQ=WEEKLY;UNTIL=19971224T000000Z").unwrap();
        assert_eq!(
            rule.until,
            Some(DateTimeValue::Utc(datetime(1997, 12, 24, 0, 0, 0, 0)))
        );

        let rule = parse("FREQ=WEEKLY;UNTIL=19971224").unwrap();
        assert_eq!(rule.until, Some(DateTimeValue::Date(date(1997, 12, 24))));
    }

    #[test]
    fn parses_rrule_with_byday() {
        let rule = parse("FREQ=MONTHLY;BYDAY=MO,+2TU,-1FR").unwrap();
        assert_eq!(
            rule.by_day,
            vec![
                WeekDayNum::every(WeekDay::Monday),
                WeekDayNum::nth(2, WeekDay::Tuesday),
                WeekDayNum::nth(-1, WeekDay::Friday),
            ]
        );
    }

    #[test]
    fn parses_rrule_with_all_by_parts() {
        let rule = parse(
            "FREQ=YEARLY;INTERVAL=2;BYMONTH=1,12;BYWEEKNO=-1,20;BYYEARDAY=1,-366;\
             BYMONTHDAY=-31,15;BYHOUR=8,9;BYMINUTE=0,30;BYSECOND=0,60;BYSETPOS=-1;WKST=SU",
        )
        .unwrap();
        assert_eq!(rule.interval, 2);
        assert_eq!(rule.by_month, vec![1, 12]);
        assert_eq!(rule.by_week_no, vec![-1, 20]);
        assert_eq!(rule.by_year_day, vec![1, -366]);
        assert_eq!(rule.by_month_day, vec![-31, 15]);
        assert_eq!(rule.by_hour, vec![8, 9]);
        assert_eq!(rule.by_minute, vec![0, 30]);
        assert_eq!(rule.by_second, vec![0, 60]);
        assert_eq!(rule.by_set_pos, vec![-1]);
        assert_eq!(rule.wkst, Some(WeekDay::Sunday));
    }

    #[test]
    fn parses_rrule_case_insensitive() {
        let rule = parse("freq=weekly;byday=mo,we").unwrap();
        assert_eq!(rule.freq, RecurrenceFrequency::Weekly);
        assert_eq!(rule.by_day.len(), 2);
    }

    #[test]
    fn parses_rrule_rejects_missing_freq() {
        assert_eq!(parse("COUNT=3"), Err(ParseError::MissingFreq));
    }

    #[test]
    fn parses_rrule_rejects_duplicate_parts() {
        let err = parse("FREQ=DAILY;BYHOUR=9;BYHOUR=10").unwrap_err();
        assert_eq!(
            err,
            ParseError::DuplicatePart {
                part: RulePart::ByHour,
                span: 20..29,
            }
        );
    }

    #[test]
    fn parses_rrule_rejects_count_with_until() {
        assert_eq!(
            parse("FREQ=DAILY;COUNT=3;UNTIL=20240101"),
            Err(ParseError::Invalid(ValidationError::CountWithUntil))
        );
    }

    #[test]
    fn parses_rrule_rejects_out_of_range() {
        assert!(matches!(
            parse("FREQ=MONTHLY;BYMONTHDAY=32"),
            Err(ParseError::Invalid(ValidationError::OutOfRange { .. }))
        ));
        assert!(matches!(
            parse("FREQ=DAILY;BYMONTH=13"),
            Err(ParseError::Invalid(ValidationError::OutOfRange { .. }))
        ));
        assert!(matches!(
            parse("FREQ=DAILY;INTERVAL=0"),
            Err(ParseError::Invalid(ValidationError::ZeroInterval))
        ));
    }

    #[test]
    fn parses_rrule_rejects_syntax_errors() {
        for src in [
            "",
            "FREQ=FORTNIGHTLY",
            "FREQ=DAILY;",
            "FREQ=DAILY;;COUNT=2",
            "FREQ=DAILY;BYDAY=XX",
            "FREQ=DAILY;COUNT=-1",
            "FREQ=DAILY;X-NAME=1",
            "FREQ=DAILY;BYHOUR=",
        ] {
            let err = parse(src).unwrap_err();
            assert!(
                matches!(err, ParseError::Syntax { .. }),
                "{src:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn parses_rrule_syntax_error_span() {
        let err = parse("FREQ=DAILY;BYDAY=XX").unwrap_err();
        let span = err.span().unwrap();
        assert!(span.start >= 11, "span {span:?}");
    }
}
