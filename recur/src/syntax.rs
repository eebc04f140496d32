// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Shared parser building blocks.

use std::borrow::Cow;
use std::ops::Neg;

use chumsky::error::RichPattern;
use chumsky::extra;
use chumsky::extra::ParserExtra;
use chumsky::input::Input;
use chumsky::label::LabelError;
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

/// Parser state of the public entry points: rich errors, no context.
pub(crate) type Extra<'src> = extra::Err<Rich<'src, char>>;

/// Failure reasons when a specific value was expected but not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expected {
    /// A valid calendar date
    Date,
    /// A valid time of day
    Time,
    /// An ISO 8601 duration
    Duration,
    /// An integer that fits its target type
    Number,
}

impl From<Expected> for RichPattern<'_, char> {
    fn from(expected: Expected) -> Self {
        match expected {
            Expected::Date => Self::Label(Cow::Borrowed("valid date")),
            Expected::Time => Self::Label(Cow::Borrowed("valid time")),
            Expected::Duration => Self::Label(Cow::Borrowed("duration")),
            Expected::Number => Self::Label(Cow::Borrowed("number in range")),
        }
    }
}

/// Unsigned integer of 1 to `max_digits` digits.
pub(crate) fn number<'src, I, E, T>(max_digits: usize) -> impl Parser<'src, I, T, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, Expected>,
    T: lexical::FromLexical,
{
    select! { c @ '0'..='9' => c }
        .repeated()
        .at_least(1)
        .at_most(max_digits)
        .collect::<String>()
        .try_map(|digits: String, span| {
            lexical::parse::<T, _>(&digits)
                .map_err(|_| E::Error::expected_found([Expected::Number], None, span))
        })
}

/// Unsigned integer of exactly `digits` digits.
pub(crate) fn fixed<'src, I, E, T>(digits: usize) -> impl Parser<'src, I, T, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, Expected>,
    T: lexical::FromLexical,
{
    select! { c @ '0'..='9' => c }
        .repeated()
        .exactly(digits)
        .collect::<String>()
        .try_map(|digits: String, span| {
            lexical::parse::<T, _>(&digits)
                .map_err(|_| E::Error::expected_found([Expected::Number], None, span))
        })
}

/// ```txt
/// [plus / minus] 1*DIGIT
/// ```
pub(crate) fn signed<'src, I, E, T>(max_digits: usize) -> impl Parser<'src, I, T, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, Expected>,
    T: lexical::FromLexical + Neg<Output = T>,
{
    is_positive()
        .then(number(max_digits))
        .map(|(positive, n): (bool, T)| if positive { n } else { -n })
}

fn is_positive<'src, I, E>() -> impl Parser<'src, I, bool, E> + Copy
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    select! { c @ ('+' | '-') => c }
        .or_not()
        .map(|c| !matches!(c, Some('-')))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_signed(src: &str) -> Result<i16, Vec<Rich<'_, char>>> {
        signed::<'_, _, extra::Err<_>, i16>(3)
            .then_ignore(end())
            .parse(src)
            .into_result()
    }

    #[test]
    fn parses_signed_numbers() {
        assert_eq!(parse_signed("7"), Ok(7));
        assert_eq!(parse_signed("+7"), Ok(7));
        assert_eq!(parse_signed("-366"), Ok(-366));
        assert_eq!(parse_signed("007"), Ok(7));
        assert!(parse_signed("-").is_err());
        assert!(parse_signed("1234").is_err());
    }

    #[test]
    fn parses_fixed_width_numbers() {
        let parser = fixed::<'_, &str, extra::Err<Rich<'_, char>>, i8>(2).then_ignore(end());
        assert_eq!(parser.parse("07").into_result(), Ok(7));
        assert!(parser.parse("7").into_result().is_err());
        assert!(parser.parse("007").into_result().is_err());
    }

    #[test]
    fn rejects_numbers_out_of_type_range() {
        let parser = number::<'_, &str, extra::Err<Rich<'_, char>>, u8>(3).then_ignore(end());
        assert_eq!(parser.parse("255").into_result(), Ok(255));
        assert!(parser.parse("256").into_result().is_err());
    }
}
