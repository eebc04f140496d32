// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Error types returned by parsing, time zone handling and range queries.

use std::ops::Range;

use chumsky::error::Rich;
use jiff::Timestamp;

use crate::rrule::RulePart;

pub use crate::rrule::ValidationError;

/// Error of parsing recurrence rules and date-time values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Text does not follow the grammar
    #[error("{message}")]
    Syntax {
        /// Description of what was expected
        message: String,
        /// Byte range of the offending text
        span: Range<usize>,
    },

    /// The FREQ rule part is required
    #[error("missing required FREQ rule part")]
    MissingFreq,

    /// A rule part occurs more than once
    #[error("rule part {part} occurs more than once")]
    DuplicatePart {
        /// The repeated part
        part: RulePart,
        /// Byte range of the second occurrence
        span: Range<usize>,
    },

    /// Well-formed but invalid rule
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl ParseError {
    /// Byte range of the source text the error points at, if any.
    #[must_use]
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            ParseError::Syntax { span, .. } | ParseError::DuplicatePart { span, .. } => {
                Some(span.clone())
            }
            ParseError::MissingFreq | ParseError::Invalid(_) => None,
        }
    }

    pub(crate) fn from_rich(errs: Vec<Rich<'_, char>>) -> Self {
        match errs.into_iter().next() {
            Some(e) => ParseError::Syntax {
                message: e.to_string(),
                span: e.span().into_range(),
            },
            None => ParseError::Syntax {
                message: "invalid input".to_string(),
                span: 0..0,
            },
        }
    }
}

/// Error of building a time zone.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeZoneError {
    /// The zone is not in the time zone database
    #[error("unknown time zone '{0}'")]
    Unknown(String),

    /// A zone observance carries an invalid recurrence rule
    #[error("invalid observance in time zone '{tz_id}': {source}")]
    InvalidObservance {
        /// Zone being built
        tz_id: String,
        /// Rule violation
        #[source]
        source: ValidationError,
    },
}

/// Error of a range query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// No range end and a rule without COUNT or UNTIL
    #[error("component '{uid}' recurs forever, a range end is required")]
    Unbounded {
        /// UID of the component
        uid: String,
    },

    /// The component carries a rule that fails validation
    #[error("component '{uid}' has an invalid recurrence rule: {source}")]
    InvalidRule {
        /// UID of the component
        uid: String,
        /// Rule violation
        #[source]
        source: ValidationError,
    },

    /// The range ends before it starts
    #[error("range end {end} is before range start {start}")]
    InvalidRange {
        /// Start of the range
        start: Timestamp,
        /// End of the range
        end: Timestamp,
    },
}
