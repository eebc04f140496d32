// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use crate::datetime::DateTimeValue;
use crate::rrule::{RecurrenceFrequency, RecurrenceRule, RulePart};

/// A recurrence rule that is well-formed text but breaks RFC 5545 constraints.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// INTERVAL must be a positive integer
    #[error("INTERVAL must be at least 1")]
    ZeroInterval,

    /// COUNT must be a positive integer
    #[error("COUNT must be at least 1")]
    ZeroCount,

    /// COUNT and UNTIL are mutually exclusive
    #[error("COUNT and UNTIL must not occur in the same rule")]
    CountWithUntil,

    /// UNTIL carries no TZID, it is a date, a floating or a UTC date-time
    #[error("UNTIL must be a date, a floating or a UTC date-time, found TZID '{tz_id}'")]
    ZonedUntil {
        /// Offending time zone identifier
        tz_id: String,
    },

    /// A by-part value is outside its range
    #[error("{part} value {value} is out of range {min}..={max}")]
    OutOfRange {
        /// Rule part holding the value
        part: RulePart,
        /// Offending value
        value: i32,
        /// Smallest accepted magnitude
        min: i32,
        /// Largest accepted magnitude
        max: i32,
    },

    /// A by-part that must not be used with the rule's frequency
    #[error("{part} must not be used with FREQ={freq}")]
    IncompatiblePart {
        /// Offending rule part
        part: RulePart,
        /// Frequency of the rule
        freq: RecurrenceFrequency,
    },

    /// BYDAY with numeric occurrences outside a MONTHLY or YEARLY rule
    #[error("BYDAY with a numeric occurrence must not be used with FREQ={freq}")]
    OrdinalByDay {
        /// Frequency of the rule
        freq: RecurrenceFrequency,
    },

    /// BYDAY with numeric occurrences combined with BYWEEKNO
    #[error("BYDAY with a numeric occurrence must not be combined with BYWEEKNO")]
    OrdinalByDayWithWeekNo,

    /// BYSETPOS without any other by-part to select from
    #[error("BYSETPOS must be used with another BYxxx rule part")]
    SetPosWithoutByPart,
}

impl RecurrenceRule {
    /// Check the rule against the constraints of RFC 5545 Section 3.3.10.
    ///
    /// Parsing already runs this check, it is exposed for rules built in code.
    ///
    /// ## Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        use RecurrenceFrequency::{Daily, Monthly, Weekly, Yearly};

        if self.interval == 0 {
            return Err(ValidationError::ZeroInterval);
        }
        match (self.count, &self.until) {
            (Some(_), Some(_)) => return Err(ValidationError::CountWithUntil),
            (Some(0), None) => return Err(ValidationError::ZeroCount),
            (None, Some(DateTimeValue::Zoned { tz_id, .. })) => {
                return Err(ValidationError::ZonedUntil {
                    tz_id: tz_id.clone(),
                });
            }
            _ => {}
        }

        check_unsigned(RulePart::BySecond, &self.by_second, 0, 60)?;
        check_unsigned(RulePart::ByMinute, &self.by_minute, 0, 59)?;
        check_unsigned(RulePart::ByHour, &self.by_hour, 0, 23)?;
        check_unsigned(RulePart::ByMonth, &self.by_month, 1, 12)?;
        check_signed(RulePart::ByMonthDay, &self.by_month_day, 31)?;
        check_signed(RulePart::ByYearDay, &self.by_year_day, 366)?;
        check_signed(RulePart::ByWeekNo, &self.by_week_no, 53)?;
        check_signed(RulePart::BySetPos, &self.by_set_pos, 366)?;
        let ordinals: Vec<i8> = self.by_day.iter().filter_map(|d| d.occurrence).collect();
        check_signed(RulePart::ByDay, &ordinals, 53)?;

        let incompatible = |part| {
            Err(ValidationError::IncompatiblePart {
                part,
                freq: self.freq,
            })
        };
        if !self.by_week_no.is_empty() && self.freq != Yearly {
            return incompatible(RulePart::ByWeekNo);
        }
        if !self.by_year_day.is_empty() && matches!(self.freq, Daily | Weekly | Monthly) {
            return incompatible(RulePart::ByYearDay);
        }
        if !self.by_month_day.is_empty() && self.freq == Weekly {
            return incompatible(RulePart::ByMonthDay);
        }

        if !ordinals.is_empty() {
            if !matches!(self.freq, Monthly | Yearly) {
                return Err(ValidationError::OrdinalByDay { freq: self.freq });
            }
            if !self.by_week_no.is_empty() {
                return Err(ValidationError::OrdinalByDayWithWeekNo);
            }
        }

        if !self.by_set_pos.is_empty() && !self.has_by_part() {
            return Err(ValidationError::SetPosWithoutByPart);
        }

        Ok(())
    }
}

fn check_unsigned(part: RulePart, values: &[u8], min: u8, max: u8) -> Result<(), ValidationError> {
    match values.iter().find(|&&v| v < min || v > max) {
        Some(&v) => Err(ValidationError::OutOfRange {
            part,
            value: i32::from(v),
            min: i32::from(min),
            max: i32::from(max),
        }),
        None => Ok(()),
    }
}

/// Signed parts accept `-max..=-1` and `1..=max`.
fn check_signed<T>(part: RulePart, values: &[T], max: i32) -> Result<(), ValidationError>
where
    T: Copy + Into<i32>,
{
    match values
        .iter()
        .map(|&v| v.into())
        .find(|v| *v == 0 || v.abs() > max)
    {
        Some(value) => Err(ValidationError::OutOfRange {
            part,
            value,
            min: 1,
            max,
        }),
        None => Ok(()),
    }
}
