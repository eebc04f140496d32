// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Date-time values, calendar arithmetic and time zones.

pub mod calendar;
mod instance;
mod timezone;
mod value;

pub use crate::datetime::instance::Instance;
pub use crate::datetime::timezone::{
    LocalTime, Observance, ObservanceKind, TimeZoneRule, TimeZoneTable, Transition, UTC_ID,
};
pub use crate::datetime::value::{DateTimeValue, PeriodEnd, RDateValue, parse_duration};
pub(crate) use crate::datetime::value::value_date_or_date_time;
