// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Expand iCalendar recurrence rules into occurrences.
//!
//! The crate is layered bottom-up:
//!
//! - [`datetime`]: calendar arithmetic, date-time values and time zones
//! - [`rrule`]: the RRULE model, its parser and validation
//! - [`expand`]: the lazy expansion of a single rule
//! - [`RecurrenceSet`]: DTSTART, RRULE, RDATE, EXDATE, EXRULE and overrides
//!   merged into one stream
//! - [`Expander`]: range queries with early termination

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::missing_panics_doc,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::module_name_repetitions
)]

mod component;
mod config;
pub mod datetime;
mod error;
pub mod expand;
pub mod keyword;
mod query;
mod resolve;
pub mod rrule;
mod syntax;

pub use crate::component::{Component, ComponentEnd, ComponentKind, ExceptionSet, Override};
pub use crate::config::ExpandConfig;
pub use crate::datetime::{
    DateTimeValue, Instance, LocalTime, Observance, ObservanceKind, PeriodEnd, RDateValue,
    TimeZoneRule, TimeZoneTable, Transition, parse_duration,
};
pub use crate::error::{ParseError, QueryError, TimeZoneError, ValidationError};
pub use crate::expand::RuleIter;
pub use crate::query::{BatchReport, Expander, Occurrence, OccurrenceKind, Occurrences};
pub use crate::resolve::{RecurrenceSet, Slot, SlotSource};
pub use crate::rrule::{
    RecurrenceFrequency, RecurrenceRule, RulePart, WeekDay, WeekDayNum, parse as parse_rrule,
};
