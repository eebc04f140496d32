// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Recurring calendar components and their exceptions.

use std::fmt::Display;
use std::str::FromStr;

use jiff::Span;

use crate::datetime::{DateTimeValue, RDateValue};
use crate::rrule::RecurrenceRule;

/// The base definition of a recurring event, task or journal entry.
#[derive(Debug, Clone)]
pub struct Component {
    /// Unique identifier, shared by the base and its overrides
    pub uid: String,

    /// Kind of the component
    pub kind: ComponentKind,

    /// Summary, if any
    pub summary: Option<String>,

    /// Start of the first occurrence, the seed of every rule
    pub dtstart: DateTimeValue,

    /// End or duration of each occurrence
    pub end: Option<ComponentEnd>,

    /// Recurrence rules, their union forms the recurrence set
    pub rrules: Vec<RecurrenceRule>,

    /// Exclusion rules (RFC 2445 EXRULE), removed from the recurrence set
    pub exrules: Vec<RecurrenceRule>,

    /// Excluded dates, added dates and overridden occurrences
    pub exceptions: ExceptionSet,
}

impl Component {
    /// A non-recurring component starting at `dtstart`.
    pub fn new(uid: impl Into<String>, kind: ComponentKind, dtstart: DateTimeValue) -> Self {
        Self {
            uid: uid.into(),
            kind,
            summary: None,
            dtstart,
            end: None,
            rrules: Vec::new(),
            exrules: Vec::new(),
            exceptions: ExceptionSet::default(),
        }
    }

    /// Set the summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set the end or duration of each occurrence.
    #[must_use]
    pub fn with_end(mut self, end: ComponentEnd) -> Self {
        self.end = Some(end);
        self
    }

    /// Add a recurrence rule.
    #[must_use]
    pub fn with_rrule(mut self, rule: RecurrenceRule) -> Self {
        self.rrules.push(rule);
        self
    }

    /// Add an exclusion rule.
    #[must_use]
    pub fn with_exrule(mut self, rule: RecurrenceRule) -> Self {
        self.exrules.push(rule);
        self
    }

    /// Exclude an occurrence.
    #[must_use]
    pub fn with_exdate(mut self, exdate: DateTimeValue) -> Self {
        self.exceptions.exdates.push(exdate);
        self
    }

    /// Add an occurrence outside the rules.
    #[must_use]
    pub fn with_rdate(mut self, rdate: impl Into<RDateValue>) -> Self {
        self.exceptions.rdates.push(rdate.into());
        self
    }

    /// Replace the occurrence at `recurrence_id` with `component`.
    #[must_use]
    pub fn with_override(mut self, recurrence_id: DateTimeValue, component: Component) -> Self {
        self.exceptions.overrides.push(Override {
            recurrence_id,
            component,
        });
        self
    }

    /// Whether the component has any rule or added date.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        !self.rrules.is_empty() || !self.exceptions.rdates.is_empty()
    }

    /// Whether the recurrence set is finite.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.rrules.iter().all(RecurrenceRule::is_bounded)
    }
}

/// Kind of calendar component.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// VEVENT
    #[default]
    Event,

    /// VTODO
    Todo,

    /// VJOURNAL
    Journal,
}

const KIND_EVENT: &str = "VEVENT";
const KIND_TODO: &str = "VTODO";
const KIND_JOURNAL: &str = "VJOURNAL";

impl AsRef<str> for ComponentKind {
    fn as_ref(&self) -> &str {
        match self {
            ComponentKind::Event => KIND_EVENT,
            ComponentKind::Todo => KIND_TODO,
            ComponentKind::Journal => KIND_JOURNAL,
        }
    }
}

impl Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl FromStr for ComponentKind {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            KIND_EVENT => Ok(ComponentKind::Event),
            KIND_TODO => Ok(ComponentKind::Todo),
            KIND_JOURNAL => Ok(ComponentKind::Journal),
            _ => Err(()),
        }
    }
}

/// How long each occurrence lasts.
#[derive(Debug, Clone)]
pub enum ComponentEnd {
    /// DTEND (or DUE), taken relative to DTSTART
    DtEnd(DateTimeValue),

    /// DURATION
    Duration(Span),
}

/// Deviations from the rules of a component.
#[derive(Debug, Default, Clone)]
pub struct ExceptionSet {
    /// EXDATE values
    pub exdates: Vec<DateTimeValue>,

    /// RDATE values
    pub rdates: Vec<RDateValue>,

    /// Occurrences replaced by a modified component
    pub overrides: Vec<Override>,
}

impl ExceptionSet {
    /// Whether there are no exceptions at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exdates.is_empty() && self.rdates.is_empty() && self.overrides.is_empty()
    }
}

/// A modified occurrence, keyed by the slot it replaces.
///
/// An override whose slot is also excluded is still delivered.
#[derive(Debug, Clone)]
pub struct Override {
    /// RECURRENCE-ID, the original start of the replaced occurrence
    pub recurrence_id: DateTimeValue,

    /// The replacement, its DTSTART and end give the new time
    pub component: Component,
}
