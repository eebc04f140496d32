// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{borrow::Cow, fmt};

use aimcal_recur::{Occurrence, OccurrenceKind};
use colored::Color;

use crate::table::{PaddingDirection, Table, TableColumn, TableStyleBasic, TableStyleJson};
use crate::util::{OutputFormat, format_instance, format_range};

#[derive(Debug)]
pub struct OccurrenceFormatter {
    columns: Vec<OccurrenceColumn>,
    format: OutputFormat,
}

impl OccurrenceFormatter {
    pub fn new(verbose: bool) -> Self {
        let columns = if verbose {
            vec![
                OccurrenceColumn::Uid,
                OccurrenceColumn::TimeRange,
                OccurrenceColumn::Kind,
                OccurrenceColumn::RecurrenceId,
                OccurrenceColumn::Summary,
            ]
        } else {
            vec![OccurrenceColumn::TimeRange, OccurrenceColumn::Summary]
        };
        Self {
            columns,
            format: OutputFormat::Table,
        }
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn format<'a, 'c>(&'a self, occurrences: &'a [Occurrence<'c>]) -> Display<'a, 'c> {
        Display {
            occurrences,
            formatter: self,
        }
    }
}

#[derive(Debug)]
pub struct Display<'a, 'c> {
    occurrences: &'a [Occurrence<'c>],
    formatter: &'a OccurrenceFormatter,
}

impl fmt::Display for Display<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = &self.formatter.columns;
        match self.formatter.format {
            OutputFormat::Json => write!(
                f,
                "{}",
                Table::new(TableStyleJson::new(), columns, self.occurrences)
            ),
            OutputFormat::Table => write!(
                f,
                "{}",
                Table::new(TableStyleBasic::new(), columns, self.occurrences)
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceColumn {
    Kind,
    RecurrenceId,
    Summary,
    TimeRange,
    Uid,
}

impl<'c> TableColumn<Occurrence<'c>> for OccurrenceColumn {
    fn name(&self) -> Cow<'_, str> {
        match self {
            OccurrenceColumn::Kind => "kind",
            OccurrenceColumn::RecurrenceId => "recurrence_id",
            OccurrenceColumn::Summary => "summary",
            OccurrenceColumn::TimeRange => "time_range",
            OccurrenceColumn::Uid => "uid",
        }
        .into()
    }

    fn format<'a>(&self, data: &'a Occurrence<'c>) -> Cow<'a, str> {
        match self {
            OccurrenceColumn::Kind => kind_name(data.kind).into(),
            OccurrenceColumn::RecurrenceId => format_instance(&data.recurrence_id).into(),
            OccurrenceColumn::Summary => data.component.summary.as_deref().unwrap_or("").into(),
            OccurrenceColumn::TimeRange => format_range(&data.start, &data.end).into(),
            OccurrenceColumn::Uid => data.component.uid.as_str().into(),
        }
    }

    fn padding_direction(&self) -> PaddingDirection {
        match self {
            OccurrenceColumn::Uid => PaddingDirection::Right,
            _ => PaddingDirection::Left,
        }
    }

    fn get_color(&self, data: &Occurrence<'c>) -> Option<Color> {
        match (self, data.kind) {
            (OccurrenceColumn::TimeRange | OccurrenceColumn::Kind, OccurrenceKind::Added) => {
                Some(Color::Cyan)
            }
            (OccurrenceColumn::TimeRange | OccurrenceColumn::Kind, OccurrenceKind::Overridden) => {
                Some(Color::Yellow)
            }
            _ => None,
        }
    }
}

fn kind_name(kind: OccurrenceKind) -> &'static str {
    match kind {
        OccurrenceKind::Generated => "generated",
        OccurrenceKind::Added => "added",
        OccurrenceKind::Overridden => "overridden",
    }
}
