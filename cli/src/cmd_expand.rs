// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, io, ops::ControlFlow};

use aimcal_recur::{
    Component, ComponentEnd, ComponentKind, DateTimeValue, ExpandConfig, Expander, RDateValue,
    RecurrenceRule, parse_duration,
};
use clap::{ArgMatches, Command, arg, value_parser};
use jiff::Timestamp;

use crate::arg::{CommonArgs, RangeArgs};
use crate::occurrence_formatter::OccurrenceFormatter;
use crate::util::{OutputFormat, parse_instant, parse_value};

const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct CmdExpand {
    pub rule: String,
    pub start: String,
    pub tz: Option<String>,
    pub duration: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub exdates: Vec<String>,
    pub rdates: Vec<String>,
    pub limit: usize,

    pub output_format: OutputFormat,
    pub verbose: bool,
}

impl CmdExpand {
    pub const NAME: &str = "expand";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Expand a recurrence rule into occurrences")
            .arg(arg!(rule: <RULE> "The RRULE value, e.g. FREQ=WEEKLY;BYDAY=MO"))
            .arg(arg!(-s --start <DTSTART> "Start of the first occurrence").required(true))
            .arg(arg!(--tz <TZID> "IANA time zone of DTSTART, EXDATE and RDATE wall clocks"))
            .arg(arg!(-d --duration <DURATION> "Duration of each occurrence, e.g. PT1H"))
            .arg(RangeArgs::from(false))
            .arg(RangeArgs::to(false))
            .arg(arg!(--exdate <EXDATE> "Excluded dates, comma separated").num_args(1..))
            .arg(arg!(--rdate <RDATE> "Extra dates or periods, comma separated").num_args(1..))
            .arg(
                arg!(-n --limit <LIMIT> "Maximum number of occurrences to show")
                    .value_parser(value_parser!(usize))
                    .default_value("20"),
            )
            .arg(CommonArgs::output_format())
            .arg(CommonArgs::verbose())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        let many = |id: &str| -> Vec<String> {
            matches
                .get_many::<String>(id)
                .map(|values| values.cloned().collect())
                .unwrap_or_default()
        };

        Self {
            rule: matches.get_one::<String>("rule").cloned().unwrap_or_default(),
            start: matches.get_one::<String>("start").cloned().unwrap_or_default(),
            tz: matches.get_one("tz").cloned(),
            duration: matches.get_one("duration").cloned(),
            from: RangeArgs::get_from(matches),
            to: RangeArgs::get_to(matches),
            exdates: many("exdate"),
            rdates: many("rdate"),
            limit: matches.get_one("limit").copied().unwrap_or(DEFAULT_LIMIT),

            output_format: CommonArgs::get_output_format(matches),
            verbose: CommonArgs::get_verbose(matches),
        }
    }

    pub fn run(self) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "expanding rule...");
        self.write_to(&mut io::stdout())
    }

    pub fn write_to(&self, w: &mut impl io::Write) -> Result<(), Box<dyn Error>> {
        let config = ExpandConfig {
            timezones: self.tz.iter().cloned().collect(),
            max_occurrences: Some(self.limit),
            ..Default::default()
        };
        let expander = Expander::from_config(&config)?;
        let component = self.component()?;

        let zone = self
            .tz
            .as_deref()
            .and_then(|tz| expander.zones().get(tz))
            .unwrap_or(expander.zones().floating());
        let from = match &self.from {
            Some(from) => parse_instant(from, zone)?,
            None => Timestamp::MIN,
        };
        let to = match &self.to {
            Some(to) => Some(parse_instant(to, zone)?),
            // The limit bounds the work of rules that recur forever
            None if !component.is_bounded() => Some(Timestamp::MAX),
            None => None,
        };

        let mut occurrences = Vec::new();
        expander.for_each_occurrence(&component, from, to, |occurrence| {
            occurrences.push(occurrence);
            ControlFlow::Continue(())
        })?;

        if occurrences.len() >= self.limit && self.output_format == OutputFormat::Table {
            writeln!(w, "Displaying the first {} occurrences", self.limit)?;
        }
        let formatter =
            OccurrenceFormatter::new(self.verbose).with_output_format(self.output_format);
        writeln!(w, "{}", formatter.format(&occurrences))?;
        Ok(())
    }

    fn component(&self) -> Result<Component, Box<dyn Error>> {
        let tz = self.tz.as_deref();
        let rule: RecurrenceRule = self.rule.parse()?;
        let dtstart = parse_value(&self.start, tz)?;

        let mut component = Component::new("recur", ComponentKind::Event, dtstart).with_rrule(rule);
        if let Some(duration) = &self.duration {
            component = component.with_end(ComponentEnd::Duration(parse_duration(duration)?));
        }
        for exdate in &self.exdates {
            for value in DateTimeValue::parse_list(exdate, tz)? {
                component = component.with_exdate(value);
            }
        }
        for rdate in &self.rdates {
            for value in RDateValue::parse_list(rdate, tz)? {
                component = component.with_rdate(value);
            }
        }
        Ok(component)
    }
}
