// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, io, ops::ControlFlow, path::PathBuf};

use clap::{ArgMatches, Command};
use colored::Colorize;

use crate::arg::{CommonArgs, RangeArgs};
use crate::config::{Config, parse_config};
use crate::occurrence_formatter::OccurrenceFormatter;
use crate::util::{OutputFormat, parse_instant};

#[derive(Debug, Clone)]
pub struct CmdCalendar {
    pub from: String,
    pub to: String,

    pub output_format: OutputFormat,
    pub verbose: bool,
}

impl CmdCalendar {
    pub const NAME: &str = "calendar";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("cal")
            .about("Expand every component of the configuration in a range")
            .arg(RangeArgs::from(true))
            .arg(RangeArgs::to(true))
            .arg(CommonArgs::output_format())
            .arg(CommonArgs::verbose())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            from: RangeArgs::get_from(matches).unwrap_or_default(),
            to: RangeArgs::get_to(matches).unwrap_or_default(),

            output_format: CommonArgs::get_output_format(matches),
            verbose: CommonArgs::get_verbose(matches),
        }
    }

    pub fn run(self, config: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "expanding calendar...");
        let config = parse_config(config)?;
        self.write_to(&config, &mut io::stdout(), &mut io::stderr())
    }

    /// Expand the configured components, components that fail are reported
    /// to `warn` and the others still expand.
    pub fn write_to(
        &self,
        config: &Config,
        w: &mut impl io::Write,
        warn: &mut impl io::Write,
    ) -> Result<(), Box<dyn Error>> {
        let expander = config.expander()?;
        let from = parse_instant(&self.from, expander.zones().floating())?;
        let to = parse_instant(&self.to, expander.zones().floating())?;

        let (components, errors) = config.components();
        for (uid, err) in &errors {
            writeln!(warn, "{} {uid}: {err}", "Skipped:".yellow())?;
        }

        let mut occurrences = Vec::new();
        let report = expander.for_each_in_batch(&components, from, Some(to), |occurrence| {
            occurrences.push(occurrence);
            ControlFlow::Continue(())
        });
        for (uid, err) in &report.errors {
            writeln!(warn, "{} {uid}: {err}", "Skipped:".yellow())?;
        }
        tracing::debug!(
            expanded = report.expanded,
            occurrences = report.occurrences,
            "calendar expanded"
        );

        occurrences.sort_by(|a, b| {
            a.start
                .timestamp()
                .cmp(&b.start.timestamp())
                .then_with(|| a.component.uid.cmp(&b.component.uid))
        });
        let formatter =
            OccurrenceFormatter::new(self.verbose).with_output_format(self.output_format);
        writeln!(w, "{}", formatter.format(&occurrences))?;
        Ok(())
    }
}
