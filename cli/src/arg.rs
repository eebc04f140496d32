// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use clap::{Arg, ArgMatches, arg, value_parser};

use crate::util::OutputFormat;

#[derive(Debug, Clone, Copy)]
pub struct CommonArgs;

impl CommonArgs {
    pub fn verbose() -> Arg {
        arg!(-v --verbose "Show more detailed information")
    }

    pub fn get_verbose(matches: &ArgMatches) -> bool {
        matches.get_flag("verbose")
    }

    pub fn output_format() -> Arg {
        arg!(--"output-format" <FORMAT> "Output format")
            .value_parser(value_parser!(OutputFormat))
            .default_value("table")
    }

    pub fn get_output_format(matches: &ArgMatches) -> OutputFormat {
        matches
            .get_one("output-format")
            .copied()
            .unwrap_or(OutputFormat::Table)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RangeArgs;

impl RangeArgs {
    pub fn from(required: bool) -> Arg {
        arg!(--from <FROM> "Start of the range, inclusive")
            .long_help(
                "\
Start of the range, inclusive. Accepts YYYY-MM-DD, YYYY-MM-DD HH:MM, iCalendar \
DATE or DATE-TIME values and RFC 3339 timestamps. Wall clocks are read in the \
floating time zone.",
            )
            .required(required)
    }

    pub fn get_from(matches: &ArgMatches) -> Option<String> {
        matches.get_one("from").cloned()
    }

    pub fn to(required: bool) -> Arg {
        arg!(--to <TO> "End of the range, exclusive").required(required)
    }

    pub fn get_to(matches: &ArgMatches) -> Option<String> {
        matches.get_one("to").cloned()
    }
}
