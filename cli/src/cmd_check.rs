// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, io};

use aimcal_recur::{ParseError, RecurrenceRule, parse_rrule};
use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use clap::{ArgMatches, Command, arg};
use colored::Colorize;

use crate::arg::CommonArgs;
use crate::util::OutputFormat;

#[derive(Debug, Clone)]
pub struct CmdCheck {
    pub rules: Vec<String>,
    pub output_format: OutputFormat,
}

impl CmdCheck {
    pub const NAME: &str = "check";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Parse and validate recurrence rules, printing their canonical form")
            .arg(arg!(rules: <RULE> "RRULE values, e.g. FREQ=WEEKLY;BYDAY=MO").num_args(1..))
            .arg(CommonArgs::output_format())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            rules: matches
                .get_many::<String>("rules")
                .map(|rules| rules.cloned().collect())
                .unwrap_or_default(),
            output_format: CommonArgs::get_output_format(matches),
        }
    }

    pub fn run(self) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "checking rules...");
        self.write_to(&mut io::stdout())
    }

    /// Check every rule and write the outcome, a bad rule does not stop the others.
    pub fn write_to(&self, w: &mut impl io::Write) -> Result<(), Box<dyn Error>> {
        let checked: Vec<_> = self.rules.iter().map(|src| (src, parse_rrule(src))).collect();

        match self.output_format {
            OutputFormat::Json => {
                let values: Vec<_> = checked
                    .iter()
                    .map(|(src, result)| match result {
                        Ok(rule) => serde_json::json!({
                            "rule": src,
                            "valid": true,
                            "canonical": rule.to_string(),
                        }),
                        Err(err) => serde_json::json!({
                            "rule": src,
                            "valid": false,
                            "error": err.to_string(),
                            "span": err.span().map(|span| [span.start, span.end]),
                        }),
                    })
                    .collect();
                writeln!(w, "{}", serde_json::to_string_pretty(&values)?)?;
            }
            OutputFormat::Table => {
                for (src, result) in &checked {
                    match result {
                        Ok(rule) => write_valid(w, rule)?,
                        Err(err) => write_invalid(w, src, err)?,
                    }
                }
            }
        }

        let invalid = checked.iter().filter(|(_, result)| result.is_err()).count();
        match invalid {
            0 => Ok(()),
            n => Err(format!("{n} of {} rules are invalid", checked.len()).into()),
        }
    }
}

fn write_valid(w: &mut impl io::Write, rule: &RecurrenceRule) -> io::Result<()> {
    writeln!(w, "{} {}", "✓".green(), rule)
}

fn write_invalid(w: &mut impl io::Write, src: &str, err: &ParseError) -> io::Result<()> {
    writeln!(w, "{} {}", "✗".red(), src)?;
    let span = err.span().unwrap_or(0..src.len());
    Report::build(ReportKind::Error, span.clone())
        .with_config(
            Config::new()
                .with_index_type(IndexType::Byte)
                .with_color(false),
        )
        .with_message(err.to_string())
        .with_label(Label::new(span).with_color(Color::Red))
        .finish()
        .write(Source::from(src), &mut *w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(rules: &[&str], output_format: OutputFormat) -> (String, bool) {
        let cmd = CmdCheck {
            rules: rules.iter().map(ToString::to_string).collect(),
            output_format,
        };
        let mut out = Vec::new();
        let ok = cmd.write_to(&mut out).is_ok();
        (String::from_utf8(out).unwrap(), ok)
    }

    #[test]
    fn test_parse_check() {
        let cmd = Command::new("test").subcommand(CmdCheck::command());
        let matches = cmd
            .try_get_matches_from(["test", "check", "FREQ=DAILY", "FREQ=WEEKLY"])
            .unwrap();
        let sub_matches = matches.subcommand_matches("check").unwrap();
        let parsed = CmdCheck::from(sub_matches);
        assert_eq!(parsed.rules, ["FREQ=DAILY", "FREQ=WEEKLY"]);
        assert_eq!(parsed.output_format, OutputFormat::Table);
    }

    #[test]
    fn test_check_prints_canonical_form() {
        let (out, ok) = check(&["byday=mo,we;freq=weekly"], OutputFormat::Table);
        assert!(ok);
        assert!(out.contains("FREQ=WEEKLY;BYDAY=MO,WE"), "{out}");
    }

    #[test]
    fn test_check_continues_after_bad_rule() {
        let (out, ok) = check(
            &["FREQ=DAILY;COUNT=0", "FREQ=MONTHLY;BYMONTHDAY=-1"],
            OutputFormat::Table,
        );
        assert!(!ok);
        assert!(out.contains("FREQ=DAILY;COUNT=0"), "{out}");
        assert!(out.contains("FREQ=MONTHLY;BYMONTHDAY=-1"), "{out}");
    }

    #[test]
    fn test_check_json() {
        let (out, ok) = check(
            &["FREQ=YEARLY", "FREQ=DAILY;COUNT=1;COUNT=2"],
            OutputFormat::Json,
        );
        assert!(!ok);

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["valid"], true);
        assert_eq!(value[0]["canonical"], "FREQ=YEARLY");
        assert_eq!(value[1]["valid"], false);
        assert_eq!(value[1]["span"], serde_json::json!([19, 26]));
    }
}
