// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, ffi::OsString, io, path::PathBuf, process::ExitCode};

use clap::{ArgMatches, Command, ValueHint, arg, builder::styling, crate_version, value_parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::cmd_calendar::CmdCalendar;
use crate::cmd_check::CmdCheck;
use crate::cmd_expand::CmdExpand;
use crate::cmd_generate_completion::CmdGenerateCompletion;

/// Run the recur command-line interface.
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let result = Cli::parse().and_then(Cli::run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}

/// Command-line interface
#[derive(Debug)]
pub struct Cli {
    /// Path to the configuration file
    pub config: Option<PathBuf>,

    /// The command to execute
    pub command: Commands,
}

impl Cli {
    pub const NAME: &str = "recur";

    /// Create the command-line interface
    pub fn command() -> Command {
        const STYLES: styling::Styles = styling::Styles::styled()
            .header(styling::AnsiColor::Green.on_default().bold())
            .usage(styling::AnsiColor::Green.on_default().bold())
            .literal(styling::AnsiColor::Blue.on_default().bold())
            .placeholder(styling::AnsiColor::Cyan.on_default());

        Command::new(Self::NAME)
            .about("Expand iCalendar recurrence rules into occurrences.")
            .author("Zexin Yuan <aim@yzx9.xyz>")
            .version(crate_version!())
            .styles(STYLES)
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                arg!(-c --config [CONFIG] "Path to the configuration file")
                    .long_help(
                        "\
Path to the configuration file. Defaults to $RECUR_CONFIG, then to \
$XDG_CONFIG_HOME/aim/recur.toml on Linux, ~/Library/Application Support/aim/recur.toml \
on MacOS and %APPDATA%/aim/recur.toml on Windows.",
                    )
                    .global(true)
                    .value_parser(value_parser!(PathBuf))
                    .value_hint(ValueHint::FilePath),
            )
            .subcommand(CmdCheck::command())
            .subcommand(CmdExpand::command())
            .subcommand(CmdCalendar::command())
            .subcommand(CmdGenerateCompletion::command())
    }

    /// Parse the command-line arguments
    pub fn parse() -> Result<Self, Box<dyn Error>> {
        let commands = Self::command();
        let matches = commands.get_matches();
        Self::from(&matches)
    }

    /// Parse the specified arguments
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, Box<dyn Error>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let commands = Self::command();
        let matches = commands.try_get_matches_from(args)?;
        Self::from(&matches)
    }

    /// Create a CLI instance from the `ArgMatches`
    pub fn from(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        use Commands::*;
        let command = match matches.subcommand() {
            Some((CmdCheck::NAME, matches)) => Check(CmdCheck::from(matches)),
            Some((CmdExpand::NAME, matches)) => Expand(CmdExpand::from(matches)),
            Some((CmdCalendar::NAME, matches)) => Calendar(CmdCalendar::from(matches)),
            Some((CmdGenerateCompletion::NAME, matches)) => {
                GenerateCompletion(CmdGenerateCompletion::from(matches))
            }
            Some((name, _)) => return Err(format!("Unknown command: {name}").into()),
            None => return Err("A command is required".into()),
        };

        let config = matches.get_one("config").cloned();
        Ok(Cli { config, command })
    }

    /// Run the command
    pub fn run(self) -> Result<(), Box<dyn Error>> {
        self.command.run(self.config)
    }
}

/// The commands available in the CLI
#[derive(Debug, Clone)]
pub enum Commands {
    /// Parse and validate rules
    Check(CmdCheck),

    /// Expand a single rule
    Expand(CmdExpand),

    /// Expand the components of the configuration
    Calendar(CmdCalendar),

    /// Generate shell completion
    GenerateCompletion(CmdGenerateCompletion),
}

impl Commands {
    /// Run the command with the given configuration
    pub fn run(self, config: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
        use Commands::*;
        match self {
            Check(a) => a.run(),
            Expand(a) => a.run(),
            Calendar(a) => a.run(config),
            GenerateCompletion(a) => a.run(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd_generate_completion::Shell;
    use crate::util::OutputFormat;

    #[test]
    fn test_parse_config() {
        let args = ["test", "-c", "/tmp/recur.toml", "check", "FREQ=DAILY"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/recur.toml")));
        assert!(matches!(cli.command, Commands::Check(_)));
    }

    #[test]
    fn test_parse_config_after_subcommand() {
        let args = [
            "test",
            "calendar",
            "--from",
            "2024-01-01",
            "--to",
            "2024-02-01",
            "--config",
            "/tmp/recur.toml",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/recur.toml")));
        assert!(matches!(cli.command, Commands::Calendar(_)));
    }

    #[test]
    fn test_parse_requires_command() {
        assert!(Cli::try_parse_from(["test"]).is_err());
    }

    #[test]
    fn test_parse_check() {
        let args = ["test", "check", "FREQ=DAILY", "--output-format", "json"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Check(cmd) => {
                assert_eq!(cmd.rules, ["FREQ=DAILY"]);
                assert_eq!(cmd.output_format, OutputFormat::Json);
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_parse_expand() {
        let args = ["test", "expand", "FREQ=DAILY", "--start", "20240101"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Expand(cmd) => {
                assert_eq!(cmd.rule, "FREQ=DAILY");
                assert_eq!(cmd.start, "20240101");
                assert_eq!(cmd.limit, 20);
            }
            _ => panic!("Expected Expand command"),
        }
    }

    #[test]
    fn test_parse_expand_requires_start() {
        assert!(Cli::try_parse_from(["test", "expand", "FREQ=DAILY"]).is_err());
    }

    #[test]
    fn test_parse_calendar_alias() {
        let args = ["test", "cal", "--from", "2024-01-01", "--to", "2024-02-01"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Commands::Calendar(_)));
    }

    #[test]
    fn test_parse_generate_completions() {
        let args = ["test", "generate-completion", "zsh"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::GenerateCompletion(cmd) => {
                assert_eq!(cmd.shell, Shell::Zsh);
            }
            _ => panic!("Expected GenerateCompletion command"),
        }
    }
}
