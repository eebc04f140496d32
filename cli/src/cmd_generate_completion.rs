// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    error::Error,
    io,
    path::{Path, PathBuf},
};

use clap::{ArgMatches, Command, ValueEnum, ValueHint, arg, value_parser};
use clap_complete::{Shell as ClapShell, generate, generate_to};
use clap_complete_nushell::Nushell;

use crate::Cli;

/// Print the completion script, or write it into a directory.
#[derive(Debug, Clone)]
pub struct CmdGenerateCompletion {
    pub shell: Shell,
    pub dir: Option<PathBuf>,
}

impl CmdGenerateCompletion {
    pub const NAME: &str = "generate-completion";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Generate shell completion for the specified shell")
            .hide(true)
            .arg(
                arg!(shell: <SHELL> "The shell generator to use")
                    .value_parser(value_parser!(Shell)),
            )
            .arg(
                arg!(--dir <DIR> "Write the script into this directory instead of stdout")
                    .value_parser(value_parser!(PathBuf))
                    .value_hint(ValueHint::DirPath),
            )
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            // required argument, clap rejects the command without it
            shell: matches.get_one("shell").copied().unwrap_or(Shell::Bash),
            dir: matches.get_one("dir").cloned(),
        }
    }

    pub fn run(self) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "generating shell completion...");
        match &self.dir {
            Some(dir) => {
                let path = self.shell.generate_to(dir)?;
                println!("Completion script written to {}", path.display());
            }
            None => self.shell.generate(&mut io::stdout()),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Elvish,
    Fish,
    Nushell,
    #[value(name = "powershell")]
    #[allow(clippy::enum_variant_names)]
    PowerShell,
    Zsh,
}

impl Shell {
    fn clap_shell(self) -> Option<ClapShell> {
        match self {
            Shell::Bash => Some(ClapShell::Bash),
            Shell::Elvish => Some(ClapShell::Elvish),
            Shell::Fish => Some(ClapShell::Fish),
            Shell::PowerShell => Some(ClapShell::PowerShell),
            Shell::Zsh => Some(ClapShell::Zsh),
            Shell::Nushell => None,
        }
    }

    /// Write the script of this shell to `buf`.
    pub fn generate(self, buf: &mut impl io::Write) {
        let mut cmd = Cli::command();
        match self.clap_shell() {
            Some(shell) => generate(shell, &mut cmd, Cli::NAME, buf),
            None => generate(Nushell, &mut cmd, Cli::NAME, buf),
        }
    }

    /// Write the script into `dir` under the file name the shell expects.
    pub fn generate_to(self, dir: &Path) -> io::Result<PathBuf> {
        let mut cmd = Cli::command();
        match self.clap_shell() {
            Some(shell) => generate_to(shell, &mut cmd, Cli::NAME, dir),
            None => generate_to(Nushell, &mut cmd, Cli::NAME, dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_parse_generate_completion() {
        let cmd = Command::new("test").subcommand(CmdGenerateCompletion::command());
        let matches = cmd
            .try_get_matches_from(["test", "generate-completion", "bash"])
            .unwrap();
        let sub_matches = matches.subcommand_matches(CmdGenerateCompletion::NAME).unwrap();
        let parsed = CmdGenerateCompletion::from(sub_matches);
        assert_eq!(parsed.shell, Shell::Bash);
        assert_eq!(parsed.dir, None);
    }

    #[test]
    fn test_script_lists_subcommands() {
        let mut output = vec![];
        Shell::Bash.generate(&mut output);
        let script = String::from_utf8(output).unwrap();
        for subcommand in ["check", "expand", "calendar"] {
            assert!(script.contains(subcommand), "{subcommand}");
        }
    }

    #[test]
    fn test_generate_into_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = Shell::Fish.generate_to(temp_dir.path()).unwrap();
        assert_eq!(path, temp_dir.path().join("recur.fish"));
        assert!(std::fs::read_to_string(path).unwrap().contains("expand"));
    }

    #[test]
    fn test_parse_shell_variants() {
        for (name, expected) in [
            ("bash", Shell::Bash),
            ("elvish", Shell::Elvish),
            ("fish", Shell::Fish),
            ("nushell", Shell::Nushell),
            ("powershell", Shell::PowerShell),
            ("zsh", Shell::Zsh),
        ] {
            let matches = Cli::command()
                .try_get_matches_from(["recur", "generate-completion", name])
                .unwrap_or_else(|e| panic!("Failed to parse for shell '{name}': {e}"));
            let sub_matches = matches.subcommand_matches(CmdGenerateCompletion::NAME).unwrap();
            assert_eq!(CmdGenerateCompletion::from(sub_matches).shell, expected);
        }
    }
}
