// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Command-line front end of `aimcal-recur`: check rules, expand a single rule, or
//! expand every component declared in a TOML configuration.

mod arg;
mod cli;
mod cmd_calendar;
mod cmd_check;
mod cmd_expand;
mod cmd_generate_completion;
mod config;
mod occurrence_formatter;
mod table;
mod util;

pub use crate::cli::{Cli, Commands, run};
pub use crate::config::{ComponentConfig, Config, OverrideConfig};
