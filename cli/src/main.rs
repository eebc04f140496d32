// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! recur - expand iCalendar recurrence rules from the command line

use std::process::ExitCode;

fn main() -> ExitCode {
    aimcal_recur_cli::run()
}
