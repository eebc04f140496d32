// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use crate::datetime::{TimeZoneRule, TimeZoneTable};
use crate::error::TimeZoneError;

/// Expansion settings, usually the `[expand]` table of a TOML config file.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ExpandConfig {
    /// IANA zone that floating and date-only values are read in, UTC if unset.
    #[serde(default)]
    pub floating_timezone: Option<String>,

    /// IANA zones to load for resolving TZIDs.
    #[serde(default)]
    pub timezones: Vec<String>,

    /// Upper bound of occurrences a single query delivers.
    #[serde(default)]
    pub max_occurrences: Option<usize>,
}

impl ExpandConfig {
    /// Build the zone table the settings describe.
    ///
    /// ## Errors
    ///
    /// If a zone name is not in the time zone database.
    pub fn time_zones(&self) -> Result<TimeZoneTable, TimeZoneError> {
        let mut zones = TimeZoneTable::new();
        if let Some(name) = &self.floating_timezone {
            zones = zones.with_floating(TimeZoneRule::iana(name)?);
        }
        for name in &self.timezones {
            zones.load_iana(name)?;
        }
        Ok(zones)
    }
}
