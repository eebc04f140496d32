// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, fs, path::PathBuf, str::FromStr, sync::Arc};

use aimcal_recur::{
    Component, ComponentEnd, ComponentKind, DateTimeValue, ExpandConfig, Expander, RDateValue,
    RecurrenceRule, parse_duration,
};

use crate::util::parse_value;

pub const APP_NAME: &str = "aim";

const RECUR_CONFIG_ENV: &str = "RECUR_CONFIG";

#[tracing::instrument]
pub fn parse_config(path: Option<PathBuf>) -> Result<Config, Box<dyn Error>> {
    let path = if let Some(path) = path {
        path
    } else if let Ok(env_path) = std::env::var(RECUR_CONFIG_ENV) {
        PathBuf::from(env_path)
    } else {
        let config = dirs::config_dir()
            .ok_or("User-specific config directory not found")?
            .join(format!("{APP_NAME}/recur.toml"));
        if !config.exists() {
            return Err(format!("No config found at: {}", config.display()).into());
        }
        config
    };

    fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read config file at {}: {}", path.display(), e))?
        .parse()
}

/// Configuration of the recur command.
#[derive(Debug, Default, Clone, serde::Deserialize)]
pub struct Config {
    /// Expansion settings
    #[serde(default)]
    pub expand: ExpandConfig,

    /// Components of the calendar command
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

impl FromStr for Config {
    type Err = Box<dyn Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

impl Config {
    /// An expander with the configured zones plus every zone a component
    /// names. Unknown component zones are left out and read as floating.
    pub fn expander(&self) -> Result<Expander, Box<dyn Error>> {
        let mut zones = self.expand.time_zones()?;
        let tz_ids = self.components.iter().flat_map(|c| {
            std::iter::once(c.tzid.as_deref()).chain(c.overrides.iter().map(|o| o.tzid.as_deref()))
        });
        for tz_id in tz_ids.flatten() {
            if let Err(err) = zones.load_iana(tz_id) {
                tracing::warn!(%tz_id, %err, "failed to load time zone");
            }
        }

        let expander = Expander::new(Arc::new(zones));
        Ok(match self.expand.max_occurrences {
            Some(max) => expander.with_max_occurrences(max),
            None => expander,
        })
    }

    /// Build every component, failures are returned next to the ones that built.
    pub fn components(&self) -> (Vec<Component>, Vec<(String, Box<dyn Error>)>) {
        let mut components = Vec::with_capacity(self.components.len());
        let mut errors = Vec::new();
        for c in &self.components {
            match c.build() {
                Ok(component) => components.push(component),
                Err(err) => errors.push((c.uid.clone(), err)),
            }
        }
        (components, errors)
    }
}

/// A component declared in the config file, values in iCalendar text.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ComponentConfig {
    pub uid: String,
    #[serde(default)]
    pub kind: ComponentKind,
    pub summary: Option<String>,
    pub dtstart: String,
    /// TZID of DTSTART, DTEND, EXDATE and RDATE
    pub tzid: Option<String>,
    pub dtend: Option<String>,
    pub duration: Option<String>,
    #[serde(default)]
    pub rrule: Vec<String>,
    #[serde(default)]
    pub exrule: Vec<String>,
    #[serde(default)]
    pub exdate: Vec<String>,
    #[serde(default)]
    pub rdate: Vec<String>,
    #[serde(default)]
    pub overrides: Vec<OverrideConfig>,
}

impl ComponentConfig {
    pub fn build(&self) -> Result<Component, Box<dyn Error>> {
        let tz = self.tzid.as_deref();
        let dtstart = parse_value(&self.dtstart, tz)?;
        let mut component = Component::new(&self.uid, self.kind, dtstart);
        component.summary.clone_from(&self.summary);
        component.end = parse_end(self.dtend.as_deref(), self.duration.as_deref(), tz)?;

        for rule in &self.rrule {
            component = component.with_rrule(parse_rule(rule)?);
        }
        for rule in &self.exrule {
            component = component.with_exrule(parse_rule(rule)?);
        }
        for exdate in &self.exdate {
            component.exceptions.exdates.extend(DateTimeValue::parse_list(exdate, tz)?);
        }
        for rdate in &self.rdate {
            component.exceptions.rdates.extend(RDateValue::parse_list(rdate, tz)?);
        }
        for o in &self.overrides {
            let recurrence_id = parse_value(&o.recurrence_id, tz)?;
            component = component.with_override(recurrence_id, o.build(self)?);
        }
        Ok(component)
    }
}

/// A replacement of one occurrence, as a RECURRENCE-ID instance would carry.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OverrideConfig {
    pub recurrence_id: String,
    pub dtstart: String,
    /// TZID of DTSTART and DTEND, the parent's if unset
    pub tzid: Option<String>,
    pub dtend: Option<String>,
    pub duration: Option<String>,
    pub summary: Option<String>,
}

impl OverrideConfig {
    fn build(&self, parent: &ComponentConfig) -> Result<Component, Box<dyn Error>> {
        let tz = self.tzid.as_deref().or(parent.tzid.as_deref());
        let dtstart = parse_value(&self.dtstart, tz)?;
        let mut component = Component::new(&parent.uid, parent.kind, dtstart);
        component.summary = self.summary.clone().or_else(|| parent.summary.clone());
        component.end = match (&self.dtend, &self.duration) {
            (None, None) => parse_end(parent.dtend.as_deref(), parent.duration.as_deref(), tz)?,
            (dtend, duration) => parse_end(dtend.as_deref(), duration.as_deref(), tz)?,
        };
        Ok(component)
    }
}

fn parse_rule(src: &str) -> Result<RecurrenceRule, Box<dyn Error>> {
    src.parse()
        .map_err(|e| format!("invalid recurrence rule '{src}': {e}").into())
}

fn parse_end(
    dtend: Option<&str>,
    duration: Option<&str>,
    tz: Option<&str>,
) -> Result<Option<ComponentEnd>, Box<dyn Error>> {
    match (dtend, duration) {
        (Some(_), Some(_)) => Err("dtend and duration are mutually exclusive".into()),
        (Some(dtend), None) => Ok(Some(ComponentEnd::DtEnd(parse_value(dtend, tz)?))),
        (None, Some(duration)) => Ok(Some(ComponentEnd::Duration(parse_duration(duration)?))),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::*;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    const CONFIG: &str = r#"
[expand]
floating_timezone = "Asia/Shanghai"
max_occurrences = 100

[[components]]
uid = "standup@example.com"
summary = "Standup"
dtstart = "20240101T090000"
tzid = "America/New_York"
duration = "PT15M"
rrule = ["FREQ=WEEKLY;BYDAY=MO,WE,FR"]
exdate = ["20240103T090000"]

[[components.overrides]]
recurrence_id = "20240105T090000"
dtstart = "20240105T100000"
summary = "Late standup"

[[components]]
uid = "review@example.com"
kind = "todo"
dtstart = "2024-01-01"
rrule = ["FREQ=MONTHLY;BYDAY=-1FR;COUNT=3"]
"#;

    #[test]
    fn test_parse_config() {
        let config: Config = CONFIG.parse().unwrap();
        assert_eq!(config.expand.max_occurrences, Some(100));
        assert_eq!(config.components.len(), 2);
        assert_eq!(config.components[1].kind, ComponentKind::Todo);

        let (components, errors) = config.components();
        assert!(errors.is_empty());
        assert_eq!(components[0].exceptions.exdates.len(), 1);
        assert_eq!(components[0].exceptions.overrides.len(), 1);
        let replacement = &components[0].exceptions.overrides[0].component;
        assert_eq!(replacement.summary.as_deref(), Some("Late standup"));
        assert!(matches!(replacement.end, Some(ComponentEnd::Duration(_))));
        assert!(matches!(components[1].dtstart, DateTimeValue::Date(_)));
    }

    #[test]
    fn test_bad_component_is_reported() {
        let config: Config = r#"
[[components]]
uid = "good"
dtstart = "20240101T090000Z"
rrule = ["FREQ=DAILY;COUNT=2"]

[[components]]
uid = "bad"
dtstart = "20240101T090000Z"
rrule = ["FREQ=DAILY;BYWEEKNO=1"]

[[components]]
uid = "both-ends"
dtstart = "20240101T090000Z"
dtend = "20240101T100000Z"
duration = "PT1H"
"#
        .parse()
        .unwrap();

        let (components, errors) = config.components();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].uid, "good");
        let uids: Vec<_> = errors.iter().map(|(uid, _)| uid.as_str()).collect();
        assert_eq!(uids, ["bad", "both-ends"]);
    }

    #[test]
    fn test_expander_loads_component_zones() {
        let config: Config = CONFIG.parse().unwrap();
        let expander = config.expander().unwrap();
        assert!(expander.zones().get("America/New_York").is_some());
        assert_eq!(expander.zones().floating().id(), "Asia/Shanghai");
    }

    #[test]
    fn test_missing_dtstart_is_an_error() {
        let err = "[[components]]\nuid = \"x\"\n".parse::<Config>().unwrap_err();
        assert!(err.to_string().contains("dtstart"), "{err}");
    }

    #[test]
    fn cli_flag_overrides_env_var() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[expand]\nmax_occurrences = 1\n").unwrap();
        let env_path = temp_dir.path().join("env_config.toml");
        fs::write(&env_path, "[expand]\nmax_occurrences = 2\n").unwrap();

        let _guard = env_lock().lock().unwrap();
        unsafe {
            std::env::set_var(RECUR_CONFIG_ENV, env_path.to_str().unwrap());
        }

        let config = parse_config(Some(config_path)).unwrap();
        assert_eq!(config.expand.max_occurrences, Some(1));

        unsafe {
            std::env::remove_var(RECUR_CONFIG_ENV);
        }
    }

    #[test]
    fn env_var_overrides_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let env_path = temp_dir.path().join("env_config.toml");
        fs::write(&env_path, "[expand]\nmax_occurrences = 2\n").unwrap();

        let _guard = env_lock().lock().unwrap();
        unsafe {
            std::env::set_var(RECUR_CONFIG_ENV, env_path.to_str().unwrap());
        }

        let config = parse_config(None).unwrap();
        assert_eq!(config.expand.max_occurrences, Some(2));

        unsafe {
            std::env::remove_var(RECUR_CONFIG_ENV);
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = parse_config(Some(temp_dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"), "{err}");
    }
}
