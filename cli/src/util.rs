// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use aimcal_recur::{DateTimeValue, Instance, TimeZoneRule};
use jiff::Timestamp;
use jiff::civil::{Date, DateTime};
use jiff::tz::TimeZone;

/// The output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

const INVALID_FORMAT: &str = "Invalid date format. Expected format: YYYY-MM-DD, YYYY-MM-DD HH:MM, \
     YYYYMMDD, YYYYMMDDTHHMMSS[Z] or an RFC 3339 timestamp";

/// Parses a point in time given on the command line. Wall clocks are read in `zone`.
pub fn parse_instant(s: &str, zone: &TimeZoneRule) -> Result<Timestamp, Box<dyn Error>> {
    if let Ok(t) = s.parse::<Timestamp>() {
        return Ok(t);
    }

    match parse_value(s, None)? {
        DateTimeValue::Utc(dt) => Ok(dt.to_zoned(TimeZone::UTC)?.timestamp()),
        value => Ok(zone.to_timestamp(value.datetime())?),
    }
}

/// Parses a DTSTART-like value, either in iCalendar text or in ISO 8601.
///
/// `tz_id` applies to wall clocks only, as the TZID parameter does.
pub fn parse_value(s: &str, tz_id: Option<&str>) -> Result<DateTimeValue, Box<dyn Error>> {
    if let Ok(value) = DateTimeValue::parse(s, tz_id) {
        return Ok(value);
    }

    let value = if let Ok(t) = s.parse::<Timestamp>() {
        DateTimeValue::Utc(t.to_zoned(TimeZone::UTC).datetime())
    } else if let Ok(date) = s.parse::<Date>()
        && !s.contains(['T', 't', ' '])
    {
        DateTimeValue::Date(date)
    } else if let Ok(dt) = s.parse::<DateTime>() {
        match tz_id {
            Some(tz_id) => DateTimeValue::Zoned {
                datetime: dt,
                tz_id: tz_id.to_string(),
            },
            None => DateTimeValue::Floating(dt),
        }
    } else {
        return Err(INVALID_FORMAT.into());
    };
    Ok(value)
}

pub fn format_instance(t: &Instance) -> String {
    if t.is_all_day() {
        t.date().strftime("%Y-%m-%d").to_string()
    } else {
        t.datetime().strftime("%Y-%m-%d %H:%M").to_string()
    }
}

/// Formats the time range of an occurrence, the end being exclusive.
pub fn format_range(start: &Instance, end: &Instance) -> String {
    if start.is_all_day() {
        let single_day = start.date().tomorrow().is_ok_and(|next| end.date() <= next);
        return if single_day {
            format_instance(start)
        } else {
            format!("{}~{}", format_instance(start), format_instance(end))
        };
    }

    if start == end {
        format_instance(start)
    } else if start.date() == end.date() {
        format!(
            "{}~{}",
            format_instance(start),
            end.datetime().strftime("%H:%M")
        )
    } else {
        format!("{}~{}", format_instance(start), format_instance(end))
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, datetime};

    use super::*;

    #[test]
    fn test_parse_instant() {
        let utc = TimeZoneRule::utc();
        let expected: Timestamp = "2024-01-01T09:00:00Z".parse().unwrap();
        for s in [
            "2024-01-01T09:00:00Z",
            "20240101T090000Z",
            "20240101T090000",
            "2024-01-01 09:00",
            "2024-01-01T09:00",
        ] {
            assert_eq!(parse_instant(s, &utc).unwrap(), expected, "{s}");
        }

        let midnight: Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();
        assert_eq!(parse_instant("2024-01-01", &utc).unwrap(), midnight);
        assert_eq!(parse_instant("20240101", &utc).unwrap(), midnight);
    }

    #[test]
    fn test_parse_instant_in_zone() {
        let tokyo = TimeZoneRule::iana("Asia/Tokyo").unwrap();
        let got = parse_instant("2024-01-01 09:00", &tokyo).unwrap();
        assert_eq!(got, "2024-01-01T00:00:00Z".parse().unwrap());

        // Explicit instants ignore the zone
        let got = parse_instant("20240101T090000Z", &tokyo).unwrap();
        assert_eq!(got, "2024-01-01T09:00:00Z".parse().unwrap());
    }

    #[test]
    fn test_parse_instant_invalid() {
        let utc = TimeZoneRule::utc();
        for s in ["", "tomorrow", "2024-13-01", "09:00"] {
            assert!(parse_instant(s, &utc).is_err(), "{s}");
        }
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(
            parse_value("2024-03-01", None).unwrap(),
            DateTimeValue::Date(date(2024, 3, 1))
        );
        assert_eq!(
            parse_value("2024-03-01 10:30", Some("Europe/Berlin")).unwrap(),
            DateTimeValue::Zoned {
                datetime: datetime(2024, 3, 1, 10, 30, 0, 0),
                tz_id: "Europe/Berlin".to_string(),
            }
        );
        assert_eq!(
            parse_value("20240301T103000", None).unwrap(),
            DateTimeValue::Floating(datetime(2024, 3, 1, 10, 30, 0, 0))
        );
        assert_eq!(
            parse_value("2024-03-01T10:30:00Z", Some("Europe/Berlin")).unwrap(),
            DateTimeValue::Utc(datetime(2024, 3, 1, 10, 30, 0, 0))
        );
    }
}
