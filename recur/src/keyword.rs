// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Keywords of the iCalendar recurrence grammar (RFC 5545 Section 3.3.10).

pub const KW_RRULE_FREQ: &str = "FREQ";
pub const KW_RRULE_FREQ_SECONDLY: &str = "SECONDLY";
pub const KW_RRULE_FREQ_MINUTELY: &str = "MINUTELY";
pub const KW_RRULE_FREQ_HOURLY: &str = "HOURLY";
pub const KW_RRULE_FREQ_DAILY: &str = "DAILY";
pub const KW_RRULE_FREQ_WEEKLY: &str = "WEEKLY";
pub const KW_RRULE_FREQ_MONTHLY: &str = "MONTHLY";
pub const KW_RRULE_FREQ_YEARLY: &str = "YEARLY";
pub const KW_RRULE_UNTIL: &str = "UNTIL";
pub const KW_RRULE_COUNT: &str = "COUNT";
pub const KW_RRULE_INTERVAL: &str = "INTERVAL";
pub const KW_RRULE_BYSECOND: &str = "BYSECOND";
pub const KW_RRULE_BYMINUTE: &str = "BYMINUTE";
pub const KW_RRULE_BYHOUR: &str = "BYHOUR";
pub const KW_RRULE_BYDAY: &str = "BYDAY";
pub const KW_RRULE_BYMONTHDAY: &str = "BYMONTHDAY";
pub const KW_RRULE_BYYEARDAY: &str = "BYYEARDAY";
pub const KW_RRULE_BYWEEKNO: &str = "BYWEEKNO";
pub const KW_RRULE_BYMONTH: &str = "BYMONTH";
pub const KW_RRULE_BYSETPOS: &str = "BYSETPOS";
pub const KW_RRULE_WKST: &str = "WKST";

pub const KW_DAY_SU: &str = "SU";
pub const KW_DAY_MO: &str = "MO";
pub const KW_DAY_TU: &str = "TU";
pub const KW_DAY_WE: &str = "WE";
pub const KW_DAY_TH: &str = "TH";
pub const KW_DAY_FR: &str = "FR";
pub const KW_DAY_SA: &str = "SA";
