// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Calendar and timestamp helpers.
//!
//! Dates are exchanged as `YYYY-MM-DD`. Timestamps are normalized to UTC with
//! second precision and rendered as `YYYY-MM-DDTHH:MM:SSZ`, so stored values
//! sort lexicographically in the same order as chronologically.
//!
//! A site's "today" depends on its IANA timezone; conversion goes through
//! `chrono-tz` and is converted back into `time` types at the boundary.

use crate::error::DomainError;
use chrono::{Datelike, NaiveDate, TimeZone};
use chrono_tz::Tz;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, UtcOffset};

/// Parses a `YYYY-MM-DD` calendar date.
///
/// # Errors
///
/// Returns `DomainError::DateParseError` if the string is not a valid date.
pub fn parse_date(value: &str) -> Result<Date, DomainError> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).map_err(|e| {
        DomainError::DateParseError {
            date_string: value.to_string(),
            error: e.to_string(),
        }
    })
}

/// Formats a calendar date as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Parses an RFC 3339 timestamp and normalizes it to UTC, second precision.
///
/// # Errors
///
/// Returns `DomainError::TimestampError` if the value is not RFC 3339.
pub fn parse_timestamp(value: &str) -> Result<OffsetDateTime, DomainError> {
    let parsed: OffsetDateTime =
        OffsetDateTime::parse(value.trim(), &Rfc3339).map_err(|e| DomainError::TimestampError {
            value: value.to_string(),
            error: e.to_string(),
        })?;
    truncate_to_utc_seconds(parsed)
}

/// Formats a timestamp as `YYYY-MM-DDTHH:MM:SSZ` in UTC.
///
/// # Errors
///
/// Returns `DomainError::TimestampError` if the year cannot be rendered in
/// four digits.
pub fn format_timestamp(value: OffsetDateTime) -> Result<String, DomainError> {
    value
        .to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
        ))
        .map_err(|e| DomainError::TimestampError {
            value: value.to_string(),
            error: e.to_string(),
        })
}

fn truncate_to_utc_seconds(value: OffsetDateTime) -> Result<OffsetDateTime, DomainError> {
    value
        .to_offset(UtcOffset::UTC)
        .replace_nanosecond(0)
        .map_err(|e| DomainError::TimestampError {
            value: value.to_string(),
            error: e.to_string(),
        })
}

/// Checks that a timezone is a known IANA identifier.
///
/// # Errors
///
/// Returns `DomainError::InvalidTimezone` for unknown identifiers.
pub fn validate_timezone(timezone: &str) -> Result<(), DomainError> {
    parse_tz(timezone).map(|_| ())
}

fn parse_tz(timezone: &str) -> Result<Tz, DomainError> {
    timezone
        .parse::<Tz>()
        .map_err(|_| DomainError::InvalidTimezone(timezone.to_string()))
}

/// Returns the calendar date at `instant` in the given timezone.
///
/// # Errors
///
/// Returns an error if the timezone is unknown or the instant is out of range.
pub fn local_date(timezone: &str, instant: OffsetDateTime) -> Result<Date, DomainError> {
    let tz: Tz = parse_tz(timezone)?;
    let utc = chrono::DateTime::from_timestamp(instant.unix_timestamp(), 0).ok_or_else(|| {
        DomainError::TimestampError {
            value: instant.to_string(),
            error: String::from("out of range"),
        }
    })?;
    naive_to_date(utc.with_timezone(&tz).date_naive())
}

/// Returns the first instant of `date` in the given timezone, in UTC.
///
/// When local midnight does not exist (a DST gap), the earliest valid local
/// time on that date is used.
///
/// # Errors
///
/// Returns an error if the timezone is unknown or the date cannot be resolved.
pub fn local_day_start(timezone: &str, date: Date) -> Result<OffsetDateTime, DomainError> {
    let tz: Tz = parse_tz(timezone)?;
    let naive: NaiveDate = NaiveDate::from_ymd_opt(
        date.year(),
        u32::from(u8::from(date.month())),
        u32::from(date.day()),
    )
    .ok_or_else(|| DomainError::DateParseError {
        date_string: format_date(date),
        error: String::from("not representable"),
    })?;

    let resolved = (0..24)
        .filter_map(|hour| naive.and_hms_opt(hour, 0, 0))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .ok_or_else(|| DomainError::TimestampError {
            value: format_date(date),
            error: format!("no valid local time in {timezone}"),
        })?;

    OffsetDateTime::from_unix_timestamp(resolved.timestamp()).map_err(|e| {
        DomainError::TimestampError {
            value: format_date(date),
            error: e.to_string(),
        }
    })
}

fn naive_to_date(date: NaiveDate) -> Result<Date, DomainError> {
    let invalid = || DomainError::DateParseError {
        date_string: date.to_string(),
        error: String::from("not representable"),
    };
    let month: Month = u8::try_from(date.month())
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(invalid)?;
    let day: u8 = u8::try_from(date.day()).map_err(|_| invalid())?;
    Date::from_calendar_date(date.year(), month, day).map_err(|_| invalid())
}
