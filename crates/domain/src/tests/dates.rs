// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{
    DomainError, format_date, format_timestamp, local_date, local_day_start, parse_date,
    parse_timestamp, validate_timezone,
};
use time::macros::{date, datetime};

#[test]
fn test_parse_and_format_date() {
    let parsed = parse_date("2025-12-25").unwrap();
    assert_eq!(parsed, date!(2025 - 12 - 25));
    assert_eq!(format_date(parsed), "2025-12-25");
}

#[test]
fn test_parse_date_rejects_garbage() {
    assert!(matches!(
        parse_date("25/12/2025"),
        Err(DomainError::DateParseError { .. })
    ));
}

#[test]
fn test_timestamp_normalized_to_utc_seconds() {
    let parsed = parse_timestamp("2025-03-01T09:30:15.250+09:00").unwrap();
    assert_eq!(format_timestamp(parsed).unwrap(), "2025-03-01T00:30:15Z");
}

#[test]
fn test_local_date_crosses_midnight() {
    // 16:00 UTC is already the next day in Seoul.
    let instant = datetime!(2025-02-14 16:00 UTC);
    assert_eq!(
        local_date("Asia/Seoul", instant).unwrap(),
        date!(2025 - 02 - 15)
    );
    assert_eq!(local_date("UTC", instant).unwrap(), date!(2025 - 02 - 14));
}

#[test]
fn test_local_day_start() {
    let start = local_day_start("Asia/Seoul", date!(2025 - 02 - 15)).unwrap();
    assert_eq!(format_timestamp(start).unwrap(), "2025-02-14T15:00:00Z");
}

#[test]
fn test_unknown_timezone() {
    assert_eq!(
        validate_timezone("Mars/Olympus"),
        Err(DomainError::InvalidTimezone(String::from("Mars/Olympus")))
    );
}
