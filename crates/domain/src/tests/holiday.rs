// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{Holiday, find_conflicting_holiday, holiday_matches, is_holiday, month_day_key};
use time::Date;
use time::macros::date;

fn holiday(id: i64, date: Date, is_recurring: bool) -> Holiday {
    Holiday {
        holiday_id: id,
        site_id: 1,
        name: format!("Holiday {id}"),
        date,
        is_recurring,
    }
}

#[test]
fn test_month_day_key() {
    assert_eq!(month_day_key(date!(2025 - 01 - 09)), "01-09");
    assert_eq!(month_day_key(date!(2030 - 12 - 25)), "12-25");
}

#[test]
fn test_recurring_candidate_conflicts_with_one_time_holiday() {
    let existing = vec![holiday(1, date!(2025 - 12 - 25), false)];
    let conflict = find_conflicting_holiday(date!(2027 - 12 - 25), true, &existing);
    assert_eq!(conflict.map(|h| h.holiday_id), Some(1));
}

#[test]
fn test_recurring_candidate_conflicts_with_recurring_holiday() {
    let existing = vec![holiday(1, date!(2020 - 12 - 25), true)];
    let conflict = find_conflicting_holiday(date!(2025 - 12 - 25), true, &existing);
    assert_eq!(conflict.map(|h| h.holiday_id), Some(1));
}

#[test]
fn test_one_time_candidate_conflicts_with_recurring_holiday() {
    let existing = vec![holiday(7, date!(2020 - 12 - 25), true)];
    let conflict = find_conflicting_holiday(date!(2026 - 12 - 25), false, &existing);
    assert_eq!(conflict.map(|h| h.holiday_id), Some(7));
}

#[test]
fn test_one_time_holidays_in_different_years_coexist() {
    let existing = vec![holiday(1, date!(2025 - 05 - 05), false)];
    assert!(find_conflicting_holiday(date!(2026 - 05 - 05), false, &existing).is_none());
}

#[test]
fn test_one_time_candidate_conflicts_with_identical_date() {
    let existing = vec![holiday(3, date!(2025 - 05 - 05), false)];
    let conflict = find_conflicting_holiday(date!(2025 - 05 - 05), false, &existing);
    assert_eq!(conflict.map(|h| h.holiday_id), Some(3));
}

#[test]
fn test_other_month_days_are_ignored() {
    let existing = vec![
        holiday(1, date!(2025 - 12 - 24), true),
        holiday(2, date!(2025 - 12 - 26), false),
    ];
    assert!(find_conflicting_holiday(date!(2025 - 12 - 25), true, &existing).is_none());
}

#[test]
fn test_holiday_matches() {
    let one_time = holiday(1, date!(2025 - 01 - 01), false);
    let recurring = holiday(2, date!(2000 - 12 - 25), true);

    assert!(holiday_matches(&one_time, date!(2025 - 01 - 01)));
    assert!(!holiday_matches(&one_time, date!(2026 - 01 - 01)));
    assert!(holiday_matches(&recurring, date!(2030 - 12 - 25)));
    assert!(!holiday_matches(&recurring, date!(2030 - 12 - 24)));
}

#[test]
fn test_is_holiday_example_calendar() {
    let calendar = vec![
        holiday(1, date!(2025 - 01 - 01), false),
        holiday(2, date!(2025 - 12 - 25), true),
    ];

    assert!(!is_holiday(&calendar, date!(2026 - 01 - 01)));
    assert!(is_holiday(&calendar, date!(2030 - 12 - 25)));
    assert!(is_holiday(&calendar, date!(2025 - 01 - 01)));
}

#[test]
fn test_leap_day_recurring() {
    let calendar = vec![holiday(1, date!(2024 - 02 - 29), true)];
    assert!(is_holiday(&calendar, date!(2028 - 02 - 29)));
    assert!(!is_holiday(&calendar, date!(2025 - 02 - 28)));
}
