// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use parkops_domain::Holiday;
use time::macros::date;

use super::setup_site;
use crate::PersistenceError;

#[test]
fn test_create_and_get_holiday() {
    let (mut persistence, site) = setup_site();

    let holiday: Holiday = persistence
        .create_holiday(site.site_id, "Christmas", date!(2025 - 12 - 25), true)
        .unwrap();

    let loaded = persistence.get_holiday(holiday.holiday_id).unwrap().unwrap();
    assert_eq!(loaded.name, "Christmas");
    assert_eq!(loaded.date, date!(2025 - 12 - 25));
    assert!(loaded.is_recurring);
}

#[test]
fn test_identical_one_time_date_conflicts() {
    let (mut persistence, site) = setup_site();
    let first: Holiday = persistence
        .create_holiday(site.site_id, "Founders Day", date!(2025 - 05 - 02), false)
        .unwrap();

    let result =
        persistence.create_holiday(site.site_id, "Duplicate", date!(2025 - 05 - 02), false);
    match result {
        Err(PersistenceError::HolidayConflict(existing)) => {
            assert_eq!(existing.holiday_id, first.holiday_id);
        }
        other => panic!("Expected HolidayConflict, got {other:?}"),
    }
}

#[test]
fn test_one_time_holidays_in_different_years_coexist() {
    let (mut persistence, site) = setup_site();
    persistence
        .create_holiday(site.site_id, "Election 2025", date!(2025 - 11 - 04), false)
        .unwrap();
    persistence
        .create_holiday(site.site_id, "Election 2026", date!(2026 - 11 - 04), false)
        .unwrap();

    assert_eq!(persistence.list_holidays(site.site_id, None).unwrap().len(), 2);
}

#[test]
fn test_recurring_holiday_on_occupied_month_day_conflicts() {
    let (mut persistence, site) = setup_site();
    persistence
        .create_holiday(site.site_id, "Special", date!(2024 - 07 - 04), false)
        .unwrap();

    let result =
        persistence.create_holiday(site.site_id, "Independence", date!(2025 - 07 - 04), true);
    assert!(matches!(result, Err(PersistenceError::HolidayConflict(_))));
}

#[test]
fn test_one_time_holiday_on_recurring_day_conflicts() {
    let (mut persistence, site) = setup_site();
    let recurring: Holiday = persistence
        .create_holiday(site.site_id, "New Year", date!(2020 - 01 - 01), true)
        .unwrap();

    let result = persistence.create_holiday(site.site_id, "Party", date!(2031 - 01 - 01), false);
    match result {
        Err(PersistenceError::HolidayConflict(existing)) => {
            assert_eq!(existing.holiday_id, recurring.holiday_id);
        }
        other => panic!("Expected HolidayConflict, got {other:?}"),
    }
}

#[test]
fn test_holidays_are_scoped_per_site() {
    let (mut persistence, site) = setup_site();
    let other = persistence.create_site("North", "UTC", None).unwrap();
    persistence
        .create_holiday(site.site_id, "New Year", date!(2025 - 01 - 01), true)
        .unwrap();

    persistence
        .create_holiday(other.site_id, "New Year", date!(2025 - 01 - 01), true)
        .unwrap();
}

#[test]
fn test_holiday_for_missing_site_is_parent_not_found() {
    let (mut persistence, _site) = setup_site();

    let result = persistence.create_holiday(9999, "Ghost", date!(2025 - 03 - 03), false);
    assert!(matches!(
        result,
        Err(PersistenceError::ParentNotFound { entity: "site", id: 9999 })
    ));
}

#[test]
fn test_is_holiday_matches_exact_and_recurring_dates() {
    let (mut persistence, site) = setup_site();
    persistence
        .create_holiday(site.site_id, "New Year 2025", date!(2025 - 01 - 01), false)
        .unwrap();
    persistence
        .create_holiday(site.site_id, "Christmas", date!(2025 - 12 - 25), true)
        .unwrap();

    assert!(persistence.is_holiday(site.site_id, date!(2025 - 01 - 01)).unwrap());
    assert!(!persistence.is_holiday(site.site_id, date!(2026 - 01 - 01)).unwrap());
    assert!(persistence.is_holiday(site.site_id, date!(2030 - 12 - 25)).unwrap());
    assert!(!persistence.is_holiday(site.site_id, date!(2030 - 12 - 26)).unwrap());
}

#[test]
fn test_update_holiday_ignores_itself() {
    let (mut persistence, site) = setup_site();
    let holiday: Holiday = persistence
        .create_holiday(site.site_id, "Christmas", date!(2025 - 12 - 25), false)
        .unwrap();

    let updated: Holiday = persistence
        .update_holiday(holiday.holiday_id, "Christmas Day", date!(2025 - 12 - 25), true)
        .unwrap();

    assert_eq!(updated.name, "Christmas Day");
    assert!(updated.is_recurring);
}

#[test]
fn test_update_holiday_onto_taken_day_conflicts() {
    let (mut persistence, site) = setup_site();
    persistence
        .create_holiday(site.site_id, "Christmas", date!(2025 - 12 - 25), true)
        .unwrap();
    let boxing: Holiday = persistence
        .create_holiday(site.site_id, "Boxing Day", date!(2025 - 12 - 26), false)
        .unwrap();

    let result =
        persistence.update_holiday(boxing.holiday_id, "Moved", date!(2027 - 12 - 25), false);
    assert!(matches!(result, Err(PersistenceError::HolidayConflict(_))));

    let unchanged = persistence.get_holiday(boxing.holiday_id).unwrap().unwrap();
    assert_eq!(unchanged.date, date!(2025 - 12 - 26));
}

#[test]
fn test_update_missing_holiday_is_not_found() {
    let (mut persistence, _site) = setup_site();

    let result = persistence.update_holiday(42, "Nothing", date!(2025 - 02 - 02), false);
    assert!(matches!(
        result,
        Err(PersistenceError::NotFound { entity: "holiday", id: 42 })
    ));
}

#[test]
fn test_list_holidays_by_year_includes_recurring() {
    let (mut persistence, site) = setup_site();
    persistence
        .create_holiday(site.site_id, "Christmas", date!(2020 - 12 - 25), true)
        .unwrap();
    persistence
        .create_holiday(site.site_id, "Expo 2025", date!(2025 - 06 - 10), false)
        .unwrap();
    persistence
        .create_holiday(site.site_id, "Expo 2026", date!(2026 - 06 - 10), false)
        .unwrap();

    let in_2025: Vec<Holiday> = persistence.list_holidays(site.site_id, Some(2025)).unwrap();
    let names: Vec<&str> = in_2025.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["Expo 2025", "Christmas"]);
}

#[test]
fn test_delete_holiday_frees_the_day() {
    let (mut persistence, site) = setup_site();
    let holiday: Holiday = persistence
        .create_holiday(site.site_id, "Christmas", date!(2025 - 12 - 25), true)
        .unwrap();

    persistence.delete_holiday(holiday.holiday_id).unwrap();

    assert!(!persistence.is_holiday(site.site_id, date!(2025 - 12 - 25)).unwrap());
    persistence
        .create_holiday(site.site_id, "Christmas", date!(2025 - 12 - 25), false)
        .unwrap();
    assert!(matches!(
        persistence.delete_holiday(holiday.holiday_id),
        Err(PersistenceError::NotFound { entity: "holiday", .. })
    ));
}
