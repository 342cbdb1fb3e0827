// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use parkops_persistence::Persistence;
use serde_json::json;
use time::macros::datetime;

use super::helpers::{create_test_site, setup_site, test_now};
use crate::{
    ApiError, CarNumberQuery, CreatePaymentRequest, CreatePolicyRequest,
    EffectiveMembershipQuery, HolidayInfo, HolidayRequest, IsHolidayQuery, ListHolidaysQuery,
    MemberInfo, MemberRequest, PageQuery, PaymentInfo, SiteInfo, cancel_payment, create_holiday,
    create_member, create_payment, create_policy, delete_member, effective_membership,
    find_member_by_car_number, get_member, is_holiday, list_holidays, list_members,
    list_payments, update_holiday,
};

fn holiday_request(name: &str, date: &str, is_recurring: bool) -> HolidayRequest {
    HolidayRequest {
        name: name.to_string(),
        date: date.to_string(),
        is_recurring,
    }
}

fn member(persistence: &mut Persistence, site_id: i64, name: &str, plate: &str) -> MemberInfo {
    create_member(
        persistence,
        site_id,
        &MemberRequest {
            name: name.to_string(),
            car_number: plate.to_string(),
            phone: None,
        },
    )
    .unwrap()
}

fn membership_policy(persistence: &mut Persistence, site_id: i64) -> i64 {
    create_policy(
        persistence,
        site_id,
        &CreatePolicyRequest {
            policy_type: String::from("MEMBERSHIP"),
            name: String::from("Monthly"),
            code: None,
            config: json!({ "period_days": 30, "fee": 90000 }),
            is_system: false,
        },
    )
    .unwrap()
    .policy_id
}

fn payment_request(policy_id: i64, start: &str, end: &str) -> CreatePaymentRequest {
    CreatePaymentRequest {
        policy_id,
        amount: 90000,
        start_date: start.to_string(),
        end_date: end.to_string(),
        paid_at: None,
    }
}

// ============================================================================
// Holidays
// ============================================================================

#[test]
fn test_recurring_holiday_matches_every_year() {
    let (mut persistence, site) = setup_site();
    create_holiday(
        &mut persistence,
        site.site_id,
        &holiday_request("Independence Movement Day", "2020-03-01", true),
    )
    .unwrap();

    let response = is_holiday(
        &mut persistence,
        site.site_id,
        &IsHolidayQuery {
            date: Some(String::from("2031-03-01")),
        },
        test_now(),
    )
    .unwrap();
    assert!(response.is_holiday);
    assert_eq!(response.date, "2031-03-01");
}

#[test]
fn test_is_holiday_defaults_to_site_local_today() {
    let mut persistence: Persistence = super::helpers::setup();
    let seoul: SiteInfo = create_test_site(&mut persistence, "Gangnam", "Asia/Seoul");
    create_holiday(
        &mut persistence,
        seoul.site_id,
        &holiday_request("Samiljeol", "2025-03-01", false),
    )
    .unwrap();

    // 20:00 UTC on Feb 28 is already Mar 1 in Seoul.
    let response = is_holiday(
        &mut persistence,
        seoul.site_id,
        &IsHolidayQuery::default(),
        datetime!(2025-02-28 20:00 UTC),
    )
    .unwrap();
    assert_eq!(response.date, "2025-03-01");
    assert!(response.is_holiday);
}

#[test]
fn test_one_time_holidays_in_different_years_coexist() {
    let (mut persistence, site) = setup_site();
    create_holiday(
        &mut persistence,
        site.site_id,
        &holiday_request("Election", "2024-04-10", false),
    )
    .unwrap();

    let second: HolidayInfo = create_holiday(
        &mut persistence,
        site.site_id,
        &holiday_request("Election", "2025-04-10", false),
    )
    .unwrap();
    assert_eq!(second.date, "2025-04-10");

    let not_holiday = is_holiday(
        &mut persistence,
        site.site_id,
        &IsHolidayQuery {
            date: Some(String::from("2026-04-10")),
        },
        test_now(),
    )
    .unwrap();
    assert!(!not_holiday.is_holiday);
}

#[test]
fn test_holiday_conflict_returns_existing_holiday() {
    let (mut persistence, site) = setup_site();
    let existing: HolidayInfo = create_holiday(
        &mut persistence,
        site.site_id,
        &holiday_request("Christmas", "2024-12-25", true),
    )
    .unwrap();

    let result = create_holiday(
        &mut persistence,
        site.site_id,
        &holiday_request("Office party", "2025-12-25", false),
    );
    match result {
        Err(ApiError::HolidayConflict { existing: stored }) => {
            assert_eq!(stored.holiday_id, existing.holiday_id);
            assert_eq!(stored.name, "Christmas");
        }
        other => panic!("expected holiday conflict, got {other:?}"),
    }
}

#[test]
fn test_update_holiday_ignores_itself_when_checking_conflicts() {
    let (mut persistence, site) = setup_site();
    let holiday: HolidayInfo = create_holiday(
        &mut persistence,
        site.site_id,
        &holiday_request("New Year", "2025-01-01", false),
    )
    .unwrap();

    let updated: HolidayInfo = update_holiday(
        &mut persistence,
        holiday.holiday_id,
        &holiday_request("New Year's Day", "2025-01-01", true),
    )
    .unwrap();
    assert!(updated.is_recurring);
    assert_eq!(updated.name, "New Year's Day");
}

#[test]
fn test_list_holidays_by_year_includes_recurring() {
    let (mut persistence, site) = setup_site();
    create_holiday(
        &mut persistence,
        site.site_id,
        &holiday_request("Christmas", "2020-12-25", true),
    )
    .unwrap();
    create_holiday(
        &mut persistence,
        site.site_id,
        &holiday_request("Election", "2025-04-10", false),
    )
    .unwrap();
    create_holiday(
        &mut persistence,
        site.site_id,
        &holiday_request("Old election", "2024-06-03", false),
    )
    .unwrap();

    let listed = list_holidays(
        &mut persistence,
        site.site_id,
        &ListHolidaysQuery { year: Some(2025) },
    )
    .unwrap();
    let names: Vec<&str> = listed.holidays.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["Election", "Christmas"]);
}

#[test]
fn test_create_holiday_rejects_malformed_date() {
    let (mut persistence, site) = setup_site();

    let result = create_holiday(
        &mut persistence,
        site.site_id,
        &holiday_request("Bad", "2025-02-30", false),
    );
    assert!(matches!(result, Err(ApiError::InvalidInput { ref field, .. }) if field == "date"));
}

// ============================================================================
// Members
// ============================================================================

#[test]
fn test_member_plate_is_normalized_and_searchable() {
    let (mut persistence, site) = setup_site();
    let created: MemberInfo = member(&mut persistence, site.site_id, "Kim", " 12가 3456 ");
    assert_eq!(created.car_number, "12가3456");

    let found: MemberInfo = find_member_by_car_number(
        &mut persistence,
        site.site_id,
        &CarNumberQuery {
            car_number: String::from("12가3456"),
        },
    )
    .unwrap();
    assert_eq!(found.member_id, created.member_id);
}

#[test]
fn test_duplicate_member_plate_in_site_is_name_conflict() {
    let (mut persistence, site) = setup_site();
    member(&mut persistence, site.site_id, "Kim", "12가3456");

    let result = create_member(
        &mut persistence,
        site.site_id,
        &MemberRequest {
            name: String::from("Lee"),
            car_number: String::from("12가 3456"),
            phone: None,
        },
    );
    assert!(matches!(
        result,
        Err(ApiError::NameConflict { ref resource_type, .. }) if resource_type == "Member"
    ));
}

#[test]
fn test_member_with_invalid_plate_is_rejected() {
    let (mut persistence, site) = setup_site();

    let result = create_member(
        &mut persistence,
        site.site_id,
        &MemberRequest {
            name: String::from("Kim"),
            car_number: String::from("12#34"),
            phone: None,
        },
    );
    assert!(
        matches!(result, Err(ApiError::InvalidInput { ref field, .. }) if field == "car_number")
    );
}

#[test]
fn test_list_members_pages() {
    let (mut persistence, site) = setup_site();
    member(&mut persistence, site.site_id, "Cho", "11가1111");
    member(&mut persistence, site.site_id, "Ahn", "22가2222");
    member(&mut persistence, site.site_id, "Baek", "33가3333");

    let page = list_members(
        &mut persistence,
        site.site_id,
        &PageQuery {
            page: Some(2),
            per_page: Some(2),
        },
    )
    .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.page, 2);
    assert_eq!(page.members.len(), 1);
    assert_eq!(page.members[0].name, "Cho");
}

#[test]
fn test_deleting_member_removes_payments() {
    let (mut persistence, site) = setup_site();
    let kim: MemberInfo = member(&mut persistence, site.site_id, "Kim", "12가3456");
    let policy_id: i64 = membership_policy(&mut persistence, site.site_id);
    create_payment(
        &mut persistence,
        kim.member_id,
        &payment_request(policy_id, "2025-03-01", "2025-03-31"),
        test_now(),
    )
    .unwrap();

    delete_member(&mut persistence, kim.member_id).unwrap();

    assert!(matches!(
        get_member(&mut persistence, kim.member_id),
        Err(ApiError::ResourceNotFound { .. })
    ));
    assert!(matches!(
        list_payments(&mut persistence, kim.member_id),
        Err(ApiError::ResourceNotFound { .. })
    ));
}

// ============================================================================
// Payments & effective membership
// ============================================================================

#[test]
fn test_overlapping_payment_is_period_conflict() {
    let (mut persistence, site) = setup_site();
    let kim: MemberInfo = member(&mut persistence, site.site_id, "Kim", "12가3456");
    let policy_id: i64 = membership_policy(&mut persistence, site.site_id);
    let march: PaymentInfo = create_payment(
        &mut persistence,
        kim.member_id,
        &payment_request(policy_id, "2025-03-01", "2025-03-31"),
        test_now(),
    )
    .unwrap();
    assert_eq!(march.status, "SUCCESS");

    let result = create_payment(
        &mut persistence,
        kim.member_id,
        &payment_request(policy_id, "2025-03-31", "2025-04-29"),
        test_now(),
    );
    match result {
        Err(ApiError::PeriodConflict { existing }) => {
            assert_eq!(existing.history_id, march.history_id);
        }
        other => panic!("expected period conflict, got {other:?}"),
    }
}

#[test]
fn test_canceled_payment_frees_its_period() {
    let (mut persistence, site) = setup_site();
    let kim: MemberInfo = member(&mut persistence, site.site_id, "Kim", "12가3456");
    let policy_id: i64 = membership_policy(&mut persistence, site.site_id);
    let march: PaymentInfo = create_payment(
        &mut persistence,
        kim.member_id,
        &payment_request(policy_id, "2025-03-01", "2025-03-31"),
        test_now(),
    )
    .unwrap();

    let canceled: PaymentInfo = cancel_payment(&mut persistence, march.history_id).unwrap();
    assert_eq!(canceled.status, "CANCELED");

    create_payment(
        &mut persistence,
        kim.member_id,
        &payment_request(policy_id, "2025-03-15", "2025-04-14"),
        test_now(),
    )
    .unwrap();
    assert_eq!(
        list_payments(&mut persistence, kim.member_id)
            .unwrap()
            .payments
            .len(),
        2
    );
}

#[test]
fn test_payment_rejects_reversed_period_and_wrong_policy() {
    let (mut persistence, site) = setup_site();
    let kim: MemberInfo = member(&mut persistence, site.site_id, "Kim", "12가3456");
    let fee_policy: i64 = create_policy(
        &mut persistence,
        site.site_id,
        &CreatePolicyRequest {
            policy_type: String::from("FEE"),
            name: String::from("Standard"),
            code: None,
            config: json!({}),
            is_system: false,
        },
    )
    .unwrap()
    .policy_id;

    let reversed = create_payment(
        &mut persistence,
        kim.member_id,
        &payment_request(fee_policy, "2025-03-31", "2025-03-01"),
        test_now(),
    );
    assert!(
        matches!(reversed, Err(ApiError::InvalidInput { ref field, .. }) if field == "end_date")
    );

    let wrong_policy = create_payment(
        &mut persistence,
        kim.member_id,
        &payment_request(fee_policy, "2025-03-01", "2025-03-31"),
        test_now(),
    );
    assert!(matches!(
        wrong_policy,
        Err(ApiError::ParentNotFound { ref resource_type, .. }) if resource_type == "Policy"
    ));
}

#[test]
fn test_effective_membership_prefers_active_then_upcoming_then_expired() {
    let (mut persistence, site) = setup_site();
    let kim: MemberInfo = member(&mut persistence, site.site_id, "Kim", "12가3456");
    let policy_id: i64 = membership_policy(&mut persistence, site.site_id);
    for (start, end) in [
        ("2025-01-01", "2025-01-31"),
        ("2025-02-15", "2025-03-16"),
        ("2025-04-01", "2025-04-30"),
    ] {
        create_payment(
            &mut persistence,
            kim.member_id,
            &payment_request(policy_id, start, end),
            test_now(),
        )
        .unwrap();
    }

    let check = |persistence: &mut Persistence, as_of: &str| {
        effective_membership(
            persistence,
            kim.member_id,
            &EffectiveMembershipQuery {
                as_of: Some(as_of.to_string()),
            },
            test_now(),
        )
        .unwrap()
        .effective
        .unwrap()
    };

    let active = check(&mut persistence, "2025-03-01");
    assert_eq!(active.state, "ACTIVE");
    assert_eq!(active.payment.start_date, "2025-02-15");

    let upcoming = check(&mut persistence, "2025-03-20");
    assert_eq!(upcoming.state, "UPCOMING");
    assert_eq!(upcoming.payment.start_date, "2025-04-01");

    let expired = check(&mut persistence, "2025-06-01");
    assert_eq!(expired.state, "EXPIRED");
    assert_eq!(expired.payment.end_date, "2025-04-30");
}

#[test]
fn test_effective_membership_defaults_to_today_and_may_be_absent() {
    let (mut persistence, site) = setup_site();
    let kim: MemberInfo = member(&mut persistence, site.site_id, "Kim", "12가3456");

    let response = effective_membership(
        &mut persistence,
        kim.member_id,
        &EffectiveMembershipQuery::default(),
        test_now(),
    )
    .unwrap();
    assert_eq!(response.as_of, "2025-03-01");
    assert!(response.effective.is_none());
}
