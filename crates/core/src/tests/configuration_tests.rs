// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{create_test_actor, create_test_cause};
use crate::{
    CoreError, apply_blacklist_selection, apply_controller_toggle, apply_policy_reset,
};
use parkops_domain::{
    ControllerToggle, DeviceController, DomainError, NewPolicy, Policy, PolicyConfig, PolicyType,
};
use serde_json::json;
use time::macros::datetime;

fn controller(site_id: Option<i64>) -> DeviceController {
    DeviceController {
        controller_id: 5,
        site_id,
        name: String::from("ctl-5"),
        host: String::from("10.1.1.5"),
        port: 4001,
    }
}

fn policy(policy_id: i64, site_id: i64, policy_type: PolicyType) -> Policy {
    Policy {
        policy_id,
        site_id,
        name: format!("policy-{policy_id}"),
        code: None,
        config: PolicyConfig::from_value(policy_type, json!({})).unwrap(),
        is_system: false,
        created_at: datetime!(2025-01-01 00:00 UTC),
        updated_at: datetime!(2025-01-01 00:00 UTC),
    }
}

#[test]
fn test_toggle_claim_from_other_site_is_audited() {
    let claim = apply_controller_toggle(
        &controller(Some(2)),
        1,
        create_test_actor(),
        create_test_cause(),
    );

    assert_eq!(
        claim.toggle,
        ControllerToggle::Claimed {
            previous_site_id: Some(2)
        }
    );
    assert_eq!(claim.new_site_id, Some(1));
    assert_eq!(claim.audit_event.action.name, "ClaimDeviceController");
    assert_eq!(claim.audit_event.before.data, "site_id=2");
    assert_eq!(claim.audit_event.after.data, "site_id=1");
}

#[test]
fn test_toggle_release() {
    let claim = apply_controller_toggle(
        &controller(Some(1)),
        1,
        create_test_actor(),
        create_test_cause(),
    );
    assert_eq!(claim.new_site_id, None);
    assert_eq!(claim.audit_event.action.name, "ReleaseDeviceController");
    assert_eq!(claim.audit_event.after.data, "site_id=none");
}

#[test]
fn test_blacklist_selection_audit() {
    let previous = policy(1, 1, PolicyType::Blacklist);
    let target = policy(2, 1, PolicyType::Blacklist);
    let event = apply_blacklist_selection(
        1,
        Some(&previous),
        &target,
        create_test_actor(),
        create_test_cause(),
    )
    .unwrap();
    assert_eq!(event.before.data, "selected_policy_id=1");
    assert_eq!(event.after.data, "selected_policy_id=2");
}

#[test]
fn test_blacklist_selection_rejects_other_kinds_and_sites() {
    let fee = policy(3, 1, PolicyType::Fee);
    assert_eq!(
        apply_blacklist_selection(1, None, &fee, create_test_actor(), create_test_cause()),
        Err(CoreError::NotABlacklist { policy_id: 3 })
    );

    let foreign = policy(4, 2, PolicyType::Blacklist);
    assert_eq!(
        apply_blacklist_selection(1, None, &foreign, create_test_actor(), create_test_cause()),
        Err(CoreError::NotABlacklist { policy_id: 4 })
    );
}

#[test]
fn test_policy_reset_validates_selection() {
    let selected = |name: &str| {
        NewPolicy::new(
            1,
            PolicyType::Blacklist,
            name,
            None,
            json!({"is_selected": true}),
            false,
        )
        .unwrap()
    };

    let result = apply_policy_reset(
        1,
        3,
        &[selected("A"), selected("B")],
        create_test_actor(),
        create_test_cause(),
    );
    assert_eq!(
        result,
        Err(CoreError::DomainViolation(
            DomainError::MultipleBlacklistSelected { count: 2 }
        ))
    );

    let event = apply_policy_reset(1, 3, &[selected("A")], create_test_actor(), create_test_cause())
        .unwrap();
    assert_eq!(event.before.data, "policy_count=3");
    assert_eq!(event.after.data, "policy_count=1");
}

#[test]
fn test_policy_reset_rejects_foreign_site() {
    let foreign = NewPolicy::new(2, PolicyType::Fee, "Other", None, json!({}), false).unwrap();
    let result = apply_policy_reset(1, 0, &[foreign], create_test_actor(), create_test_cause());
    assert!(matches!(
        result,
        Err(CoreError::DomainViolation(DomainError::InvalidText { field: "site_id", .. }))
    ));
}
