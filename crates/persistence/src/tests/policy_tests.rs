// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use diesel::prelude::*;
use parkops::CoreError;
use parkops_domain::{
    DomainError, NewPolicy, PageRequest, Policy, PolicyConfig, PolicyFilter, PolicySort,
    PolicyType, PolicyUpdate, SortDirection,
};
use serde_json::{Value, json};

use super::{create_test_actor, create_test_cause, setup_site};
use crate::diesel_schema::policies;
use crate::{Persistence, PersistenceError};

fn new_policy(site_id: i64, policy_type: PolicyType, name: &str, config: Value) -> NewPolicy {
    NewPolicy::new(site_id, policy_type, name, None, config, false).unwrap()
}

fn blacklist(site_id: i64, name: &str, selected: bool) -> NewPolicy {
    new_policy(
        site_id,
        PolicyType::Blacklist,
        name,
        json!({"is_selected": selected, "car_numbers": ["99ZZ9999"]}),
    )
}

fn stored_config_text(persistence: &mut Persistence, policy_id: i64) -> String {
    policies::table
        .filter(policies::policy_id.eq(policy_id))
        .select(policies::config)
        .first(&mut persistence.conn)
        .unwrap()
}

#[test]
fn test_create_fee_policy_fills_defaults() {
    let (mut persistence, site) = setup_site();

    let policy: Policy = persistence
        .create_policy(&new_policy(
            site.site_id,
            PolicyType::Fee,
            "Standard",
            json!({"base_fee": 1000, "unit_fee": 500}),
        ))
        .unwrap();

    assert_eq!(policy.policy_type(), PolicyType::Fee);
    match policy.config {
        PolicyConfig::Fee(fee) => {
            assert_eq!(fee.base_fee, 1000);
            assert_eq!(fee.unit_fee, 500);
            assert_eq!(fee.base_minutes, 30);
            assert_eq!(fee.unit_minutes, 10);
        }
        other => panic!("Expected a fee config, got {other:?}"),
    }
}

#[test]
fn test_duplicate_policy_name_is_name_conflict() {
    let (mut persistence, site) = setup_site();
    persistence
        .create_policy(&new_policy(site.site_id, PolicyType::Fee, "Standard", json!({})))
        .unwrap();

    let result = persistence.create_policy(&new_policy(
        site.site_id,
        PolicyType::Reduction,
        "Standard",
        json!({}),
    ));
    assert!(matches!(
        result,
        Err(PersistenceError::NameConflict { entity: "policy", .. })
    ));
}

#[test]
fn test_policy_for_missing_site_is_parent_not_found() {
    let (mut persistence, _site) = setup_site();

    let result =
        persistence.create_policy(&new_policy(321, PolicyType::Fee, "Orphan", json!({})));
    assert!(matches!(
        result,
        Err(PersistenceError::ParentNotFound { entity: "site", id: 321 })
    ));
}

#[test]
fn test_update_policy_merges_config() {
    let (mut persistence, site) = setup_site();
    let policy: Policy = persistence
        .create_policy(&new_policy(
            site.site_id,
            PolicyType::Fee,
            "Standard",
            json!({"base_fee": 1000, "unit_fee": 500}),
        ))
        .unwrap();

    let updated: Policy = persistence
        .update_policy(
            policy.policy_id,
            &PolicyUpdate {
                name: Some(String::from("Weekday")),
                code: Some(Some(String::from("WD"))),
                config: Some(json!({"base_fee": 2000})),
            },
        )
        .unwrap();

    assert_eq!(updated.name, "Weekday");
    assert_eq!(updated.code.as_deref(), Some("WD"));
    match updated.config {
        PolicyConfig::Fee(fee) => {
            assert_eq!(fee.base_fee, 2000);
            assert_eq!(fee.unit_fee, 500);
        }
        other => panic!("Expected a fee config, got {other:?}"),
    }
    assert!(updated.updated_at >= policy.updated_at);
}

#[test]
fn test_update_policy_rejects_unknown_config_key() {
    let (mut persistence, site) = setup_site();
    let policy: Policy = persistence
        .create_policy(&new_policy(site.site_id, PolicyType::Fee, "Standard", json!({})))
        .unwrap();

    let result = persistence.update_policy(
        policy.policy_id,
        &PolicyUpdate {
            config: Some(json!({"surge": 3})),
            ..PolicyUpdate::default()
        },
    );
    assert!(matches!(
        result,
        Err(PersistenceError::Rejected(CoreError::DomainViolation(
            DomainError::InvalidPolicyConfig { .. }
        )))
    ));
}

#[test]
fn test_update_cannot_select_a_blacklist() {
    let (mut persistence, site) = setup_site();
    let policy: Policy = persistence
        .create_policy(&blacklist(site.site_id, "Banned", false))
        .unwrap();

    let result = persistence.update_policy(
        policy.policy_id,
        &PolicyUpdate {
            config: Some(json!({"is_selected": true})),
            ..PolicyUpdate::default()
        },
    );
    assert!(matches!(result, Err(PersistenceError::Rejected(_))));
    assert!(persistence.get_selected_blacklist(site.site_id).unwrap().is_none());
}

#[test]
fn test_update_missing_policy_is_not_found() {
    let (mut persistence, _site) = setup_site();

    let result = persistence.update_policy(
        55,
        &PolicyUpdate {
            name: Some(String::from("Ghost")),
            ..PolicyUpdate::default()
        },
    );
    assert!(matches!(
        result,
        Err(PersistenceError::NotFound { entity: "policy", id: 55 })
    ));
}

#[test]
fn test_delete_system_policy_is_rejected() {
    let (mut persistence, site) = setup_site();
    let system: Policy = persistence
        .create_policy(
            &NewPolicy::new(site.site_id, PolicyType::Fee, "Default", None, json!({}), true)
                .unwrap(),
        )
        .unwrap();

    let result = persistence.delete_policy(system.policy_id);
    assert!(matches!(
        result,
        Err(PersistenceError::Rejected(CoreError::DomainViolation(
            DomainError::SystemPolicyProtected { .. }
        )))
    ));
    assert!(persistence.get_policy(system.policy_id).unwrap().is_some());
}

#[test]
fn test_delete_policy() {
    let (mut persistence, site) = setup_site();
    let policy: Policy = persistence
        .create_policy(&new_policy(site.site_id, PolicyType::Fee, "Standard", json!({})))
        .unwrap();

    persistence.delete_policy(policy.policy_id).unwrap();

    assert!(persistence.get_policy(policy.policy_id).unwrap().is_none());
    assert!(matches!(
        persistence.delete_policy(policy.policy_id),
        Err(PersistenceError::NotFound { entity: "policy", .. })
    ));
}

#[test]
fn test_list_policies_filters_sorts_and_pages() {
    let (mut persistence, site) = setup_site();
    for name in ["Night", "Day", "Evening"] {
        persistence
            .create_policy(&new_policy(site.site_id, PolicyType::Fee, name, json!({})))
            .unwrap();
    }
    persistence
        .create_policy(&new_policy(
            site.site_id,
            PolicyType::Reduction,
            "Disabled",
            json!({"kind": "PERCENT", "value": 50}),
        ))
        .unwrap();

    let filter = PolicyFilter {
        site_id: Some(site.site_id),
        policy_type: Some(PolicyType::Fee),
        ..PolicyFilter::default()
    };
    let first = persistence
        .list_policies(
            &filter,
            PolicySort::Name,
            SortDirection::Asc,
            PageRequest::new(Some(1), Some(2)).unwrap(),
        )
        .unwrap();
    assert_eq!(first.total, 3);
    let names: Vec<&str> = first.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Day", "Evening"]);

    let second = persistence
        .list_policies(
            &filter,
            PolicySort::Name,
            SortDirection::Asc,
            PageRequest::new(Some(2), Some(2)).unwrap(),
        )
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].name, "Night");

    let by_name = PolicyFilter {
        site_id: Some(site.site_id),
        name_contains: Some(String::from("ni")),
        ..PolicyFilter::default()
    };
    let matched = persistence
        .list_policies(
            &by_name,
            PolicySort::Id,
            SortDirection::Desc,
            PageRequest::default(),
        )
        .unwrap();
    let names: Vec<&str> = matched.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Evening", "Night"]);
}

#[test]
fn test_selected_flag_lives_outside_stored_config() {
    let (mut persistence, site) = setup_site();
    let policy: Policy = persistence
        .create_policy(&blacklist(site.site_id, "Banned", true))
        .unwrap();

    assert!(policy.is_selected());
    let raw: Value = serde_json::from_str(&stored_config_text(&mut persistence, policy.policy_id))
        .unwrap();
    assert!(raw.get("is_selected").is_none());
    assert_eq!(raw["car_numbers"], json!(["99ZZ9999"]));
}

#[test]
fn test_creating_selected_blacklist_clears_siblings() {
    let (mut persistence, site) = setup_site();
    let first: Policy = persistence
        .create_policy(&blacklist(site.site_id, "Old list", true))
        .unwrap();

    let second: Policy = persistence
        .create_policy(&blacklist(site.site_id, "New list", true))
        .unwrap();

    let selected = persistence.get_selected_blacklist(site.site_id).unwrap().unwrap();
    assert_eq!(selected.policy_id, second.policy_id);
    let first = persistence.get_policy(first.policy_id).unwrap().unwrap();
    assert!(!first.is_selected());
}

#[test]
fn test_select_blacklist_keeps_exactly_one_selected() {
    let (mut persistence, site) = setup_site();
    let a: Policy = persistence
        .create_policy(&blacklist(site.site_id, "List A", false))
        .unwrap();
    let b: Policy = persistence
        .create_policy(&blacklist(site.site_id, "List B", false))
        .unwrap();

    let first = persistence
        .select_blacklist_policy(
            site.site_id,
            a.policy_id,
            create_test_actor(),
            create_test_cause(),
        )
        .unwrap();
    assert_eq!(first.previous_policy_id, None);
    assert!(first.policy.is_selected());

    let second = persistence
        .select_blacklist_policy(
            site.site_id,
            b.policy_id,
            create_test_actor(),
            create_test_cause(),
        )
        .unwrap();
    assert_eq!(second.previous_policy_id, Some(a.policy_id));

    let selected: Vec<Policy> = persistence
        .list_policies(
            &PolicyFilter {
                site_id: Some(site.site_id),
                policy_type: Some(PolicyType::Blacklist),
                ..PolicyFilter::default()
            },
            PolicySort::Id,
            SortDirection::Asc,
            PageRequest::default(),
        )
        .unwrap()
        .items
        .into_iter()
        .filter(Policy::is_selected)
        .collect();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].policy_id, b.policy_id);

    let event = persistence.get_audit_event(second.event_id).unwrap();
    assert_eq!(event.event.action.name, "SelectBlacklistPolicy");
}

#[test]
fn test_select_missing_blacklist_keeps_previous_selection() {
    let (mut persistence, site) = setup_site();
    let current: Policy = persistence
        .create_policy(&blacklist(site.site_id, "Current", true))
        .unwrap();

    let result = persistence.select_blacklist_policy(
        site.site_id,
        9999,
        create_test_actor(),
        create_test_cause(),
    );
    assert!(matches!(
        result,
        Err(PersistenceError::NotFound { entity: "policy", id: 9999 })
    ));

    let selected = persistence.get_selected_blacklist(site.site_id).unwrap().unwrap();
    assert_eq!(selected.policy_id, current.policy_id);
}

#[test]
fn test_select_non_blacklist_is_rejected() {
    let (mut persistence, site) = setup_site();
    let current: Policy = persistence
        .create_policy(&blacklist(site.site_id, "Current", true))
        .unwrap();
    let fee: Policy = persistence
        .create_policy(&new_policy(site.site_id, PolicyType::Fee, "Standard", json!({})))
        .unwrap();

    let result = persistence.select_blacklist_policy(
        site.site_id,
        fee.policy_id,
        create_test_actor(),
        create_test_cause(),
    );
    assert!(matches!(
        result,
        Err(PersistenceError::Rejected(CoreError::NotABlacklist { .. }))
    ));

    let selected = persistence.get_selected_blacklist(site.site_id).unwrap().unwrap();
    assert_eq!(selected.policy_id, current.policy_id);
}

#[test]
fn test_select_blacklist_of_another_site_is_rejected() {
    let (mut persistence, site) = setup_site();
    let other = persistence.create_site("North", "UTC", None).unwrap();
    let foreign: Policy = persistence
        .create_policy(&blacklist(other.site_id, "Foreign", false))
        .unwrap();

    let result = persistence.select_blacklist_policy(
        site.site_id,
        foreign.policy_id,
        create_test_actor(),
        create_test_cause(),
    );
    assert!(matches!(
        result,
        Err(PersistenceError::Rejected(CoreError::NotABlacklist { .. }))
    ));
}

#[test]
fn test_reset_policies_replaces_the_set() {
    let (mut persistence, site) = setup_site();
    persistence
        .create_policy(&new_policy(site.site_id, PolicyType::Fee, "Old fee", json!({})))
        .unwrap();
    persistence
        .create_policy(&blacklist(site.site_id, "Old list", true))
        .unwrap();

    let reset = persistence
        .reset_policies(
            site.site_id,
            &[
                new_policy(site.site_id, PolicyType::Fee, "New fee", json!({"base_fee": 3000})),
                blacklist(site.site_id, "New list", true),
            ],
            create_test_actor(),
            create_test_cause(),
        )
        .unwrap();

    assert_eq!(reset.removed, 2);
    let names: Vec<&str> = reset.policies.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["New fee", "New list"]);
    let selected = persistence.get_selected_blacklist(site.site_id).unwrap().unwrap();
    assert_eq!(selected.name, "New list");

    let event = persistence.get_audit_event(reset.event_id).unwrap();
    assert_eq!(event.event.action.name, "ResetPolicies");
    assert_eq!(event.event.site_id, Some(site.site_id));
}

#[test]
fn test_reset_with_duplicate_names_keeps_old_set() {
    let (mut persistence, site) = setup_site();
    let old: Policy = persistence
        .create_policy(&new_policy(site.site_id, PolicyType::Fee, "Old fee", json!({})))
        .unwrap();

    let result = persistence.reset_policies(
        site.site_id,
        &[
            new_policy(site.site_id, PolicyType::Fee, "Same", json!({})),
            new_policy(site.site_id, PolicyType::Reduction, "Same", json!({})),
        ],
        create_test_actor(),
        create_test_cause(),
    );
    assert!(matches!(
        result,
        Err(PersistenceError::Rejected(CoreError::DomainViolation(
            DomainError::DuplicatePolicyName(_)
        )))
    ));
    assert!(persistence.get_policy(old.policy_id).unwrap().is_some());
}

#[test]
fn test_reset_with_two_selected_blacklists_keeps_old_set() {
    let (mut persistence, site) = setup_site();
    let old: Policy = persistence
        .create_policy(&blacklist(site.site_id, "Old list", true))
        .unwrap();

    let result = persistence.reset_policies(
        site.site_id,
        &[
            blacklist(site.site_id, "List A", true),
            blacklist(site.site_id, "List B", true),
        ],
        create_test_actor(),
        create_test_cause(),
    );
    assert!(matches!(
        result,
        Err(PersistenceError::Rejected(CoreError::DomainViolation(
            DomainError::MultipleBlacklistSelected { count: 2 }
        )))
    ));
    let selected = persistence.get_selected_blacklist(site.site_id).unwrap().unwrap();
    assert_eq!(selected.policy_id, old.policy_id);
}

#[test]
fn test_reset_for_missing_site_is_parent_not_found() {
    let (mut persistence, _site) = setup_site();

    let result = persistence.reset_policies(500, &[], create_test_actor(), create_test_cause());
    assert!(matches!(
        result,
        Err(PersistenceError::ParentNotFound { entity: "site", id: 500 })
    ));
}
