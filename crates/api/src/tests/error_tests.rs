// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use parkops::CoreError;
use parkops_domain::{DomainError, SessionStatus};
use parkops_persistence::PersistenceError;

use crate::{ApiError, translate_core_error, translate_domain_error, translate_persistence_error};

#[test]
fn test_domain_validation_errors_name_the_field() {
    let cases: Vec<(DomainError, &str)> = vec![
        (
            DomainError::InvalidName {
                entity: "zone",
                reason: String::from("cannot be empty"),
            },
            "name",
        ),
        (DomainError::InvalidCarNumber(String::from("#")), "car_number"),
        (DomainError::InvalidTimezone(String::from("Mars/Base")), "timezone"),
        (DomainError::InvalidPort(0), "port"),
        (
            DomainError::NegativeAmount {
                field: "discount_fee",
                amount: -5,
            },
            "discount_fee",
        ),
        (DomainError::InvalidEventSource(String::from("DRONE")), "source"),
        (DomainError::InvalidPaymentStatus(String::from("REFUND")), "status"),
    ];

    for (err, expected) in cases {
        match translate_domain_error(err) {
            ApiError::InvalidInput { field, .. } => assert_eq!(field, expected),
            other => panic!("expected invalid input for {expected}, got {other:?}"),
        }
    }
}

#[test]
fn test_state_machine_errors_are_rule_violations() {
    let transition = translate_domain_error(DomainError::InvalidStatusTransition {
        from: SessionStatus::PaymentPending,
        to: SessionStatus::Pending,
    });
    assert!(matches!(
        transition,
        ApiError::DomainRuleViolation { ref rule, .. } if rule == "session_state_machine"
    ));

    let inactive = translate_domain_error(DomainError::SessionNotActive {
        session_id: 4,
        status: SessionStatus::Completed,
    });
    assert!(matches!(
        inactive,
        ApiError::DomainRuleViolation { ref rule, .. } if rule == "session_not_active"
    ));
}

#[test]
fn test_core_errors_translate() {
    assert_eq!(
        translate_core_error(CoreError::ActiveSessionExists {
            site_id: 1,
            car_number: String::from("12가3456"),
            session_id: 9,
        }),
        ApiError::ActiveSessionExists {
            session_id: 9,
            car_number: String::from("12가3456"),
        }
    );
    assert!(matches!(
        translate_core_error(CoreError::NotABlacklist { policy_id: 3 }),
        ApiError::ResourceNotFound { .. }
    ));
    assert!(matches!(
        translate_core_error(CoreError::DomainViolation(DomainError::DuplicatePolicyName(
            String::from("Standard")
        ))),
        ApiError::NameConflict { ref resource_type, .. } if resource_type == "Policy"
    ));
}

#[test]
fn test_persistence_lookup_errors_capitalize_entity() {
    let missing = translate_persistence_error(PersistenceError::NotFound {
        entity: "device controller",
        id: 8,
    });
    assert_eq!(
        missing,
        ApiError::ResourceNotFound {
            resource_type: String::from("Device controller"),
            message: String::from("Device controller 8 does not exist"),
        }
    );

    let parent = translate_persistence_error(PersistenceError::ParentNotFound {
        entity: "zone",
        id: 2,
    });
    assert!(matches!(
        parent,
        ApiError::ParentNotFound { ref resource_type, .. } if resource_type == "Zone"
    ));

    let conflict = translate_persistence_error(PersistenceError::NameConflict {
        entity: "lane",
        name: String::from("Gate 1"),
    });
    assert!(matches!(
        conflict,
        ApiError::NameConflict { ref resource_type, .. } if resource_type == "Lane"
    ));
}

#[test]
fn test_storage_failures_translate() {
    assert!(matches!(
        translate_persistence_error(PersistenceError::DatabaseError(String::from(
            "database is locked"
        ))),
        ApiError::StorageUnavailable { .. }
    ));
    assert!(matches!(
        translate_persistence_error(PersistenceError::DatabaseConnectionFailed(String::from(
            "unable to open database file"
        ))),
        ApiError::StorageUnavailable { .. }
    ));
    assert!(matches!(
        translate_persistence_error(PersistenceError::DatabaseError(String::from(
            "disk I/O error"
        ))),
        ApiError::Internal { .. }
    ));
    assert!(matches!(
        translate_persistence_error(PersistenceError::CheckViolation(String::from(
            "CHECK constraint failed: paid_fee >= 0"
        ))),
        ApiError::InvalidInput { ref field, .. } if field == "value"
    ));
    assert!(matches!(
        translate_persistence_error(PersistenceError::ConstraintViolation(String::from(
            "holiday already exists on this day"
        ))),
        ApiError::DomainRuleViolation { ref rule, .. } if rule == "storage_constraint"
    ));
}

#[test]
fn test_rejected_command_uses_core_translation() {
    let err = translate_persistence_error(PersistenceError::Rejected(CoreError::SessionNotFound(
        5,
    )));
    assert!(matches!(
        err,
        ApiError::ResourceNotFound { ref resource_type, .. } if resource_type == "Session"
    ));
}

#[test]
fn test_display_mentions_field() {
    let err = ApiError::InvalidInput {
        field: String::from("port"),
        message: String::from("out of range"),
    };
    assert_eq!(
        err.to_string(),
        "Invalid input for field 'port': out of range"
    );
}
