// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{
    create_test_actor, create_test_cause, create_test_exit, create_test_new_session,
    create_test_session,
};
use crate::{Command, CoreError, SessionChange, TransitionResult, apply};
use parkops_domain::{DomainError, SessionPatch, SessionStatus};

#[test]
fn test_open_session_produces_insert_and_audit() {
    let result: TransitionResult = apply(
        None,
        Command::OpenSession {
            session: create_test_new_session(),
        },
        create_test_actor(),
        create_test_cause(),
    )
    .unwrap();

    assert!(matches!(result.change, SessionChange::Insert(ref s) if s.car_number == "12GA3456"));
    assert_eq!(result.audit_event.site_id, Some(1));
    assert_eq!(result.audit_event.action.name, "OpenSession");
    assert_eq!(result.audit_event.after.data, "status=PENDING");
}

#[test]
fn test_open_session_rejects_second_active() {
    let existing = create_test_session(SessionStatus::PreSettled);
    let result = apply(
        Some(&existing),
        Command::OpenSession {
            session: create_test_new_session(),
        },
        create_test_actor(),
        create_test_cause(),
    );

    assert_eq!(
        result,
        Err(CoreError::ActiveSessionExists {
            site_id: 1,
            car_number: String::from("12GA3456"),
            session_id: 42,
        })
    );
}

#[test]
fn test_open_session_ignores_closed_session() {
    let closed = create_test_session(SessionStatus::Completed);
    let result = apply(
        Some(&closed),
        Command::OpenSession {
            session: create_test_new_session(),
        },
        create_test_actor(),
        create_test_cause(),
    );
    assert!(result.is_ok());
}

#[test]
fn test_amend_session_moves_status() {
    let existing = create_test_session(SessionStatus::Pending);
    let result = apply(
        Some(&existing),
        Command::AmendSession {
            session_id: 42,
            patch: SessionPatch {
                status: Some(SessionStatus::PaymentPending),
                total_fee: Some(4000),
                ..SessionPatch::default()
            },
        },
        create_test_actor(),
        create_test_cause(),
    )
    .unwrap();

    let SessionChange::Update(updated) = result.change else {
        panic!("expected update");
    };
    assert_eq!(updated.status, SessionStatus::PaymentPending);
    assert_eq!(updated.total_fee, 4000);
    assert_eq!(
        result.audit_event.before.data,
        "status=PENDING,total_fee=0,discount_fee=0,paid_fee=0"
    );
    assert_eq!(
        result.audit_event.after.data,
        "status=PAYMENT_PENDING,total_fee=4000,discount_fee=0,paid_fee=0"
    );
}

#[test]
fn test_amend_requires_matching_session() {
    let existing = create_test_session(SessionStatus::Pending);
    let result = apply(
        Some(&existing),
        Command::AmendSession {
            session_id: 7,
            patch: SessionPatch::default(),
        },
        create_test_actor(),
        create_test_cause(),
    );
    assert_eq!(result, Err(CoreError::SessionNotFound(7)));
}

#[test]
fn test_close_session_completes() {
    let existing = create_test_session(SessionStatus::PaymentPending);
    let result = apply(
        Some(&existing),
        Command::CloseSession {
            session_id: 42,
            exit: create_test_exit(),
            total_fee: 3000,
            discount_fee: 1000,
            paid_fee: 2000,
            applied_discounts: None,
            note: None,
            forced: false,
        },
        create_test_actor(),
        create_test_cause(),
    )
    .unwrap();

    let SessionChange::Update(closed) = result.change else {
        panic!("expected update");
    };
    assert_eq!(closed.status, SessionStatus::Completed);
    assert_eq!(closed.exit, Some(create_test_exit()));
    assert_eq!(closed.paid_fee, 2000);
    assert_eq!(result.audit_event.action.name, "CloseSession");
}

#[test]
fn test_force_close_from_pending() {
    let existing = create_test_session(SessionStatus::Pending);
    let result = apply(
        Some(&existing),
        Command::CloseSession {
            session_id: 42,
            exit: create_test_exit(),
            total_fee: 0,
            discount_fee: 0,
            paid_fee: 0,
            applied_discounts: None,
            note: Some(Some(String::from("gate fault"))),
            forced: true,
        },
        create_test_actor(),
        create_test_cause(),
    )
    .unwrap();

    let SessionChange::Update(closed) = result.change else {
        panic!("expected update");
    };
    assert_eq!(closed.status, SessionStatus::ForceCompleted);
    assert_eq!(closed.note.as_deref(), Some("gate fault"));
    assert_eq!(result.audit_event.action.name, "ForceCloseSession");
}

#[test]
fn test_close_rejects_terminal_session() {
    let existing = create_test_session(SessionStatus::Completed);
    let result = apply(
        Some(&existing),
        Command::CloseSession {
            session_id: 42,
            exit: create_test_exit(),
            total_fee: 0,
            discount_fee: 0,
            paid_fee: 0,
            applied_discounts: None,
            note: None,
            forced: true,
        },
        create_test_actor(),
        create_test_cause(),
    );
    assert_eq!(
        result,
        Err(CoreError::DomainViolation(DomainError::SessionNotActive {
            session_id: 42,
            status: SessionStatus::Completed,
        }))
    );
}
