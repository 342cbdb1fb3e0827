// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{Action, Actor, AuditEvent, Cause, StateSnapshot};

#[test]
fn test_snapshot_from_pairs() {
    let snapshot: StateSnapshot = StateSnapshot::from_pairs(&[
        ("status", String::from("PENDING")),
        ("paid_fee", 0.to_string()),
    ]);
    assert_eq!(snapshot.data, "status=PENDING,paid_fee=0");
    assert_eq!(StateSnapshot::from_pairs(&[]).data, "");
}

#[test]
fn test_audit_event_keeps_site_scope() {
    let event: AuditEvent = AuditEvent::new(
        Some(3),
        Actor::new(String::from("op-1"), String::from("operator")),
        Cause::new(String::from("req-9"), String::from("Lane override")),
        Action::new(String::from("CloseSession"), None),
        StateSnapshot::new(String::from("status=PENDING")),
        StateSnapshot::new(String::from("status=FORCE_COMPLETED")),
    );

    assert_eq!(event.site_id, Some(3));
    assert_eq!(event.action.name, "CloseSession");
    assert_eq!(event.after.data, "status=FORCE_COMPLETED");
}
