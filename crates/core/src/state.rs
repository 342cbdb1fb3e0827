// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use parkops_audit::{AuditEvent, StateSnapshot};
use parkops_domain::{ControllerToggle, NewSession, ParkingSession};

/// The row-level effect of a session command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// Insert a new `PENDING` session.
    Insert(NewSession),
    /// Overwrite the mutable fields of an existing session.
    Update(ParkingSession),
}

/// The result of applying a session command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    /// What to write.
    pub change: SessionChange,
    /// The audit event for the transition.
    pub audit_event: AuditEvent,
}

/// The result of toggling a controller's site relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerClaim {
    /// How the relation flipped.
    pub toggle: ControllerToggle,
    /// The controller's site afterwards.
    pub new_site_id: Option<i64>,
    /// The audit event for the change.
    pub audit_event: AuditEvent,
}

pub(crate) fn session_snapshot(session: &ParkingSession) -> StateSnapshot {
    StateSnapshot::from_pairs(&[
        ("status", session.status.to_string()),
        ("total_fee", session.total_fee.to_string()),
        ("discount_fee", session.discount_fee.to_string()),
        ("paid_fee", session.paid_fee.to_string()),
    ])
}
