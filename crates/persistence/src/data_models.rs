// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use parkops_audit::AuditEvent;
use parkops_domain::{ControllerToggle, DeviceController, ParkingSession, Policy};
use time::OffsetDateTime;

/// A stored audit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEventRecord {
    /// Identifier assigned by the database.
    pub event_id: i64,
    /// When the event was written.
    pub created_at: OffsetDateTime,
    /// The event.
    pub event: AuditEvent,
}

/// The committed outcome of a session command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTransition {
    /// The session as stored after the command.
    pub session: ParkingSession,
    /// The audit event written with it.
    pub event_id: i64,
}

/// The committed outcome of a controller toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerToggleOutcome {
    /// The controller as stored after the toggle.
    pub controller: DeviceController,
    /// How the relation flipped.
    pub toggle: ControllerToggle,
    /// The audit event written with it.
    pub event_id: i64,
}

/// The committed outcome of a blacklist selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlacklistSelection {
    /// The newly selected policy.
    pub policy: Policy,
    /// The policy selected before, if any.
    pub previous_policy_id: Option<i64>,
    /// The audit event written with it.
    pub event_id: i64,
}

/// The committed outcome of a policy reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyReset {
    /// The site's policies after the reset.
    pub policies: Vec<Policy>,
    /// Number of policies removed.
    pub removed: usize,
    /// The audit event written with it.
    pub event_id: i64,
}
