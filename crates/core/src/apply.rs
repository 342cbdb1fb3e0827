// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::command::Command;
use crate::error::CoreError;
use crate::state::{ControllerClaim, SessionChange, TransitionResult, session_snapshot};
use parkops_audit::{Action, Actor, AuditEvent, Cause, StateSnapshot};
use parkops_domain::{
    ControllerToggle, DeviceController, DomainError, NewPolicy, ParkingSession, Policy, PolicyType,
    SessionPatch, SessionStatus, resolve_controller_toggle, validate_initial_policies,
};

/// Applies a session command, producing the row change and its audit event.
///
/// `current` is the session the command operates on:
///
/// * `OpenSession`: the vehicle's active session at the site, if any.
/// * `AmendSession` / `CloseSession`: the session named by the command.
///
/// # Errors
///
/// * `CoreError::ActiveSessionExists` when opening while another session
///   is active for the plate.
/// * `CoreError::SessionNotFound` when amending or closing without the
///   named session.
/// * `CoreError::DomainViolation` for terminal sessions, invalid status
///   changes and negative fees.
pub fn apply(
    current: Option<&ParkingSession>,
    command: Command,
    actor: Actor,
    cause: Cause,
) -> Result<TransitionResult, CoreError> {
    let action_name: &'static str = command.action_name();

    match command {
        Command::OpenSession { session } => {
            if let Some(existing) = current.filter(|s| s.is_active()) {
                return Err(CoreError::ActiveSessionExists {
                    site_id: session.site_id,
                    car_number: session.car_number,
                    session_id: existing.session_id,
                });
            }

            let action: Action = Action::new(
                String::from(action_name),
                Some(format!(
                    "Vehicle {} entered at lane {}",
                    session.car_number,
                    session
                        .entry
                        .lane_id
                        .map_or_else(|| String::from("unknown"), |id| id.to_string())
                )),
            );
            let audit_event: AuditEvent = AuditEvent::new(
                Some(session.site_id),
                actor,
                cause,
                action,
                StateSnapshot::from_pairs(&[("status", String::from("NONE"))]),
                StateSnapshot::from_pairs(&[("status", SessionStatus::Pending.to_string())]),
            );

            Ok(TransitionResult {
                change: SessionChange::Insert(session),
                audit_event,
            })
        }
        Command::AmendSession { session_id, patch } => {
            let existing: &ParkingSession = require_session(current, session_id)?;
            let updated: ParkingSession = existing.apply_patch(&patch)?;
            Ok(session_update(existing, updated, action_name, actor, cause))
        }
        Command::CloseSession {
            session_id,
            exit,
            total_fee,
            discount_fee,
            paid_fee,
            applied_discounts,
            note,
            forced,
        } => {
            let existing: &ParkingSession = require_session(current, session_id)?;
            let status: SessionStatus = if forced {
                SessionStatus::ForceCompleted
            } else {
                SessionStatus::Completed
            };
            let patch = SessionPatch {
                exit: Some(exit),
                total_fee: Some(total_fee),
                discount_fee: Some(discount_fee),
                paid_fee: Some(paid_fee),
                status: Some(status),
                note,
                applied_discounts,
                pre_settled_at: None,
            };
            let updated: ParkingSession = existing.apply_patch(&patch)?;
            Ok(session_update(existing, updated, action_name, actor, cause))
        }
    }
}

fn require_session(
    current: Option<&ParkingSession>,
    session_id: i64,
) -> Result<&ParkingSession, CoreError> {
    current
        .filter(|s| s.session_id == session_id)
        .ok_or(CoreError::SessionNotFound(session_id))
}

fn session_update(
    before: &ParkingSession,
    after: ParkingSession,
    action_name: &str,
    actor: Actor,
    cause: Cause,
) -> TransitionResult {
    let details: String = if before.status == after.status {
        format!("Session {} updated ({})", after.session_id, after.status)
    } else {
        format!(
            "Session {} moved from {} to {}",
            after.session_id, before.status, after.status
        )
    };
    let audit_event: AuditEvent = AuditEvent::new(
        Some(after.site_id),
        actor,
        cause,
        Action::new(String::from(action_name), Some(details)),
        session_snapshot(before),
        session_snapshot(&after),
    );
    TransitionResult {
        change: SessionChange::Update(after),
        audit_event,
    }
}

/// Toggles a controller's site relation.
///
/// Linked to `caller_site_id` → released; otherwise claimed by it, taken
/// from any other site without a conflict check.
#[must_use]
pub fn apply_controller_toggle(
    controller: &DeviceController,
    caller_site_id: i64,
    actor: Actor,
    cause: Cause,
) -> ControllerClaim {
    let toggle: ControllerToggle = resolve_controller_toggle(controller.site_id, caller_site_id);
    let new_site_id: Option<i64> = toggle.resulting_site_id(caller_site_id);

    let (name, details): (&str, String) = match toggle {
        ControllerToggle::Released => (
            "ReleaseDeviceController",
            format!(
                "Controller {} released by site {caller_site_id}",
                controller.controller_id
            ),
        ),
        ControllerToggle::Claimed {
            previous_site_id: Some(previous),
        } => (
            "ClaimDeviceController",
            format!(
                "Controller {} taken from site {previous} by site {caller_site_id}",
                controller.controller_id
            ),
        ),
        ControllerToggle::Claimed {
            previous_site_id: None,
        } => (
            "ClaimDeviceController",
            format!(
                "Controller {} claimed by site {caller_site_id}",
                controller.controller_id
            ),
        ),
    };

    let site_label =
        |site: Option<i64>| site.map_or_else(|| String::from("none"), |s| s.to_string());
    let audit_event: AuditEvent = AuditEvent::new(
        Some(caller_site_id),
        actor,
        cause,
        Action::new(String::from(name), Some(details)),
        StateSnapshot::from_pairs(&[("site_id", site_label(controller.site_id))]),
        StateSnapshot::from_pairs(&[("site_id", site_label(new_site_id))]),
    );

    ControllerClaim {
        toggle,
        new_site_id,
        audit_event,
    }
}

/// Validates a blacklist selection and produces its audit event.
///
/// `previous` is the currently selected blacklist of the site, if any.
///
/// # Errors
///
/// Returns `CoreError::NotABlacklist` if `target` is not a blacklist policy
/// of `site_id`.
pub fn apply_blacklist_selection(
    site_id: i64,
    previous: Option<&Policy>,
    target: &Policy,
    actor: Actor,
    cause: Cause,
) -> Result<AuditEvent, CoreError> {
    if target.site_id != site_id || target.policy_type() != PolicyType::Blacklist {
        return Err(CoreError::NotABlacklist {
            policy_id: target.policy_id,
        });
    }

    let label =
        |p: Option<&Policy>| p.map_or_else(|| String::from("none"), |p| p.policy_id.to_string());
    Ok(AuditEvent::new(
        Some(site_id),
        actor,
        cause,
        Action::new(
            String::from("SelectBlacklistPolicy"),
            Some(format!("Blacklist '{}' selected", target.name)),
        ),
        StateSnapshot::from_pairs(&[("selected_policy_id", label(previous))]),
        StateSnapshot::from_pairs(&[("selected_policy_id", label(Some(target)))]),
    ))
}

/// Validates a replacement policy set and produces its audit event.
///
/// # Errors
///
/// Returns `CoreError::DomainViolation` if names repeat, more than one
/// blacklist is selected, or an entry belongs to another site.
pub fn apply_policy_reset(
    site_id: i64,
    previous_count: usize,
    policies: &[NewPolicy],
    actor: Actor,
    cause: Cause,
) -> Result<AuditEvent, CoreError> {
    validate_initial_policies(policies)?;
    if let Some(foreign) = policies.iter().find(|p| p.site_id != site_id) {
        return Err(CoreError::DomainViolation(DomainError::InvalidText {
            field: "site_id",
            reason: format!(
                "policy '{}' belongs to site {}, not {site_id}",
                foreign.name, foreign.site_id
            ),
        }));
    }

    Ok(AuditEvent::new(
        Some(site_id),
        actor,
        cause,
        Action::new(
            String::from("ResetPolicies"),
            Some(format!(
                "Replaced {previous_count} policies with {}",
                policies.len()
            )),
        ),
        StateSnapshot::from_pairs(&[("policy_count", previous_count.to_string())]),
        StateSnapshot::from_pairs(&[("policy_count", policies.len().to_string())]),
    ))
}
