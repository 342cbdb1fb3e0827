// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Parking sessions: one record per vehicle visit.
//!
//! ```text
//! PENDING ──► PRE_SETTLED ──► PAYMENT_PENDING
//!    │             │                │
//!    └─────────────┴───────┬────────┘
//!                          ▼
//!              COMPLETED / FORCE_COMPLETED
//! ```
//!
//! Fee values are stored as computed elsewhere; nothing here derives them.

use crate::error::DomainError;
use crate::validation::{normalize_car_number, validate_amount, validate_optional_text};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

/// Status of a parking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Vehicle entered; nothing settled yet.
    #[default]
    Pending,
    /// Fee settled ahead of exit (at a kiosk, for example).
    PreSettled,
    /// Vehicle at the exit waiting for payment.
    PaymentPending,
    /// Vehicle left after normal settlement.
    Completed,
    /// Closed by an operator regardless of payment state.
    ForceCompleted,
}

/// Statuses during which a vehicle is considered inside the facility.
pub const ACTIVE_STATUSES: [SessionStatus; 3] = [
    SessionStatus::Pending,
    SessionStatus::PreSettled,
    SessionStatus::PaymentPending,
];

impl SessionStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::PreSettled => "PRE_SETTLED",
            Self::PaymentPending => "PAYMENT_PENDING",
            Self::Completed => "COMPLETED",
            Self::ForceCompleted => "FORCE_COMPLETED",
        }
    }

    /// Whether the vehicle is still inside.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::PreSettled | Self::PaymentPending)
    }

    /// Whether the session is closed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Checks if a transition from this status to `target` is valid.
    ///
    /// Valid transitions are:
    /// - `Pending` → `PreSettled`
    /// - `Pending` / `PreSettled` → `PaymentPending`
    /// - any active status → `Completed` / `ForceCompleted`
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::PreSettled | Self::PaymentPending)
                | (Self::PreSettled, Self::PaymentPending)
                | (
                    Self::Pending | Self::PreSettled | Self::PaymentPending,
                    Self::Completed | Self::ForceCompleted
                )
        )
    }
}

impl FromStr for SessionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PRE_SETTLED" => Ok(Self::PreSettled),
            "PAYMENT_PENDING" => Ok(Self::PaymentPending),
            "COMPLETED" => Ok(Self::Completed),
            "FORCE_COMPLETED" => Ok(Self::ForceCompleted),
            _ => Err(DomainError::InvalidSessionStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What produced a lane event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventSource {
    /// Plate-recognition camera.
    #[default]
    Camera,
    /// Operator entry.
    Manual,
    /// Generated by another subsystem.
    System,
}

impl EventSource {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "CAMERA",
            Self::Manual => "MANUAL",
            Self::System => "SYSTEM",
        }
    }
}

impl FromStr for EventSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CAMERA" => Ok(Self::Camera),
            "MANUAL" => Ok(Self::Manual),
            "SYSTEM" => Ok(Self::System),
            _ => Err(DomainError::InvalidEventSource(s.to_string())),
        }
    }
}

/// Where and when a vehicle crossed a lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneContext {
    /// Zone of the lane, if known.
    pub zone_id: Option<i64>,
    /// Lane crossed, if known.
    pub lane_id: Option<i64>,
    /// Crossing time (UTC).
    pub time: OffsetDateTime,
    /// Snapshot reference.
    pub image_url: Option<String>,
    /// Event origin.
    pub source: EventSource,
}

/// A discount applied during settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    /// Reduction policy applied, if any.
    pub policy_id: Option<i64>,
    /// Display label.
    pub name: String,
    /// Amount taken off, in minor units.
    pub amount: i64,
}

/// A stored parking session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkingSession {
    /// Canonical identifier.
    pub session_id: i64,
    /// Site of the visit.
    pub site_id: i64,
    /// Normalized plate.
    pub car_number: String,
    /// Entry crossing.
    pub entry: LaneContext,
    /// Exit crossing, once known.
    pub exit: Option<LaneContext>,
    /// Vehicle class as reported by detection.
    pub vehicle_type: Option<String>,
    /// Current status.
    pub status: SessionStatus,
    /// Total fee.
    pub total_fee: i64,
    /// Discount amount.
    pub discount_fee: i64,
    /// Amount paid so far.
    pub paid_fee: i64,
    /// Discounts behind `discount_fee`.
    pub applied_discounts: Vec<AppliedDiscount>,
    /// Operator note.
    pub note: Option<String>,
    /// When the fee was settled ahead of exit.
    pub pre_settled_at: Option<OffsetDateTime>,
    /// Creation time.
    pub created_at: OffsetDateTime,
    /// Last modification time.
    pub updated_at: OffsetDateTime,
}

/// `total - discount - paid`, clamped to `0..=i64::MAX`.
///
/// Amounts are validated as non-negative only, so the arithmetic saturates.
#[must_use]
pub const fn outstanding_amount(total: i64, discount: i64, paid: i64) -> i64 {
    let due: i64 = total.saturating_sub(discount).saturating_sub(paid);
    if due < 0 { 0 } else { due }
}

impl ParkingSession {
    /// Whether the vehicle is still inside.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Outstanding amount: `total - discount - paid`, never below zero.
    #[must_use]
    pub const fn remaining_due(&self) -> i64 {
        outstanding_amount(self.total_fee, self.discount_fee, self.paid_fee)
    }

    /// Produces the session that results from applying `patch`.
    ///
    /// # Errors
    ///
    /// * `DomainError::SessionNotActive` if the session is terminal.
    /// * `DomainError::InvalidStatusTransition` for a status change outside
    ///   the state machine.
    /// * `DomainError::NegativeAmount` for negative fee values.
    pub fn apply_patch(&self, patch: &SessionPatch) -> Result<Self, DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::SessionNotActive {
                session_id: self.session_id,
                status: self.status,
            });
        }

        let mut next: Self = self.clone();

        match patch.status {
            Some(status) if status != self.status => {
                if !self.status.can_transition_to(status) {
                    return Err(DomainError::InvalidStatusTransition {
                        from: self.status,
                        to: status,
                    });
                }
                next.status = status;
            }
            _ => {}
        }
        if let Some(exit) = &patch.exit {
            next.exit = Some(exit.clone());
        }
        if let Some(total_fee) = patch.total_fee {
            validate_amount("total_fee", total_fee)?;
            next.total_fee = total_fee;
        }
        if let Some(discount_fee) = patch.discount_fee {
            validate_amount("discount_fee", discount_fee)?;
            next.discount_fee = discount_fee;
        }
        if let Some(paid_fee) = patch.paid_fee {
            validate_amount("paid_fee", paid_fee)?;
            next.paid_fee = paid_fee;
        }
        if let Some(discounts) = &patch.applied_discounts {
            for discount in discounts {
                validate_amount("applied_discounts.amount", discount.amount)?;
            }
            next.applied_discounts.clone_from(discounts);
        }
        if let Some(note) = &patch.note {
            next.note = validate_optional_text("note", note.as_deref())?;
        }
        if let Some(pre_settled_at) = patch.pre_settled_at {
            next.pre_settled_at = Some(pre_settled_at);
        }
        Ok(next)
    }
}

/// A validated session ready for insertion in `PENDING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    /// Site of the visit.
    pub site_id: i64,
    /// Normalized plate.
    pub car_number: String,
    /// Entry crossing.
    pub entry: LaneContext,
    /// Vehicle class.
    pub vehicle_type: Option<String>,
    /// Operator note.
    pub note: Option<String>,
}

impl NewSession {
    /// Validates raw entry data.
    ///
    /// # Errors
    ///
    /// Returns an error if the plate or free-text fields are invalid.
    pub fn new(
        site_id: i64,
        car_number: &str,
        entry: LaneContext,
        vehicle_type: Option<&str>,
        note: Option<&str>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            site_id,
            car_number: normalize_car_number(car_number)?,
            entry: LaneContext {
                image_url: validate_optional_text("image_url", entry.image_url.as_deref())?,
                ..entry
            },
            vehicle_type: validate_optional_text("vehicle_type", vehicle_type)?,
            note: validate_optional_text("note", note)?,
        })
    }
}

/// The mutable subset of a session.
///
/// Identity, plate, entry context, vehicle type and timestamps have no
/// field here and cannot be changed after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    /// Exit crossing.
    pub exit: Option<LaneContext>,
    /// Total fee.
    pub total_fee: Option<i64>,
    /// Discount amount.
    pub discount_fee: Option<i64>,
    /// Paid amount.
    pub paid_fee: Option<i64>,
    /// Target status.
    pub status: Option<SessionStatus>,
    /// Note; `Some(None)` clears it.
    pub note: Option<Option<String>>,
    /// Replacement discount list.
    pub applied_discounts: Option<Vec<AppliedDiscount>>,
    /// Pre-settlement time.
    pub pre_settled_at: Option<OffsetDateTime>,
}

/// Criteria for listing sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    /// Restrict to one status.
    pub status: Option<SessionStatus>,
    /// Restrict to active statuses.
    pub active_only: bool,
    /// Exact normalized plate.
    pub car_number: Option<String>,
}
