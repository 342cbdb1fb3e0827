// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Members, their payment history, and the interval rules over it.
//!
//! All periods are closed intervals: both `start_date` and `end_date` are
//! covered days. Only `SUCCESS` records take part in overlap detection and
//! effective-membership ranking.

use crate::error::DomainError;
use std::cmp::Reverse;
use std::str::FromStr;
use time::{Date, OffsetDateTime};

/// A registered vehicle owner at a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Canonical identifier.
    pub member_id: i64,
    /// Owning site.
    pub site_id: i64,
    /// Member name.
    pub name: String,
    /// Normalized vehicle plate, unique within the site.
    pub car_number: String,
    /// Contact number.
    pub phone: Option<String>,
}

/// Outcome of a membership payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    /// The payment went through; the period is covered.
    Success,
    /// The payment was voided; the period is not covered.
    Canceled,
}

impl PaymentStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Canceled => "CANCELED",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(Self::Success),
            "CANCELED" => Ok(Self::Canceled),
            _ => Err(DomainError::InvalidPaymentStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One membership payment covering a validity period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentHistory {
    /// Canonical identifier.
    pub history_id: i64,
    /// The paying member.
    pub member_id: i64,
    /// The membership policy purchased.
    pub policy_id: i64,
    /// Amount paid in minor currency units.
    pub amount: i64,
    /// Payment outcome.
    pub status: PaymentStatus,
    /// First covered day.
    pub start_date: Date,
    /// Last covered day.
    pub end_date: Date,
    /// When the payment was recorded.
    pub paid_at: OffsetDateTime,
}

impl PaymentHistory {
    /// Whether this record counts toward coverage.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == PaymentStatus::Success
    }

    /// Whether `day` falls inside the covered period.
    #[must_use]
    pub fn contains(&self, day: Date) -> bool {
        self.start_date <= day && day <= self.end_date
    }
}

/// Where the effective record sits relative to the reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectiveState {
    /// The period contains the reference day.
    Active,
    /// The period starts after the reference day.
    Upcoming,
    /// The period ended before the reference day.
    Expired,
}

impl EffectiveState {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Upcoming => "UPCOMING",
            Self::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for EffectiveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single payment record judged relevant for a reference day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveMembership {
    /// The selected record.
    pub history: PaymentHistory,
    /// Its position relative to the reference day.
    pub state: EffectiveState,
}

/// Validates that a period does not end before it starts.
///
/// # Errors
///
/// Returns `DomainError::InvalidDateRange` if `end < start`.
pub fn validate_period(start: Date, end: Date) -> Result<(), DomainError> {
    if end < start {
        return Err(DomainError::InvalidDateRange { start, end });
    }
    Ok(())
}

/// Closed-interval intersection test.
#[must_use]
pub fn intervals_overlap(a_start: Date, a_end: Date, b_start: Date, b_end: Date) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// Finds a `SUCCESS` record whose period intersects `[start, end]`.
///
/// When several overlap, the one starting earliest is returned.
#[must_use]
pub fn find_overlapping_history(
    records: &[PaymentHistory],
    start: Date,
    end: Date,
) -> Option<&PaymentHistory> {
    records
        .iter()
        .filter(|r| r.is_success())
        .filter(|r| intervals_overlap(r.start_date, r.end_date, start, end))
        .min_by_key(|r| (r.start_date, r.history_id))
}

/// Selects the effective membership record for `today`.
///
/// Priority is Active, then Upcoming, then Expired:
///
/// 1. A record containing `today`. Ties go to the latest end date.
/// 2. Otherwise the record with the earliest start after `today`.
/// 3. Otherwise the record with the latest end date.
///
/// Remaining ties are broken by identifier so the selection is stable.
#[must_use]
pub fn find_effective_history(
    records: &[PaymentHistory],
    today: Date,
) -> Option<EffectiveMembership> {
    let successful = || records.iter().filter(|r| r.is_success());

    let pick = |history: &PaymentHistory, state: EffectiveState| EffectiveMembership {
        history: history.clone(),
        state,
    };

    if let Some(active) = successful()
        .filter(|r| r.contains(today))
        .max_by_key(|r| (r.end_date, r.start_date, r.history_id))
    {
        return Some(pick(active, EffectiveState::Active));
    }

    if let Some(upcoming) = successful()
        .filter(|r| r.start_date > today)
        .min_by_key(|r| (r.start_date, Reverse(r.end_date), r.history_id))
    {
        return Some(pick(upcoming, EffectiveState::Upcoming));
    }

    successful()
        .filter(|r| r.end_date < today)
        .max_by_key(|r| (r.end_date, r.start_date, r.history_id))
        .map(|expired| pick(expired, EffectiveState::Expired))
}
