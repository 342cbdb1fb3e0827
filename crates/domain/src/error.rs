// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::holiday::Holiday;
use crate::membership::PaymentHistory;
use crate::policy::PolicyType;
use crate::session::SessionStatus;

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A name field is empty or otherwise invalid.
    InvalidName {
        /// The kind of entity being named.
        entity: &'static str,
        /// Why the name was rejected.
        reason: String,
    },
    /// A vehicle plate is empty or contains invalid characters.
    InvalidCarNumber(String),
    /// A free-text field exceeds its limits.
    InvalidText {
        /// The field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// The timezone is not a known IANA identifier.
    InvalidTimezone(String),
    /// Failed to parse a calendar date.
    DateParseError {
        /// The invalid date string.
        date_string: String,
        /// The parsing error message.
        error: String,
    },
    /// Failed to parse or format a timestamp.
    TimestampError {
        /// The offending value.
        value: String,
        /// The underlying error message.
        error: String,
    },
    /// A date range ends before it starts.
    InvalidDateRange {
        /// Range start.
        start: time::Date,
        /// Range end.
        end: time::Date,
    },
    /// A monetary amount is negative.
    NegativeAmount {
        /// The field name.
        field: &'static str,
        /// The rejected amount.
        amount: i64,
    },
    /// A port number is outside the usable range.
    InvalidPort(u32),
    /// Unknown device kind.
    InvalidDeviceKind(String),
    /// Unknown lane direction.
    InvalidLaneDirection(String),
    /// Unknown policy type.
    InvalidPolicyType(String),
    /// A policy configuration document does not match its kind.
    InvalidPolicyConfig {
        /// The policy kind the document was interpreted as.
        policy_type: PolicyType,
        /// Why the document was rejected.
        reason: String,
    },
    /// More than one blacklist policy is marked selected in a single site.
    MultipleBlacklistSelected {
        /// Number of selected blacklist policies found.
        count: usize,
    },
    /// Two policies in one batch share a name.
    DuplicatePolicyName(String),
    /// System policies cannot be deleted.
    SystemPolicyProtected {
        /// The protected policy.
        policy_id: i64,
    },
    /// Unknown session status.
    InvalidSessionStatus(String),
    /// Unknown event source.
    InvalidEventSource(String),
    /// Unknown payment status.
    InvalidPaymentStatus(String),
    /// The requested status change is not part of the session state machine.
    InvalidStatusTransition {
        /// Current status.
        from: SessionStatus,
        /// Requested status.
        to: SessionStatus,
    },
    /// The session is terminal and cannot be changed.
    SessionNotActive {
        /// The session identifier.
        session_id: i64,
        /// Its terminal status.
        status: SessionStatus,
    },
    /// A holiday already occupies the candidate's calendar day.
    HolidayConflict {
        /// The holiday already stored.
        existing: Box<Holiday>,
    },
    /// A successful payment already covers part of the requested period.
    PeriodConflict {
        /// The overlapping payment record.
        existing: Box<PaymentHistory>,
    },
    /// Paging parameters are out of range.
    InvalidPage {
        /// Why the page request was rejected.
        reason: String,
    },
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName { entity, reason } => write!(f, "Invalid {entity} name: {reason}"),
            Self::InvalidCarNumber(msg) => write!(f, "Invalid car number: {msg}"),
            Self::InvalidText { field, reason } => write!(f, "Invalid {field}: {reason}"),
            Self::InvalidTimezone(tz) => write!(f, "Unknown timezone '{tz}'"),
            Self::DateParseError { date_string, error } => {
                write!(f, "Failed to parse date '{date_string}': {error}")
            }
            Self::TimestampError { value, error } => {
                write!(f, "Invalid timestamp '{value}': {error}")
            }
            Self::InvalidDateRange { start, end } => {
                write!(f, "Date range end {end} is before start {start}")
            }
            Self::NegativeAmount { field, amount } => {
                write!(f, "{field} must not be negative, got {amount}")
            }
            Self::InvalidPort(port) => write!(f, "Invalid port {port}: must be 1-65535"),
            Self::InvalidDeviceKind(kind) => write!(f, "Unknown device kind '{kind}'"),
            Self::InvalidLaneDirection(dir) => write!(f, "Unknown lane direction '{dir}'"),
            Self::InvalidPolicyType(kind) => write!(f, "Unknown policy type '{kind}'"),
            Self::InvalidPolicyConfig {
                policy_type,
                reason,
            } => write!(f, "Invalid {policy_type} policy config: {reason}"),
            Self::MultipleBlacklistSelected { count } => write!(
                f,
                "At most one blacklist policy may be selected per site, found {count}"
            ),
            Self::DuplicatePolicyName(name) => {
                write!(f, "Policy name '{name}' appears more than once")
            }
            Self::SystemPolicyProtected { policy_id } => {
                write!(f, "Policy {policy_id} is a system policy and cannot be deleted")
            }
            Self::InvalidSessionStatus(status) => write!(f, "Unknown session status '{status}'"),
            Self::InvalidEventSource(source) => write!(f, "Unknown event source '{source}'"),
            Self::InvalidPaymentStatus(status) => write!(f, "Unknown payment status '{status}'"),
            Self::InvalidStatusTransition { from, to } => {
                write!(f, "Session cannot move from {from} to {to}")
            }
            Self::SessionNotActive { session_id, status } => {
                write!(f, "Session {session_id} is already {status}")
            }
            Self::HolidayConflict { existing } => write!(
                f,
                "Holiday '{}' on {} ({}) already occupies this day",
                existing.name,
                existing.date,
                if existing.is_recurring {
                    "recurring"
                } else {
                    "one-time"
                }
            ),
            Self::PeriodConflict { existing } => write!(
                f,
                "Membership payment {} already covers {} to {}",
                existing.history_id, existing.start_date, existing.end_date
            ),
            Self::InvalidPage { reason } => write!(f, "Invalid page request: {reason}"),
        }
    }
}

impl std::error::Error for DomainError {}
