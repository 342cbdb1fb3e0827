// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use parkops_domain::{AppliedDiscount, LaneContext, NewSession, SessionPatch};

/// A command represents detection or operator intent as data only.
///
/// Commands are the only way to request session state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A vehicle was seen entering.
    OpenSession {
        /// Validated entry data.
        session: NewSession,
    },
    /// Settlement progress on an active session.
    AmendSession {
        /// The session to change.
        session_id: i64,
        /// Whitelisted field changes.
        patch: SessionPatch,
    },
    /// The vehicle left, or an operator closed the visit.
    CloseSession {
        /// The session to close.
        session_id: i64,
        /// Exit crossing.
        exit: LaneContext,
        /// Final total fee.
        total_fee: i64,
        /// Final discount amount.
        discount_fee: i64,
        /// Final paid amount.
        paid_fee: i64,
        /// Discounts behind `discount_fee`, when supplied.
        applied_discounts: Option<Vec<AppliedDiscount>>,
        /// Note; `Some(None)` clears it.
        note: Option<Option<String>>,
        /// Close as `FORCE_COMPLETED` instead of `COMPLETED`.
        forced: bool,
    },
}

impl Command {
    /// The action name recorded in the audit trail.
    #[must_use]
    pub const fn action_name(&self) -> &'static str {
        match self {
            Self::OpenSession { .. } => "OpenSession",
            Self::AmendSession { .. } => "AmendSession",
            Self::CloseSession { forced: false, .. } => "CloseSession",
            Self::CloseSession { forced: true, .. } => "ForceCloseSession",
        }
    }
}
