// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use parkops_domain::DomainError;

/// Errors that can occur during state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A domain rule was violated.
    DomainViolation(DomainError),
    /// The vehicle already has an active session at the site.
    ActiveSessionExists {
        /// Site of the visit.
        site_id: i64,
        /// Normalized plate.
        car_number: String,
        /// The session already open.
        session_id: i64,
    },
    /// The command names a session that was not supplied.
    SessionNotFound(i64),
    /// A blacklist selection targeted a policy that is not a blacklist of the
    /// site.
    NotABlacklist {
        /// The rejected policy.
        policy_id: i64,
    },
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainViolation(err) => write!(f, "Domain violation: {err}"),
            Self::ActiveSessionExists {
                site_id,
                car_number,
                session_id,
            } => write!(
                f,
                "Vehicle {car_number} already has active session {session_id} at site {site_id}"
            ),
            Self::SessionNotFound(id) => write!(f, "Session {id} not found"),
            Self::NotABlacklist { policy_id } => {
                write!(f, "Policy {policy_id} is not a blacklist policy of this site")
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        Self::DomainViolation(err)
    }
}
