// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the API layer.

use parkops::CoreError;
use parkops_domain::DomainError;
use parkops_persistence::PersistenceError;

use crate::request_response::{HolidayInfo, PaymentInfo};

/// API-level errors.
///
/// These are distinct from domain, core and persistence errors and
/// represent the API contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A domain rule was violated.
    DomainRuleViolation {
        /// The rule that was violated.
        rule: String,
        /// A human-readable description of the violation.
        message: String,
    },
    /// Invalid input was provided.
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A human-readable description of the error.
        message: String,
    },
    /// A requested resource was not found.
    ResourceNotFound {
        /// The type of resource that was not found.
        resource_type: String,
        /// A human-readable description of what was not found.
        message: String,
    },
    /// A referenced parent resource does not exist.
    ParentNotFound {
        /// The type of the missing parent.
        resource_type: String,
        /// A human-readable description of what was not found.
        message: String,
    },
    /// A name is already taken within its parent.
    NameConflict {
        /// The type of resource whose name collided.
        resource_type: String,
        /// A human-readable description of the collision.
        message: String,
    },
    /// A holiday already occupies the requested calendar day.
    HolidayConflict {
        /// The stored holiday.
        existing: HolidayInfo,
    },
    /// A successful payment already covers part of the requested period.
    PeriodConflict {
        /// The overlapping payment.
        existing: PaymentInfo,
    },
    /// The vehicle already has an active session at the site.
    ActiveSessionExists {
        /// The session already open.
        session_id: i64,
        /// Normalized plate.
        car_number: String,
    },
    /// Storage could not be reached within the request deadline.
    StorageUnavailable {
        /// A description of the failure.
        message: String,
    },
    /// An internal error occurred.
    Internal {
        /// A description of the internal error.
        message: String,
    },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainRuleViolation { rule, message } => {
                write!(f, "Domain rule violation ({rule}): {message}")
            }
            Self::InvalidInput { field, message } => {
                write!(f, "Invalid input for field '{field}': {message}")
            }
            Self::ResourceNotFound {
                resource_type,
                message,
            } => {
                write!(f, "{resource_type} not found: {message}")
            }
            Self::ParentNotFound {
                resource_type,
                message,
            } => {
                write!(f, "Parent {resource_type} not found: {message}")
            }
            Self::NameConflict {
                resource_type,
                message,
            } => {
                write!(f, "{resource_type} name conflict: {message}")
            }
            Self::HolidayConflict { existing } => write!(
                f,
                "Holiday conflict: '{}' ({}) already occupies {}",
                existing.name, existing.holiday_id, existing.date
            ),
            Self::PeriodConflict { existing } => write!(
                f,
                "Period conflict: payment {} already covers {} to {}",
                existing.history_id, existing.start_date, existing.end_date
            ),
            Self::ActiveSessionExists {
                session_id,
                car_number,
            } => write!(
                f,
                "Active session exists: {car_number} is already parked in session {session_id}"
            ),
            Self::StorageUnavailable { message } => {
                write!(f, "Storage unavailable: {message}")
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

fn invalid_input(field: &str, message: String) -> ApiError {
    ApiError::InvalidInput {
        field: field.to_string(),
        message,
    }
}

/// Translates a domain error into an API error.
///
/// This translation is explicit and ensures domain errors are not leaked directly.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    let message: String = err.to_string();
    match err {
        DomainError::InvalidName { .. } => invalid_input("name", message),
        DomainError::InvalidCarNumber(_) => invalid_input("car_number", message),
        DomainError::InvalidText { field, .. } | DomainError::NegativeAmount { field, .. } => {
            invalid_input(field, message)
        }
        DomainError::InvalidTimezone(_) => invalid_input("timezone", message),
        DomainError::DateParseError { .. } => invalid_input("date", message),
        DomainError::TimestampError { .. } => invalid_input("timestamp", message),
        DomainError::InvalidDateRange { .. } => invalid_input("end_date", message),
        DomainError::InvalidPort(_) => invalid_input("port", message),
        DomainError::InvalidDeviceKind(_) => invalid_input("kind", message),
        DomainError::InvalidLaneDirection(_) => invalid_input("direction", message),
        DomainError::InvalidPolicyType(_) => invalid_input("policy_type", message),
        DomainError::InvalidPolicyConfig { .. } => invalid_input("config", message),
        DomainError::InvalidSessionStatus(_) | DomainError::InvalidPaymentStatus(_) => {
            invalid_input("status", message)
        }
        DomainError::InvalidEventSource(_) => invalid_input("source", message),
        DomainError::InvalidPage { .. } => invalid_input("page", message),
        DomainError::MultipleBlacklistSelected { .. } => ApiError::DomainRuleViolation {
            rule: String::from("single_selected_blacklist"),
            message,
        },
        DomainError::DuplicatePolicyName(_) => ApiError::NameConflict {
            resource_type: String::from("Policy"),
            message,
        },
        DomainError::SystemPolicyProtected { .. } => ApiError::DomainRuleViolation {
            rule: String::from("system_policy_protected"),
            message,
        },
        DomainError::InvalidStatusTransition { .. } => ApiError::DomainRuleViolation {
            rule: String::from("session_state_machine"),
            message,
        },
        DomainError::SessionNotActive { .. } => ApiError::DomainRuleViolation {
            rule: String::from("session_not_active"),
            message,
        },
        DomainError::HolidayConflict { existing } => ApiError::HolidayConflict {
            existing: HolidayInfo::from(existing.as_ref()),
        },
        DomainError::PeriodConflict { existing } => ApiError::PeriodConflict {
            existing: PaymentInfo::from(existing.as_ref()),
        },
    }
}

/// Translates a core error into an API error.
///
/// A blacklist selection aimed at a policy that is not one of the site's
/// blacklists reports the target as missing.
#[must_use]
pub fn translate_core_error(err: CoreError) -> ApiError {
    match err {
        CoreError::DomainViolation(domain_err) => translate_domain_error(domain_err),
        CoreError::ActiveSessionExists {
            car_number,
            session_id,
            ..
        } => ApiError::ActiveSessionExists {
            session_id,
            car_number,
        },
        CoreError::SessionNotFound(id) => ApiError::ResourceNotFound {
            resource_type: String::from("Session"),
            message: format!("Session {id} does not exist"),
        },
        CoreError::NotABlacklist { policy_id } => ApiError::ResourceNotFound {
            resource_type: String::from("Blacklist policy"),
            message: format!("Policy {policy_id} is not a blacklist policy of this site"),
        },
    }
}

fn capitalize(entity: &str) -> String {
    let mut chars = entity.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Translates a persistence error into an API error.
///
/// Storage constraint failures land in the same taxonomy as the
/// application-level checks. Lock and connection failures become
/// `StorageUnavailable`.
#[must_use]
pub fn translate_persistence_error(err: PersistenceError) -> ApiError {
    match err {
        PersistenceError::NotFound { entity, id } => ApiError::ResourceNotFound {
            resource_type: capitalize(entity),
            message: format!("{} {id} does not exist", capitalize(entity)),
        },
        PersistenceError::ParentNotFound { entity, id } => ApiError::ParentNotFound {
            resource_type: capitalize(entity),
            message: format!("{} {id} does not exist", capitalize(entity)),
        },
        PersistenceError::NameConflict { entity, name } => ApiError::NameConflict {
            resource_type: capitalize(entity),
            message: format!("A {entity} named '{name}' already exists"),
        },
        PersistenceError::HolidayConflict(existing) => ApiError::HolidayConflict {
            existing: HolidayInfo::from(existing.as_ref()),
        },
        PersistenceError::PeriodConflict(existing) => ApiError::PeriodConflict {
            existing: PaymentInfo::from(existing.as_ref()),
        },
        PersistenceError::Rejected(core_err) => translate_core_error(core_err),
        PersistenceError::UniqueViolation(message) => ApiError::NameConflict {
            resource_type: String::from("Record"),
            message,
        },
        PersistenceError::ForeignKeyViolation(message) => ApiError::ParentNotFound {
            resource_type: String::from("Record"),
            message,
        },
        PersistenceError::CheckViolation(message) => invalid_input("value", message),
        PersistenceError::ConstraintViolation(message) => ApiError::DomainRuleViolation {
            rule: String::from("storage_constraint"),
            message,
        },
        PersistenceError::DatabaseError(message)
            if message.contains("locked") || message.contains("busy") =>
        {
            ApiError::StorageUnavailable { message }
        }
        PersistenceError::DatabaseConnectionFailed(message) => {
            ApiError::StorageUnavailable { message }
        }
        other => ApiError::Internal {
            message: other.to_string(),
        },
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        translate_domain_error(err)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        translate_core_error(err)
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        translate_persistence_error(err)
    }
}
