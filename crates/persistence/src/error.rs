// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use diesel::result::DatabaseErrorKind;
use parkops::CoreError;
use parkops_domain::{DomainError, Holiday, PaymentHistory};

/// Message raised by the holiday triggers.
pub(crate) const HOLIDAY_CONFLICT_TRIGGER: &str = "holiday_conflict";
/// Message raised by the payment overlap triggers.
pub(crate) const PERIOD_CONFLICT_TRIGGER: &str = "period_conflict";

/// Errors that can occur during persistence operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    DatabaseError(String),
    /// Database connection failed.
    #[error("Database connection failed: {0}")]
    DatabaseConnectionFailed(String),
    /// Database migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),
    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),
    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// Initialization error.
    #[error("Initialization error: {0}")]
    InitializationError(String),
    /// Foreign key enforcement is not enabled.
    #[error("Foreign key enforcement is not enabled")]
    ForeignKeyEnforcementNotEnabled,
    /// The addressed record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Requested identifier.
        id: i64,
    },
    /// A query expected a row and found none.
    #[error("Record not found")]
    RecordNotFound,
    /// A referenced parent record does not exist.
    #[error("Parent {entity} {id} does not exist")]
    ParentNotFound {
        /// Kind of parent.
        entity: &'static str,
        /// Referenced identifier.
        id: i64,
    },
    /// A `(parent, name)` uniqueness rule was violated.
    #[error("A {entity} named '{name}' already exists")]
    NameConflict {
        /// Kind of record.
        entity: &'static str,
        /// The conflicting name.
        name: String,
    },
    /// A unique constraint not covered by a more specific variant.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    /// A foreign key constraint not covered by a more specific variant.
    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    /// A check constraint rejected a value.
    #[error("Check constraint violated: {0}")]
    CheckViolation(String),
    /// The candidate holiday collides with a stored one.
    #[error("Holiday '{}' on {} already occupies this day", .0.name, .0.date)]
    HolidayConflict(Box<Holiday>),
    /// The payment period overlaps a stored successful payment.
    #[error(
        "Membership payment {} already covers {} to {}",
        .0.history_id, .0.start_date, .0.end_date
    )]
    PeriodConflict(Box<PaymentHistory>),
    /// A storage trigger rejected the change without an identifiable record.
    #[error("Storage rule rejected the change: {0}")]
    ConstraintViolation(String),
    /// A domain or transition rule rejected the request.
    #[error(transparent)]
    Rejected(#[from] CoreError),
    /// A stored row could not be mapped back to a domain value.
    #[error("Stored row is corrupt: {0}")]
    CorruptRow(String),
}

impl PersistenceError {
    /// Maps a unique violation to `NameConflict` for `entity`.
    pub(crate) fn on_unique<E: Into<Self>>(
        entity: &'static str,
        name: &str,
    ) -> impl FnOnce(E) -> Self + use<E> {
        let name: String = name.to_string();
        move |err| match err.into() {
            Self::UniqueViolation(_) => Self::NameConflict { entity, name },
            other => other,
        }
    }

    /// Maps a foreign key violation to `ParentNotFound` for `entity`.
    pub(crate) fn on_foreign_key<E: Into<Self>>(
        entity: &'static str,
        id: i64,
    ) -> impl FnOnce(E) -> Self {
        move |err| match err.into() {
            Self::ForeignKeyViolation(_) => Self::ParentNotFound { entity, id },
            other => other,
        }
    }

    /// Maps a missing row to `NotFound` for `entity`.
    pub(crate) fn on_missing<E: Into<Self>>(
        entity: &'static str,
        id: i64,
    ) -> impl FnOnce(E) -> Self {
        move |err| match err.into() {
            Self::RecordNotFound => Self::NotFound { entity, id },
            other => other,
        }
    }

    pub(crate) fn corrupt(err: &DomainError) -> Self {
        Self::CorruptRow(err.to_string())
    }
}

impl From<diesel::result::Error> for PersistenceError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Self::RecordNotFound,
            diesel::result::Error::DatabaseError(kind, info) => {
                let message: String = info.message().to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(message),
                    DatabaseErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(message),
                    DatabaseErrorKind::CheckViolation => Self::CheckViolation(message),
                    _ if message.contains(HOLIDAY_CONFLICT_TRIGGER)
                        || message.contains(PERIOD_CONFLICT_TRIGGER) =>
                    {
                        Self::ConstraintViolation(message)
                    }
                    _ => Self::DatabaseError(message),
                }
            }
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

impl From<diesel::ConnectionError> for PersistenceError {
    fn from(err: diesel::ConnectionError) -> Self {
        Self::DatabaseConnectionFailed(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<DomainError> for PersistenceError {
    fn from(err: DomainError) -> Self {
        Self::Rejected(CoreError::DomainViolation(err))
    }
}
