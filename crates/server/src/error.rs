// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! HTTP error mapping and startup errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parkops_api::ApiError;
use parkops_persistence::PersistenceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The database could not be opened or configured.
    #[error("Storage initialization failed: {0}")]
    Storage(#[from] PersistenceError),
    /// The bind address and port do not form a socket address.
    #[error("Invalid bind address: {0}")]
    BindAddress(#[from] std::net::AddrParseError),
    /// The listener failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `true`.
    pub error: bool,
    /// Machine-readable error kind.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// The conflicting record for conflict errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// HTTP error wrapper that implements `IntoResponse`.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    details: Option<Value>,
}

impl HttpError {
    const fn new(status: StatusCode, kind: &'static str, message: String) -> Self {
        Self {
            status,
            kind,
            message,
            details: None,
        }
    }

    fn with_details<T: Serialize>(mut self, details: &T) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// A malformed request that never reached the API layer.
    pub const fn bad_request(message: String) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    /// Storage could not be reached within the request deadline.
    pub const fn unavailable(message: String) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", message)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            kind: self.kind.to_string(),
            message: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let message: String = err.to_string();
        match err {
            ApiError::InvalidInput { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
            }
            ApiError::DomainRuleViolation { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "domain_rule_violation",
                message,
            ),
            ApiError::ResourceNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "not_found", message)
            }
            ApiError::ParentNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "parent_not_found", message)
            }
            ApiError::NameConflict { .. } => {
                Self::new(StatusCode::CONFLICT, "name_conflict", message)
            }
            ApiError::HolidayConflict { existing } => {
                Self::new(StatusCode::CONFLICT, "holiday_conflict", message)
                    .with_details(&existing)
            }
            ApiError::PeriodConflict { existing } => {
                Self::new(StatusCode::CONFLICT, "period_conflict", message)
                    .with_details(&existing)
            }
            ApiError::ActiveSessionExists { session_id, .. } => {
                Self::new(StatusCode::CONFLICT, "active_session_exists", message)
                    .with_details(&serde_json::json!({ "session_id": session_id }))
            }
            ApiError::StorageUnavailable { .. } => {
                warn!(error = %message, "Storage unavailable");
                Self::unavailable(message)
            }
            ApiError::Internal { .. } => {
                error!(error = %message, "Internal error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            }
        }
    }
}
