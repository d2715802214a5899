//! Error types with HTTP status code mapping.
//!
//! [`LogisticsError`] is the central error type. Each variant maps to a
//! numeric code and an HTTP status, and renders as a structured JSON body.
//! Collaborator and integrity failures carry internal detail for logs but
//! show callers only a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ShipmentId, ShipmentStatus, UserId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "invalid status transition: cannot move from created to dispatched",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Why an upload slot could not be issued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadSlotFailure {
    /// The owning shipment does not exist.
    #[error("shipment {0} not found")]
    UnknownShipment(ShipmentId),
    /// The object store refused or could not be reached.
    #[error("object store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category             | HTTP Status                      |
/// |-----------|----------------------|----------------------------------|
/// | 1000–1999 | Validation           | 400 / 401 / 413 / 415            |
/// | 2000–2999 | State / Not Found    | 404 Not Found / 409 Conflict     |
/// | 3000–3999 | Server / Collaborator| 500 / 502 / 503                  |
#[derive(Debug, thiserror::Error)]
pub enum LogisticsError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// File content type is not an accepted proof-of-delivery format.
    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    /// File exceeds the proof-of-delivery size limit.
    #[error("file too large: {size} bytes (maximum {max})")]
    FileTooLarge {
        /// Declared or actual size in bytes.
        size: u64,
        /// Permitted maximum in bytes.
        max: u64,
    },

    /// The request carried no authenticated actor.
    #[error("missing or malformed actor identity")]
    MissingActor,

    /// Shipment with the given id was not found.
    #[error("shipment not found: {0}")]
    ShipmentNotFound(ShipmentId),

    /// Requested status change is not the canonical next step.
    #[error("invalid status transition: cannot move from {from} to {to}")]
    InvalidTransition {
        /// Status the shipment was in.
        from: ShipmentStatus,
        /// Status that was requested.
        to: ShipmentStatus,
    },

    /// The user already has an attendance record for the date.
    #[error("user {user_id} already checked in on {date}")]
    DuplicateCheckIn {
        /// The user.
        user_id: UserId,
        /// The working date.
        date: NaiveDate,
    },

    /// The user has no open attendance session for the date.
    #[error("user {user_id} has no open session on {date}")]
    NoOpenSession {
        /// The user.
        user_id: UserId,
        /// The working date.
        date: NaiveDate,
    },

    /// Another shipment already uses the consignment number.
    #[error("consignment number already in use: {0}")]
    DuplicateConsignment(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Upload slot could not be issued.
    #[error("upload slot error: {0}")]
    UploadSlot(UploadSlotFailure),

    /// Transferring bytes to the object store failed.
    #[error("upload transfer failed: {0}")]
    UploadTransfer(String),

    /// A stored invariant does not hold (status log vs. current status).
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LogisticsError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::UnsupportedFile(_) => 1002,
            Self::FileTooLarge { .. } => 1003,
            Self::MissingActor => 1005,
            Self::ShipmentNotFound(_) => 2001,
            Self::InvalidTransition { .. } => 2002,
            Self::DuplicateCheckIn { .. } => 2003,
            Self::NoOpenSession { .. } => 2004,
            Self::DuplicateConsignment(_) => 2005,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::UploadSlot(_) => 3002,
            Self::UploadTransfer(_) => 3003,
            Self::IntegrityViolation(_) => 3900,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedFile(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MissingActor => StatusCode::UNAUTHORIZED,
            Self::ShipmentNotFound(_)
            | Self::UploadSlot(UploadSlotFailure::UnknownShipment(_)) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. }
            | Self::DuplicateCheckIn { .. }
            | Self::NoOpenSession { .. }
            | Self::DuplicateConsignment(_) => StatusCode::CONFLICT,
            Self::Persistence(_) | Self::UploadSlot(UploadSlotFailure::StoreUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::UploadTransfer(_) => StatusCode::BAD_GATEWAY,
            Self::IntegrityViolation(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to callers.
    ///
    /// Collaborator and integrity failures hide their internal detail.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Persistence(_) => "storage is temporarily unavailable".to_string(),
            Self::UploadSlot(UploadSlotFailure::StoreUnavailable(_)) => {
                "file storage is temporarily unavailable".to_string()
            }
            Self::UploadTransfer(_) => "file upload failed, please retry".to_string(),
            Self::IntegrityViolation(_) => {
                "shipment history is inconsistent; the incident has been logged".to_string()
            }
            Self::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for LogisticsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.user_message(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
