// Error handling for the booking core
// Provides the crate-wide error type and its conversion into the JSON result envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error, warn};
use validator::ValidationErrorsKind;

use crate::availability::AvailabilityResult;

/// Message returned to callers whenever an infrastructure failure is hidden
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred. Please try again later.";

/// Main error type for pricing, availability and booking operations
///
/// Expected failures (validation, not found, unavailable slot) carry enough
/// structure for callers to branch on. Infrastructure failures are logged
/// and never exposed verbatim.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Malformed or out-of-range input, with per-field messages
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        errors: BTreeMap<String, String>,
    },

    /// A quote, booking, service or employee id did not resolve
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// The requested slot failed one of the availability gates
    #[error("Slot unavailable: {}", .0.message)]
    Unavailable(AvailabilityResult),

    /// The operation conflicts with the current state of a record
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Too many submissions from one client within the rolling hour
    #[error("Rate limit exceeded: {limit} per hour")]
    RateLimited { limit: u32 },

    /// Stored settings could not be parsed or failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias used across the crate
pub type BookingResult<T> = Result<T, BookingError>;

impl BookingError {
    /// Validation error for a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), message.clone());
        BookingError::Validation { message, errors }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        BookingError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// True for failures callers are expected to handle (bad input, missing
    /// records, unavailable slots). False for infrastructure failures.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            BookingError::Validation { .. }
                | BookingError::NotFound { .. }
                | BookingError::Unavailable(_)
                | BookingError::Conflict(_)
                | BookingError::RateLimited { .. }
        )
    }

    /// Machine-readable reason code for the response envelope
    pub fn reason(&self) -> &'static str {
        match self {
            BookingError::Validation { .. } => "validation_error",
            BookingError::NotFound { .. } => "not_found",
            BookingError::Unavailable(result) => result.reason.as_str(),
            BookingError::Conflict(_) => "conflict",
            BookingError::RateLimited { .. } => "rate_limited",
            BookingError::InvalidConfiguration(_)
            | BookingError::DatabaseError(_)
            | BookingError::JsonError(_)
            | BookingError::Internal(_) => "system_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::Validation { .. } => StatusCode::BAD_REQUEST,
            BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BookingError::Unavailable(_) | BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            BookingError::InvalidConfiguration(_)
            | BookingError::DatabaseError(_)
            | BookingError::JsonError(_)
            | BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the failure envelope, logging infrastructure errors and
    /// replacing their message with a generic one.
    pub fn to_failure(&self) -> FailureResponse {
        match self {
            BookingError::Validation { message, errors } => {
                debug!("Validation error: {} {:?}", message, errors);
                FailureResponse {
                    success: false,
                    message: message.clone(),
                    reason: self.reason().to_string(),
                    errors: Some(errors.clone()),
                    context: None,
                }
            }
            BookingError::NotFound { resource, id } => {
                debug!("{} not found: {}", resource, id);
                FailureResponse {
                    success: false,
                    message: format!("{} not found", resource),
                    reason: self.reason().to_string(),
                    errors: None,
                    context: None,
                }
            }
            BookingError::Unavailable(result) => {
                debug!("Slot unavailable: {}", result.reason);
                FailureResponse {
                    success: false,
                    message: result.message.clone(),
                    reason: self.reason().to_string(),
                    errors: None,
                    context: Some(result.context.clone()),
                }
            }
            BookingError::Conflict(message) => {
                warn!("Conflict: {}", message);
                FailureResponse {
                    success: false,
                    message: message.clone(),
                    reason: self.reason().to_string(),
                    errors: None,
                    context: None,
                }
            }
            BookingError::RateLimited { limit } => {
                warn!("Submission rate limit of {} per hour reached", limit);
                FailureResponse {
                    success: false,
                    message: "Too many requests. Please try again later.".to_string(),
                    reason: self.reason().to_string(),
                    errors: None,
                    context: None,
                }
            }
            other => {
                error!("Unexpected failure: {:?}", other);
                FailureResponse {
                    success: false,
                    message: GENERIC_FAILURE_MESSAGE.to_string(),
                    reason: self.reason().to_string(),
                    errors: None,
                    context: None,
                }
            }
        }
    }
}

/// Failure envelope: `{success: false, message, reason, errors?, context?}`
#[derive(Debug, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub message: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

/// Success envelope: `{success: true, message, data}`
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for SuccessResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.to_failure())).into_response()
    }
}

impl From<validator::ValidationErrors> for BookingError {
    fn from(errs: validator::ValidationErrors) -> Self {
        let mut errors = BTreeMap::new();
        collect_field_errors(&errs, &mut errors);

        BookingError::Validation {
            message: "Request validation failed".to_string(),
            errors,
        }
    }
}

/// Flattens field errors, including those of nested structs, into `field -> message`
fn collect_field_errors(errs: &validator::ValidationErrors, out: &mut BTreeMap<String, String>) {
    for (field, kind) in errs.errors() {
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let message = field_errors
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                out.insert(field.to_string(), message);
            }
            ValidationErrorsKind::Struct(nested) => collect_field_errors(nested, out),
            ValidationErrorsKind::List(items) => {
                for nested in items.values() {
                    collect_field_errors(nested, out);
                }
            }
        }
    }
}
