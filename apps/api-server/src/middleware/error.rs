//! Error handling - RFC 7807 compliant responses.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::Timelike;
use tally_core::LimitError;
use tally_core::ports::CacheError;
use tally_shared::ErrorResponse;
use std::fmt;

/// Application-level error type that converts to RFC 7807 responses.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    TooManyRequests {
        identity: String,
        allowed: u64,
        retry_after_secs: u64,
        request_id: Option<String>,
    },
    ServiceUnavailable(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::TooManyRequests { identity, .. } => {
                write!(f, "Too many requests for {}", identity)
            }
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::BadRequest(detail) => {
                HttpResponse::build(self.status_code()).json(ErrorResponse::bad_request(detail))
            }
            AppError::TooManyRequests {
                allowed,
                retry_after_secs,
                request_id,
                ..
            } => {
                let mut error = ErrorResponse::too_many_requests(*retry_after_secs);
                if let Some(id) = request_id {
                    error = error.with_request_id(id);
                }

                HttpResponse::build(self.status_code())
                    .insert_header(("X-RateLimit-Limit", allowed.to_string()))
                    .insert_header(("X-RateLimit-Remaining", "0"))
                    .insert_header(("Retry-After", retry_after_secs.to_string()))
                    .json(error)
            }
            AppError::ServiceUnavailable(detail) => HttpResponse::build(self.status_code())
                .json(ErrorResponse::service_unavailable(detail)),
            AppError::Internal(detail) => {
                // Log internal errors
                tracing::error!("Internal error: {}", detail);
                HttpResponse::build(self.status_code()).json(ErrorResponse::internal_error())
            }
        }
    }
}

// Conversion from limiter errors
impl From<LimitError> for AppError {
    fn from(err: LimitError) -> Self {
        match err {
            LimitError::InvalidIdentity(msg) => AppError::BadRequest(msg),
            LimitError::RateExceeded {
                identity, allowed, ..
            } => AppError::TooManyRequests {
                identity,
                allowed,
                retry_after_secs: seconds_to_next_minute(),
                request_id: None,
            },
            LimitError::Cache(e) => e.into(),
            e @ LimitError::BackendContract { .. } => AppError::Internal(e.to_string()),
        }
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        tracing::error!(error = %err, "Rate limit backend error");
        AppError::ServiceUnavailable("Rate limiting backend unavailable".to_string())
    }
}

/// Seconds until the current minute bucket closes, the earliest a window can
/// shrink. Always in `1..=60`.
pub fn seconds_to_next_minute() -> u64 {
    60 - u64::from(chrono::Utc::now().second().min(59))
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
