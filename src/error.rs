use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::IntoResponse,
};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::state::quiz::QuizError;

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Player registry is at capacity.
    #[error("service unavailable: {0}")]
    Unavailable(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Caller exceeded the submission rate.
    #[error("too many submissions")]
    RateLimited {
        /// Time until the caller may submit again.
        retry_after: Duration,
    },
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<QuizError> for ServiceError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::Validation(message) => ServiceError::InvalidInput(message),
            QuizError::Conflict(message) => ServiceError::InvalidState(message),
            QuizError::RateLimited { retry_after } => ServiceError::RateLimited { retry_after },
            QuizError::NotFound(message) => ServiceError::NotFound(message),
            QuizError::Unavailable(message) => ServiceError::Unavailable(message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Client is sending too fast.
    #[error("too many requests: retry in {}s", whole_seconds(.retry_after))]
    TooManyRequests {
        /// Time until the client may retry.
        retry_after: Duration,
    },
    /// Service unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(message) => AppError::ServiceUnavailable(message),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::RateLimited { retry_after } => AppError::TooManyRequests { retry_after },
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

/// Round a retry delay up to whole seconds, never below one.
fn whole_seconds(duration: &Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let retry_after = match &self {
            AppError::TooManyRequests { retry_after } => Some(whole_seconds(retry_after)),
            _ => None,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        let mut response = (status, payload).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_errors_map_to_http_statuses() {
        let cases = [
            (QuizError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (QuizError::Conflict("busy".into()), StatusCode::CONFLICT),
            (QuizError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (
                QuizError::Unavailable("full".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            let response = AppError::from(ServiceError::from(err)).into_response();
            assert_eq!(response.status(), expected);
            assert!(response.headers().get(RETRY_AFTER).is_none());
        }
    }

    #[test]
    fn rate_limit_sets_retry_after_header() {
        let err = QuizError::RateLimited {
            retry_after: Duration::from_millis(3_200),
        };
        let response = AppError::from(ServiceError::from(err)).into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "4");
    }

    #[test]
    fn retry_after_never_rounds_to_zero() {
        assert_eq!(whole_seconds(&Duration::ZERO), 1);
        assert_eq!(whole_seconds(&Duration::from_secs(5)), 5);
    }
}
