use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::{
    dao::{generator::GenerationError, storage::StorageError},
    state::{challenge::CatalogError, session::SessionError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Request carries no usable session cookie.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Request body could not be parsed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Session lookup, validation or mutation failed.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Catalog lookup failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// Text generation failed before anything was streamed.
    #[error("generation failed")]
    Generation(#[from] GenerationError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::ExpectationFailed(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Missing or outdated session.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Session unknown, cooling down, or busy.
    #[error("request timeout: {0}")]
    RequestTimeout(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Input refused by a game rule.
    #[error("expectation failed: {0}")]
    ExpectationFailed(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        let message = err.to_string();
        match err {
            SessionError::NotFound
            | SessionError::CoolingDown { .. }
            | SessionError::InFlight => AppError::RequestTimeout(message),
            SessionError::Stale => AppError::Unauthorized(message),
            SessionError::EmptyInput
            | SessionError::AlreadyComplete
            | SessionError::NotContinuation
            | SessionError::NotComplete => AppError::ExpectationFailed(message),
            SessionError::NoMoreChallenges => AppError::Conflict(message),
            SessionError::Catalog(_) | SessionError::Invariant(_) => {
                error!(error = %message, "session state violated an invariant");
                AppError::Internal(message)
            }
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::Session(err) => err.into(),
            ServiceError::Catalog(err) => {
                error!(error = %err, "catalog lookup failed");
                AppError::Internal(err.to_string())
            }
            ServiceError::Generation(err) => {
                error!(error = %err, "text generation failed");
                AppError::Internal("generation failed".into())
            }
        }
    }
}

/// JSON body attached to every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human readable reason.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::RequestTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ExpectationFailed(_) => StatusCode::EXPECTATION_FAILED,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn session_errors_keep_game_status_codes() {
        assert_eq!(status_of(SessionError::NotFound), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(status_of(SessionError::Stale), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(SessionError::CoolingDown { remaining_ms: 10 }),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(status_of(SessionError::InFlight), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(status_of(SessionError::EmptyInput), StatusCode::EXPECTATION_FAILED);
        assert_eq!(
            status_of(SessionError::AlreadyComplete),
            StatusCode::EXPECTATION_FAILED
        );
        assert_eq!(
            status_of(SessionError::NotContinuation),
            StatusCode::EXPECTATION_FAILED
        );
        assert_eq!(status_of(SessionError::NoMoreChallenges), StatusCode::CONFLICT);
        assert_eq!(
            status_of(SessionError::Invariant("broken".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn service_errors_map_through() {
        assert_eq!(
            status_of(ServiceError::Unauthorized("no cookie".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ServiceError::InvalidInput("bad json".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::Generation(GenerationError::Empty)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_of(ServiceError::Degraded), StatusCode::SERVICE_UNAVAILABLE);
    }
}
