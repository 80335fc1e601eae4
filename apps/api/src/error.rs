use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use authforge_domain::AuthError;
use serde::Serialize;
use tracing::error;

/// HTTP wrapper around `AuthError`, mapping each variant to a status code
/// and a stable machine-readable `code` string. Internal errors are logged
/// with their original message and never surfaced to the caller.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        Self(value)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            AuthError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            AuthError::DuplicateEmail => (StatusCode::CONFLICT, "duplicate_email"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AuthError::InvalidRefresh => (StatusCode::UNAUTHORIZED, "invalid_refresh"),
            AuthError::InvalidMfa => (StatusCode::UNAUTHORIZED, "invalid_mfa"),
            AuthError::ChallengeExpired => (StatusCode::UNAUTHORIZED, "challenge_expired"),
            AuthError::TokenInvalid => (StatusCode::UNAUTHORIZED, "token_invalid"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired"),
            AuthError::AssertionInvalid => (StatusCode::UNAUTHORIZED, "assertion_invalid"),
            AuthError::EmailNotVerified => (StatusCode::FORBIDDEN, "email_not_verified"),
            AuthError::AlreadyVerified => (StatusCode::CONFLICT, "already_verified"),
            AuthError::AccountLocked => (StatusCode::FORBIDDEN, "account_locked"),
            AuthError::AccountInactive => (StatusCode::FORBIDDEN, "account_inactive"),
            AuthError::AlreadyEnabled => (StatusCode::CONFLICT, "already_enabled"),
            AuthError::NotEnabled => (StatusCode::CONFLICT, "not_enabled"),
            AuthError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            AuthError::Internal(source) => {
                error!(error = %source, "internal error in login protocol");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let message = if matches!(self.0, AuthError::Internal(_)) {
            "an internal error occurred".to_owned()
        } else {
            self.0.to_string()
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
