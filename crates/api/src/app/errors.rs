//! Consistent JSON error responses.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use aegis_auth::AuthError;
use aegis_core::DomainError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Map an auth-core failure onto the transport.
pub fn auth_error_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", err.to_string())
        }
        AuthError::TokenInvalid => {
            json_error(StatusCode::UNAUTHORIZED, "token_invalid", err.to_string())
        }
        AuthError::WrongTokenType => {
            json_error(StatusCode::UNAUTHORIZED, "wrong_token_type", err.to_string())
        }
        AuthError::UserNotFound => {
            json_error(StatusCode::NOT_FOUND, "user_not_found", err.to_string())
        }
        AuthError::AccountDisabled => {
            json_error(StatusCode::FORBIDDEN, "account_disabled", err.to_string())
        }
        AuthError::PermissionDenied(reason) => {
            json_error(StatusCode::FORBIDDEN, "permission_denied", reason)
        }
        AuthError::RoleDenied(reason) => {
            json_error(StatusCode::FORBIDDEN, "role_denied", reason)
        }
        AuthError::Internal(msg) => {
            tracing::error!(error = %msg, "auth subsystem failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
    }
}

/// Map a store/service failure onto the transport.
pub fn domain_error_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation { .. } => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}
