//! Authentication/authorization error taxonomy.
//!
//! Every failure the core can surface is one of these variants; resolver and
//! codec internals never leak library errors past this boundary.

use thiserror::Error;

/// Result type used across the auth core.
pub type AuthResult<T> = Result<T, AuthError>;

/// Terminal authentication/authorization failure for the current request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown username or wrong password; the two cases are deliberately
    /// indistinguishable.
    #[error("incorrect username or password")]
    InvalidCredentials,

    /// Malformed, tampered, or expired token (collapsed to one kind).
    #[error("token has expired or is invalid")]
    TokenInvalid,

    /// Structurally valid token presented in the wrong context
    /// (e.g. a refresh token at an access-only boundary).
    #[error("invalid token type")]
    WrongTokenType,

    /// Token subject no longer maps to a user record.
    #[error("user not found")]
    UserNotFound,

    /// The account exists but is not active.
    #[error("account is disabled")]
    AccountDisabled,

    /// A permission requirement was not met.
    #[error("{0}")]
    PermissionDenied(String),

    /// A role requirement was not met.
    #[error("{0}")]
    RoleDenied(String),

    /// A crypto/subsystem failure that is not the caller's fault.
    #[error("internal auth failure: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Human-readable denial reason, used when combinators aggregate failures.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
