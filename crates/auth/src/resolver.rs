//! Principal resolution from tokens and login credentials.

use std::collections::HashSet;
use std::sync::Arc;

use aegis_core::UserId;

use crate::claims::TokenKind;
use crate::error::{AuthError, AuthResult};
use crate::password::verify_password;
use crate::principal::Principal;
use crate::token::TokenCodec;

// ─────────────────────────────────────────────────────────────────────────────
// Collaborator traits
// ─────────────────────────────────────────────────────────────────────────────

/// A directory entry carrying the stored credential digest next to the identity.
#[derive(Debug, Clone)]
pub struct Credential {
    pub principal: Principal,
    pub password_digest: String,
}

/// Identity lookup collaborator (storage-agnostic).
pub trait UserDirectory: Send + Sync {
    fn find_by_id(&self, id: UserId) -> Option<Principal>;
    fn find_by_username(&self, username: &str) -> Option<Credential>;
}

/// Effective grant lookup collaborator.
///
/// Both sets are computed fresh per call from the identity's role assignments;
/// the permission parent/child tree plays no part in them.
pub trait GrantSource: Send + Sync {
    fn role_codes(&self, user: UserId) -> HashSet<String>;
    fn permission_codes(&self, user: UserId) -> HashSet<String>;
}

// ─────────────────────────────────────────────────────────────────────────────
// PrincipalResolver
// ─────────────────────────────────────────────────────────────────────────────

/// Maps bearer tokens and login credentials to a [`Principal`].
///
/// Every failure surfaces as one of a small stable set:
/// `InvalidCredentials`, `TokenInvalid`, `WrongTokenType`, `UserNotFound`,
/// `AccountDisabled`. Decode-layer errors never escape in any other shape.
#[derive(Clone)]
pub struct PrincipalResolver {
    codec: TokenCodec,
    directory: Arc<dyn UserDirectory>,
}

impl PrincipalResolver {
    pub fn new(codec: TokenCodec, directory: Arc<dyn UserDirectory>) -> Self {
        Self { codec, directory }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verify a username/password pair.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable to the
    /// caller.
    pub fn authenticate(&self, username: &str, password: &str) -> AuthResult<Principal> {
        let Some(credential) = self.directory.find_by_username(username) else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &credential.password_digest) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(credential.principal)
    }

    /// Resolve a bearer token of the expected kind to an active principal.
    pub fn resolve(&self, token: &str, expected: TokenKind) -> AuthResult<Principal> {
        let claims = self.codec.verify_token(token)?;

        if claims.kind != expected {
            return Err(AuthError::WrongTokenType);
        }

        let principal = self
            .directory
            .find_by_id(claims.uid)
            .ok_or(AuthError::UserNotFound)?;

        if !principal.is_active {
            return Err(AuthError::AccountDisabled);
        }

        Ok(principal)
    }

    /// Like [`PrincipalResolver::resolve`], but any failure becomes `None`
    /// (endpoints that also serve anonymous callers).
    pub fn resolve_optional(&self, token: &str) -> Option<Principal> {
        self.resolve(token, TokenKind::Access).ok()
    }
}

impl std::fmt::Debug for PrincipalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalResolver")
            .field("codec", &self.codec)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
