//! Signed token issuance and verification.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::claims::{Claims, TokenKind};
use crate::error::{AuthError, AuthResult};

// ─────────────────────────────────────────────────────────────────────────────
// TokenConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Token signing configuration.
///
/// Passed explicitly into [`TokenCodec::new`]; there is no ambient/global
/// secret, so tests can run with distinct secrets side by side.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Symmetric signing secret.
    pub secret: String,

    /// Signature algorithm.
    pub algorithm: Algorithm,

    /// Access token lifetime in seconds.
    pub access_ttl_secs: i64,

    /// Refresh token lifetime in seconds.
    pub refresh_ttl_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(), // Must be set by the caller
            algorithm: Algorithm::HS256,
            access_ttl_secs: 30 * 60,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn with_access_ttl_secs(mut self, secs: i64) -> Self {
        self.access_ttl_secs = secs;
        self
    }

    pub fn with_refresh_ttl_secs(mut self, secs: i64) -> Self {
        self.refresh_ttl_secs = secs;
        self
    }

    fn validate(&self) -> AuthResult<()> {
        if self.secret.is_empty() {
            return Err(AuthError::internal("token secret is not configured"));
        }
        if self.secret.len() < 32 {
            tracing::warn!("token secret is shorter than recommended (32 bytes)");
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TokenCodec
// ─────────────────────────────────────────────────────────────────────────────

/// Creates and verifies signed, expiring tokens.
///
/// Pure function of its inputs, the wall clock, and the configured secret;
/// holds no mutable state and is cheap to clone.
#[derive(Clone)]
pub struct TokenCodec {
    config: Arc<TokenConfig>,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl TokenCodec {
    pub fn new(config: TokenConfig) -> AuthResult<Self> {
        config.validate()?;

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(config.algorithm);
        validation.leeway = 0;
        validation.validate_aud = false;

        Ok(Self {
            config: Arc::new(config),
            encoding_key: Arc::new(encoding_key),
            decoding_key: Arc::new(decoding_key),
            validation: Arc::new(validation),
        })
    }

    /// Sign `claims` with an expiry of `now + ttl`.
    pub fn create_token(&self, mut claims: Claims, ttl: Duration) -> AuthResult<String> {
        claims.exp = (Utc::now() + ttl).timestamp();

        let header = Header::new(self.config.algorithm);
        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("failed to sign token: {e}")))
    }

    /// Issue an access token using the configured access TTL.
    pub fn create_access_token(&self, mut claims: Claims) -> AuthResult<String> {
        claims.kind = TokenKind::Access;
        self.create_token(claims, Duration::seconds(self.config.access_ttl_secs))
    }

    /// Issue a refresh token using the configured refresh TTL.
    pub fn create_refresh_token(&self, mut claims: Claims) -> AuthResult<String> {
        claims.kind = TokenKind::Refresh;
        self.create_token(claims, Duration::seconds(self.config.refresh_ttl_secs))
    }

    /// Validate signature and expiry, returning the decoded claims.
    ///
    /// Every failure mode (malformed structure, signature mismatch, missing
    /// claim, expiry) collapses to [`AuthError::TokenInvalid`]; a token whose
    /// expiry equals the current second is already expired.
    pub fn verify_token(&self, token: &str) -> AuthResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::TokenInvalid)?;

        if data.claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::TokenInvalid);
        }

        Ok(data.claims)
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.config.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.config.refresh_ttl_secs
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.config.algorithm)
            .field("access_ttl_secs", &self.config.access_ttl_secs)
            .field("refresh_ttl_secs", &self.config.refresh_ttl_secs)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
