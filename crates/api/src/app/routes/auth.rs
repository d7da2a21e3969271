//! Login, token refresh, and current-user endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use aegis_auth::{Claims, TokenKind};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenIssued {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenRefreshed {
    pub access_token: String,
    pub expires_in: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Routers
// ─────────────────────────────────────────────────────────────────────────────

pub fn public_router() -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn protected_router() -> Router {
    Router::new().route("/auth/me", get(me))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/auth/login - exchange credentials for an access/refresh pair.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    let principal = match services.resolver.authenticate(&body.username, &body.password) {
        Ok(principal) => principal,
        Err(e) => return errors::auth_error_response(e),
    };

    services.users.touch_last_login(principal.id);

    let claims = Claims::new(principal.id, principal.username.clone(), TokenKind::Access);
    let issued = services
        .codec()
        .create_access_token(claims.clone())
        .and_then(|access_token| {
            let refresh_token = services.codec().create_refresh_token(claims)?;
            Ok(TokenIssued {
                access_token,
                refresh_token,
                token_type: "bearer",
                expires_in: services.codec().access_ttl_secs(),
                refresh_expires_in: services.codec().refresh_ttl_secs(),
            })
        });

    match issued {
        Ok(tokens) => {
            tracing::info!(username = %principal.username, "login succeeded");
            (StatusCode::OK, Json(tokens)).into_response()
        }
        Err(e) => errors::auth_error_response(e),
    }
}

/// POST /api/auth/refresh - mint a fresh access token from a refresh token.
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RefreshRequest>,
) -> axum::response::Response {
    let principal = match services
        .resolver
        .resolve(&body.refresh_token, TokenKind::Refresh)
    {
        Ok(principal) => principal,
        Err(e) => return errors::auth_error_response(e),
    };

    let claims = Claims::new(principal.id, principal.username.clone(), TokenKind::Access);
    match services.codec().create_access_token(claims) {
        Ok(access_token) => (
            StatusCode::OK,
            Json(AccessTokenRefreshed {
                access_token,
                expires_in: services.codec().access_ttl_secs(),
            }),
        )
            .into_response(),
        Err(e) => errors::auth_error_response(e),
    }
}

/// GET /api/auth/me - the caller's own account (access tokens only).
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.users.get(principal.principal().id) {
        Some(user) => (StatusCode::OK, Json(user)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "user_not_found", "user not found"),
    }
}
