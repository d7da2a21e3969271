//! HTTP routes, grouped per area.

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;

pub mod auth;
pub mod common;
pub mod rbac;
pub mod users;

/// Routes that serve unauthenticated callers (login, refresh).
pub fn public_router() -> Router {
    Router::new().nest("/api", auth::public_router())
}

/// Routes behind the bearer-token middleware.
pub fn protected_router() -> Router {
    Router::new().nest(
        "/api",
        Router::new()
            .merge(auth::protected_router())
            .merge(users::router())
            .merge(rbac::roles_router())
            .merge(rbac::permissions_router()),
    )
}

/// GET /health - liveness probe.
pub async fn health() -> axum::response::Response {
    (StatusCode::OK, "ok").into_response()
}
