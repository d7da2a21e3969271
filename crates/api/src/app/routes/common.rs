use aegis_auth::Predicate;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Evaluate a route's predicate against the caller, producing the denial
/// response on failure. Handlers bail out before touching any store.
pub fn enforce(
    services: &AppServices,
    principal: &PrincipalContext,
    predicate: &Predicate,
) -> Result<(), axum::response::Response> {
    predicate
        .evaluate(principal.principal(), &*services.rbac)
        .map_err(|e| {
            tracing::info!(
                username = %principal.principal().username,
                reason = %e,
                "authorization denied"
            );
            errors::auth_error_response(e)
        })
}
