//! Role and permission management endpoints, including the tree view.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aegis_auth::{Permission, PermissionKind, Role};
use aegis_core::{PermissionId, RoleId};
use aegis_infra::{NewPermission, NewRole, PageRequest, PermissionPatch, RolePatch};

use crate::app::errors;
use crate::app::services::AppServices;

// ─────────────────────────────────────────────────────────────────────────────
// Query parameters and DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListRolesQuery {
    pub name: Option<String>,
    pub code: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ListPermissionsQuery {
    pub name: Option<String>,
    pub code: Option<String>,

    #[serde(rename = "type")]
    pub kind: Option<PermissionKind>,

    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

fn page_request(page: Option<usize>, page_size: Option<usize>) -> PageRequest {
    let defaults = PageRequest::default();
    PageRequest::new(
        page.unwrap_or(defaults.page),
        page_size.unwrap_or(defaults.page_size),
    )
}

#[derive(Debug, Serialize)]
pub struct RoleList {
    pub total: usize,
    pub items: Vec<Role>,
}

#[derive(Debug, Serialize)]
pub struct PermissionList {
    pub total: usize,
    pub items: Vec<Permission>,
}

#[derive(Debug, Deserialize)]
pub struct GrantPermissionRequest {
    pub permission_id: Uuid,
}

// ─────────────────────────────────────────────────────────────────────────────
// Routers
// ─────────────────────────────────────────────────────────────────────────────

pub fn roles_router() -> Router {
    Router::new()
        .route("/roles", post(create_role).get(list_roles))
        .route(
            "/roles/:id",
            get(get_role).put(update_role).delete(delete_role),
        )
        .route(
            "/roles/:id/permissions",
            post(grant_permission).get(role_permissions),
        )
        .route(
            "/roles/:id/permissions/:permission_id",
            axum::routing::delete(revoke_permission),
        )
}

pub fn permissions_router() -> Router {
    Router::new()
        .route("/permissions", post(create_permission).get(list_permissions))
        .route("/permissions/tree", get(permission_tree))
        .route(
            "/permissions/:id",
            get(get_permission)
                .put(update_permission)
                .delete(delete_permission),
        )
}

// ─────────────────────────────────────────────────────────────────────────────
// Role handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/roles
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewRole>,
) -> axum::response::Response {
    match services.rbac.create_role(body) {
        Ok(role) => (StatusCode::CREATED, Json(role)).into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// PUT /api/roles/:id
pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
    Json(body): Json<RolePatch>,
) -> axum::response::Response {
    match services.rbac.update_role(RoleId::from_uuid(id), body) {
        Ok(role) => (StatusCode::OK, Json(role)).into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// DELETE /api/roles/:id
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match services.rbac.delete_role(RoleId::from_uuid(id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// GET /api/roles/:id
pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match services.rbac.get_role(RoleId::from_uuid(id)) {
        Some(role) => (StatusCode::OK, Json(role)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "role not found"),
    }
}

/// GET /api/roles
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListRolesQuery>,
) -> axum::response::Response {
    let (items, total) = services.rbac.list_roles(
        query.name.as_deref(),
        query.code.as_deref(),
        page_request(query.page, query.page_size),
    );
    (StatusCode::OK, Json(RoleList { total, items })).into_response()
}

/// POST /api/roles/:id/permissions
pub async fn grant_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
    Json(body): Json<GrantPermissionRequest>,
) -> axum::response::Response {
    match services.rbac.grant_permission(
        RoleId::from_uuid(id),
        PermissionId::from_uuid(body.permission_id),
    ) {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// DELETE /api/roles/:id/permissions/:permission_id
pub async fn revoke_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, permission_id)): Path<(Uuid, Uuid)>,
) -> axum::response::Response {
    match services.rbac.revoke_permission(
        RoleId::from_uuid(id),
        PermissionId::from_uuid(permission_id),
    ) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// GET /api/roles/:id/permissions
pub async fn role_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match services.rbac.role_permissions(RoleId::from_uuid(id)) {
        Ok(permissions) => (StatusCode::OK, Json(permissions)).into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Permission handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/permissions
pub async fn create_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewPermission>,
) -> axum::response::Response {
    match services.rbac.create_permission(body) {
        Ok(permission) => (StatusCode::CREATED, Json(permission)).into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// PUT /api/permissions/:id
pub async fn update_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
    Json(body): Json<PermissionPatch>,
) -> axum::response::Response {
    match services
        .rbac
        .update_permission(PermissionId::from_uuid(id), body)
    {
        Ok(permission) => (StatusCode::OK, Json(permission)).into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// DELETE /api/permissions/:id
pub async fn delete_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match services.rbac.delete_permission(PermissionId::from_uuid(id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// GET /api/permissions/:id
pub async fn get_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match services.rbac.get_permission(PermissionId::from_uuid(id)) {
        Some(permission) => (StatusCode::OK, Json(permission)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "permission not found"),
    }
}

/// GET /api/permissions
pub async fn list_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListPermissionsQuery>,
) -> axum::response::Response {
    let (items, total) = services.rbac.list_permissions(
        query.name.as_deref(),
        query.code.as_deref(),
        query.kind,
        page_request(query.page, query.page_size),
    );
    (StatusCode::OK, Json(PermissionList { total, items })).into_response()
}

/// GET /api/permissions/tree - forest view following parent links.
pub async fn permission_tree(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    (StatusCode::OK, Json(services.rbac.permission_tree())).into_response()
}
