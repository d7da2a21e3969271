//! User administration endpoints.
//!
//! Guard choices per route: deletion and password resets are superadmin-only,
//! activation/deactivation demonstrate combinator requirements, everything
//! else only needs an authenticated caller.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aegis_auth::{DataScope, GrantSource, Predicate, Role, UserRole};
use aegis_core::{RoleId, UserId};
use aegis_infra::{NewUser, PageRequest, UserPatch, UserView};

use crate::app::errors;
use crate::app::routes::common::enforce;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub username: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl ListUsersQuery {
    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.page_size.unwrap_or(defaults.page_size),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub total: usize,
    pub items: Vec<UserView>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: Uuid,

    #[serde(default)]
    pub data_scope: DataScope,
}

#[derive(Debug, Serialize)]
pub struct AssignedRole {
    #[serde(flatten)]
    pub role: Role,
    pub data_scope: DataScope,
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/users/me/password", put(change_own_password))
        .route("/users/me/permissions", get(my_permissions))
        .route("/users/me/roles", get(my_roles))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/activate", post(activate_user))
        .route("/users/:id/deactivate", post(deactivate_user))
        .route("/users/:id/password", post(reset_password))
        .route("/users/:id/roles", post(assign_role).get(list_user_roles))
        .route(
            "/users/:id/roles/:role_id",
            axum::routing::delete(remove_role),
        )
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/users - create an account.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewUser>,
) -> axum::response::Response {
    match services.users.create(body) {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// GET /api/users - paginated listing with an optional username filter.
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListUsersQuery>,
) -> axum::response::Response {
    let (items, total) = services
        .users
        .list(query.username.as_deref(), query.page_request());
    (StatusCode::OK, Json(UserList { total, items })).into_response()
}

/// GET /api/users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match services.users.get(UserId::from_uuid(id)) {
        Some(user) => (StatusCode::OK, Json(user)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
    }
}

/// PUT /api/users/:id - partial update.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UserPatch>,
) -> axum::response::Response {
    match services.users.update(UserId::from_uuid(id), body) {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// DELETE /api/users/:id - superadmin only.
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    if let Err(denied) = enforce(&services, &principal, &Predicate::superuser()) {
        return denied;
    }

    let user_id = UserId::from_uuid(id);
    match services.users.delete(user_id) {
        Ok(()) => {
            services.rbac.clear_user_roles(user_id);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::domain_error_response(e),
    }
}

/// POST /api/users/:id/activate - admins, or holders of both user-management
/// permissions.
pub async fn activate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    let requirement = Predicate::any_of(vec![
        Predicate::role("admin"),
        Predicate::permissions(["user.manage", "user.reset-password"], true),
    ]);
    if let Err(denied) = enforce(&services, &principal, &requirement) {
        return denied;
    }

    set_active(&services, id, true)
}

/// POST /api/users/:id/deactivate - requires the management permission AND one
/// of the operator roles.
pub async fn deactivate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    let requirement = Predicate::all_of(vec![
        Predicate::permission("user.manage"),
        Predicate::roles(["admin", "supervisor"], false),
    ]);
    if let Err(denied) = enforce(&services, &principal, &requirement) {
        return denied;
    }

    set_active(&services, id, false)
}

fn set_active(services: &AppServices, id: Uuid, is_active: bool) -> axum::response::Response {
    let patch = UserPatch {
        is_active: Some(is_active),
        ..Default::default()
    };
    match services.users.update(UserId::from_uuid(id), patch) {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// PUT /api/users/me/password - requires an active account and the current
/// password.
pub async fn change_own_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<ChangePasswordRequest>,
) -> axum::response::Response {
    if let Err(denied) = enforce(&services, &principal, &Predicate::active_user()) {
        return denied;
    }

    match services.users.change_password(
        principal.principal().id,
        &body.old_password,
        &body.new_password,
    ) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// POST /api/users/:id/password - superadmin password reset.
pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<ResetPasswordRequest>,
) -> axum::response::Response {
    if let Err(denied) = enforce(&services, &principal, &Predicate::superuser()) {
        return denied;
    }

    match services
        .users
        .reset_password(UserId::from_uuid(id), &body.new_password)
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// GET /api/users/me/permissions - the caller's effective permission codes.
pub async fn my_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let caller = principal.principal();
    let mut codes: Vec<String> = if caller.is_superadmin {
        vec!["*".to_string()]
    } else {
        services
            .rbac
            .permission_codes(caller.id)
            .into_iter()
            .collect()
    };
    codes.sort();

    (StatusCode::OK, Json(serde_json::json!({ "permissions": codes }))).into_response()
}

/// GET /api/users/me/roles - the caller's role codes.
pub async fn my_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let mut codes: Vec<String> = services
        .rbac
        .role_codes(principal.principal().id)
        .into_iter()
        .collect();
    codes.sort();

    (StatusCode::OK, Json(serde_json::json!({ "roles": codes }))).into_response()
}

/// POST /api/users/:id/roles - assign a role.
pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignRoleRequest>,
) -> axum::response::Response {
    let requirement = Predicate::any_of(vec![
        Predicate::role("admin"),
        Predicate::permission("user.manage"),
    ]);
    if let Err(denied) = enforce(&services, &principal, &requirement) {
        return denied;
    }

    let user_id = UserId::from_uuid(id);
    if services.users.get(user_id).is_none() {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found");
    }

    let assignment = UserRole {
        user_id,
        role_id: RoleId::from_uuid(body.role_id),
        data_scope: body.data_scope,
    };
    match services.rbac.assign_role(assignment) {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}

/// GET /api/users/:id/roles - roles assigned to a user.
pub async fn list_user_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    let user_id = UserId::from_uuid(id);
    if services.users.get(user_id).is_none() {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found");
    }

    let assigned: Vec<AssignedRole> = services
        .rbac
        .user_roles(user_id)
        .into_iter()
        .map(|(role, data_scope)| AssignedRole { role, data_scope })
        .collect();

    (StatusCode::OK, Json(assigned)).into_response()
}

/// DELETE /api/users/:id/roles/:role_id - remove an assignment.
pub async fn remove_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, role_id)): Path<(Uuid, Uuid)>,
) -> axum::response::Response {
    let requirement = Predicate::any_of(vec![
        Predicate::role("admin"),
        Predicate::permission("user.manage"),
    ]);
    if let Err(denied) = enforce(&services, &principal, &requirement) {
        return denied;
    }

    match services
        .rbac
        .remove_role_assignment(UserId::from_uuid(id), RoleId::from_uuid(role_id))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_response(e),
    }
}
