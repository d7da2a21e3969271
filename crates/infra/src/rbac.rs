//! Role/permission store and grant resolution.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Deserialize;

use aegis_auth::{
    DataScope, GrantSource, Permission, PermissionKind, PermissionTreeNode, Role, UserRole,
    build_tree,
};
use aegis_core::{DomainError, DomainResult, PermissionId, RoleId, UserId};

use crate::paging::PageRequest;

// ─────────────────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
    pub name: String,
    pub code: String,

    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RolePatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPermission {
    pub name: String,
    pub code: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(rename = "type")]
    pub kind: PermissionKind,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub parent_id: Option<PermissionId>,

    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionPatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,

    #[serde(rename = "type")]
    pub kind: Option<PermissionKind>,

    pub path: Option<String>,

    /// `Some(None)` clears the parent; absent leaves it untouched.
    #[serde(default, with = "double_option")]
    pub parent_id: Option<Option<PermissionId>>,

    pub sort_order: Option<i32>,
}

/// Distinguishes "field absent" from "field set to null" for patch bodies.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RbacState {
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, Permission>,

    /// role → granted permission ids (many-to-many).
    grants: HashMap<RoleId, HashSet<PermissionId>>,

    /// (user, role) → data scope; the key makes the pair unique.
    assignments: HashMap<(UserId, RoleId), DataScope>,
}

/// In-memory role/permission store.
///
/// Also the [`GrantSource`] the predicate engine consults: effective sets are
/// recomputed from the assignment table on every call.
#[derive(Debug, Default)]
pub struct RbacStore {
    inner: RwLock<RbacState>,
}

impl RbacStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Roles ────────────────────────────────────────────────────────────────

    pub fn create_role(&self, input: NewRole) -> DomainResult<Role> {
        let mut state = self.write();
        check_role_uniqueness(&state, &input.name, &input.code, None)?;

        let role = Role {
            id: RoleId::new(),
            name: input.name,
            code: input.code,
            description: input.description,
            is_system: false,
        };
        state.roles.insert(role.id, role.clone());
        Ok(role)
    }

    /// Seed a deletion-protected role (deployment bootstrap).
    pub fn create_system_role(&self, input: NewRole) -> DomainResult<Role> {
        let role = self.create_role(input)?;
        let mut state = self.write();
        if let Some(stored) = state.roles.get_mut(&role.id) {
            stored.is_system = true;
        }
        Ok(Role {
            is_system: true,
            ..role
        })
    }

    pub fn update_role(&self, id: RoleId, patch: RolePatch) -> DomainResult<Role> {
        let mut state = self.write();
        if !state.roles.contains_key(&id) {
            return Err(DomainError::NotFound);
        }

        if patch.name.is_some() || patch.code.is_some() {
            let current = &state.roles[&id];
            let name = patch.name.as_deref().unwrap_or(&current.name);
            let code = patch.code.as_deref().unwrap_or(&current.code);
            check_role_uniqueness(&state, name, code, Some(id))?;
        }

        let role = state
            .roles
            .get_mut(&id)
            .ok_or(DomainError::NotFound)?;
        if let Some(name) = patch.name {
            role.name = name;
        }
        if let Some(code) = patch.code {
            role.code = code;
        }
        if let Some(description) = patch.description {
            role.description = Some(description);
        }
        Ok(role.clone())
    }

    /// Delete a role together with its grants and user assignments.
    pub fn delete_role(&self, id: RoleId) -> DomainResult<()> {
        let mut state = self.write();
        let role = state.roles.get(&id).ok_or(DomainError::NotFound)?;

        if role.is_system {
            return Err(DomainError::conflict("system role cannot be deleted"));
        }

        state.roles.remove(&id);
        state.grants.remove(&id);
        state.assignments.retain(|(_, role_id), _| *role_id != id);
        Ok(())
    }

    pub fn get_role(&self, id: RoleId) -> Option<Role> {
        self.read().roles.get(&id).cloned()
    }

    pub fn find_role_by_code(&self, code: &str) -> Option<Role> {
        self.read().roles.values().find(|r| r.code == code).cloned()
    }

    pub fn list_roles(
        &self,
        name_filter: Option<&str>,
        code_filter: Option<&str>,
        page: PageRequest,
    ) -> (Vec<Role>, usize) {
        let mut roles: Vec<Role> = self
            .read()
            .roles
            .values()
            .filter(|r| matches_filter(&r.name, name_filter) && matches_filter(&r.code, code_filter))
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.code.cmp(&b.code));

        page.slice(roles)
    }

    // ── Role ↔ permission grants ─────────────────────────────────────────────

    pub fn grant_permission(&self, role_id: RoleId, permission_id: PermissionId) -> DomainResult<()> {
        let mut state = self.write();
        if !state.roles.contains_key(&role_id) {
            return Err(DomainError::NotFound);
        }
        if !state.permissions.contains_key(&permission_id) {
            return Err(DomainError::NotFound);
        }

        state.grants.entry(role_id).or_default().insert(permission_id);
        Ok(())
    }

    pub fn revoke_permission(&self, role_id: RoleId, permission_id: PermissionId) -> DomainResult<()> {
        let mut state = self.write();
        if !state.roles.contains_key(&role_id) {
            return Err(DomainError::NotFound);
        }

        if let Some(granted) = state.grants.get_mut(&role_id) {
            granted.remove(&permission_id);
        }
        Ok(())
    }

    /// Permissions granted to a role, in `sort_order`.
    pub fn role_permissions(&self, role_id: RoleId) -> DomainResult<Vec<Permission>> {
        let state = self.read();
        if !state.roles.contains_key(&role_id) {
            return Err(DomainError::NotFound);
        }

        let mut permissions: Vec<Permission> = state
            .grants
            .get(&role_id)
            .map(|granted| {
                granted
                    .iter()
                    .filter_map(|id| state.permissions.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        permissions.sort_by_key(|p| p.sort_order);
        Ok(permissions)
    }

    // ── Permissions ──────────────────────────────────────────────────────────

    pub fn create_permission(&self, input: NewPermission) -> DomainResult<Permission> {
        let mut state = self.write();
        check_permission_uniqueness(&state, &input.name, &input.code, None)?;

        if let Some(parent_id) = input.parent_id {
            if !state.permissions.contains_key(&parent_id) {
                return Err(DomainError::validation("parent_id", "parent permission not found"));
            }
        }

        let permission = Permission {
            id: PermissionId::new(),
            name: input.name,
            code: input.code,
            description: input.description,
            kind: input.kind,
            path: input.path,
            parent_id: input.parent_id,
            sort_order: input.sort_order,
        };
        state.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    pub fn update_permission(
        &self,
        id: PermissionId,
        patch: PermissionPatch,
    ) -> DomainResult<Permission> {
        let mut state = self.write();
        if !state.permissions.contains_key(&id) {
            return Err(DomainError::NotFound);
        }

        if patch.name.is_some() || patch.code.is_some() {
            let current = &state.permissions[&id];
            let name = patch.name.as_deref().unwrap_or(&current.name);
            let code = patch.code.as_deref().unwrap_or(&current.code);
            check_permission_uniqueness(&state, name, code, Some(id))?;
        }

        if let Some(Some(parent_id)) = patch.parent_id {
            if parent_id == id {
                return Err(DomainError::validation(
                    "parent_id",
                    "permission cannot be its own parent",
                ));
            }
            if !state.permissions.contains_key(&parent_id) {
                return Err(DomainError::validation("parent_id", "parent permission not found"));
            }
        }

        let permission = state
            .permissions
            .get_mut(&id)
            .ok_or(DomainError::NotFound)?;
        if let Some(name) = patch.name {
            permission.name = name;
        }
        if let Some(code) = patch.code {
            permission.code = code;
        }
        if let Some(description) = patch.description {
            permission.description = Some(description);
        }
        if let Some(kind) = patch.kind {
            permission.kind = kind;
        }
        if let Some(path) = patch.path {
            permission.path = Some(path);
        }
        if let Some(parent_id) = patch.parent_id {
            permission.parent_id = parent_id;
        }
        if let Some(sort_order) = patch.sort_order {
            permission.sort_order = sort_order;
        }
        Ok(permission.clone())
    }

    /// Delete a permission that no child references; grants are cleaned up.
    pub fn delete_permission(&self, id: PermissionId) -> DomainResult<()> {
        let mut state = self.write();
        if !state.permissions.contains_key(&id) {
            return Err(DomainError::NotFound);
        }

        let has_children = state
            .permissions
            .values()
            .any(|p| p.parent_id == Some(id));
        if has_children {
            return Err(DomainError::conflict(
                "permission has child permissions and cannot be deleted",
            ));
        }

        state.permissions.remove(&id);
        for granted in state.grants.values_mut() {
            granted.remove(&id);
        }
        Ok(())
    }

    pub fn get_permission(&self, id: PermissionId) -> Option<Permission> {
        self.read().permissions.get(&id).cloned()
    }

    pub fn list_permissions(
        &self,
        name_filter: Option<&str>,
        code_filter: Option<&str>,
        kind_filter: Option<PermissionKind>,
        page: PageRequest,
    ) -> (Vec<Permission>, usize) {
        let mut permissions: Vec<Permission> = self
            .read()
            .permissions
            .values()
            .filter(|p| {
                matches_filter(&p.name, name_filter)
                    && matches_filter(&p.code, code_filter)
                    && kind_filter.is_none_or(|kind| p.kind == kind)
            })
            .cloned()
            .collect();
        permissions.sort_by_key(|p| p.sort_order);

        page.slice(permissions)
    }

    /// Forest view of every permission, built fresh per call.
    pub fn permission_tree(&self) -> Vec<PermissionTreeNode> {
        let mut permissions: Vec<Permission> =
            self.read().permissions.values().cloned().collect();
        // Pre-sort by code so sort_order ties resolve deterministically.
        permissions.sort_by(|a, b| a.code.cmp(&b.code));
        build_tree(&permissions)
    }

    // ── User ↔ role assignments ──────────────────────────────────────────────

    pub fn assign_role(&self, assignment: UserRole) -> DomainResult<()> {
        let mut state = self.write();
        if !state.roles.contains_key(&assignment.role_id) {
            return Err(DomainError::NotFound);
        }

        let key = (assignment.user_id, assignment.role_id);
        if state.assignments.contains_key(&key) {
            return Err(DomainError::conflict("role already assigned to user"));
        }

        state.assignments.insert(key, assignment.data_scope);
        Ok(())
    }

    pub fn remove_role_assignment(&self, user_id: UserId, role_id: RoleId) -> DomainResult<()> {
        self.write()
            .assignments
            .remove(&(user_id, role_id))
            .map(|_| ())
            .ok_or(DomainError::NotFound)
    }

    /// Roles assigned to a user, with their data scope, sorted by role code.
    pub fn user_roles(&self, user_id: UserId) -> Vec<(Role, DataScope)> {
        let state = self.read();
        let mut assigned: Vec<(Role, DataScope)> = state
            .assignments
            .iter()
            .filter(|((user, _), _)| *user == user_id)
            .filter_map(|((_, role_id), scope)| {
                state.roles.get(role_id).map(|role| (role.clone(), *scope))
            })
            .collect();
        assigned.sort_by(|(a, _), (b, _)| a.code.cmp(&b.code));
        assigned
    }

    /// Drop every assignment for a user (account deletion).
    pub fn clear_user_roles(&self, user_id: UserId) {
        self.write()
            .assignments
            .retain(|(user, _), _| *user != user_id);
    }

    fn read(&self) -> RwLockReadGuard<'_, RbacState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RbacState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GrantSource for RbacStore {
    fn role_codes(&self, user: UserId) -> HashSet<String> {
        let state = self.read();
        state
            .assignments
            .keys()
            .filter(|(assigned_user, _)| *assigned_user == user)
            .filter_map(|(_, role_id)| state.roles.get(role_id).map(|r| r.code.clone()))
            .collect()
    }

    fn permission_codes(&self, user: UserId) -> HashSet<String> {
        let state = self.read();
        state
            .assignments
            .keys()
            .filter(|(assigned_user, _)| *assigned_user == user)
            .filter_map(|(_, role_id)| state.grants.get(role_id))
            .flatten()
            .filter_map(|permission_id| {
                state
                    .permissions
                    .get(permission_id)
                    .map(|p| p.code.clone())
            })
            .collect()
    }
}

fn matches_filter(value: &str, filter: Option<&str>) -> bool {
    filter.is_none_or(|fragment| value.contains(fragment))
}

fn check_role_uniqueness(
    state: &RbacState,
    name: &str,
    code: &str,
    exclude: Option<RoleId>,
) -> DomainResult<()> {
    for role in state.roles.values() {
        if Some(role.id) == exclude {
            continue;
        }
        if role.name == name {
            return Err(DomainError::validation("name", "role name already exists"));
        }
        if role.code == code {
            return Err(DomainError::validation("code", "role code already exists"));
        }
    }
    Ok(())
}

fn check_permission_uniqueness(
    state: &RbacState,
    name: &str,
    code: &str,
    exclude: Option<PermissionId>,
) -> DomainResult<()> {
    for permission in state.permissions.values() {
        if Some(permission.id) == exclude {
            continue;
        }
        if permission.name == name {
            return Err(DomainError::validation("name", "permission name already exists"));
        }
        if permission.code == code {
            return Err(DomainError::validation("code", "permission code already exists"));
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn new_role(code: &str) -> NewRole {
        NewRole {
            name: format!("{code} role"),
            code: code.to_string(),
            description: None,
        }
    }

    fn new_permission(code: &str, parent_id: Option<PermissionId>) -> NewPermission {
        NewPermission {
            name: format!("{code} permission"),
            code: code.to_string(),
            description: None,
            kind: PermissionKind::Api,
            path: None,
            parent_id,
            sort_order: 0,
        }
    }

    #[test]
    fn duplicate_role_name_and_code_are_rejected() {
        let store = RbacStore::new();
        store.create_role(new_role("admin")).unwrap();

        let same_code = store.create_role(new_role("admin")).unwrap_err();
        assert!(matches!(same_code, DomainError::Validation { .. }));

        let same_name = store
            .create_role(NewRole {
                name: "admin role".to_string(),
                code: "other".to_string(),
                description: None,
            })
            .unwrap_err();
        assert!(matches!(same_name, DomainError::Validation { field, .. } if field == "name"));
    }

    #[test]
    fn update_role_skips_self_in_uniqueness_check() {
        let store = RbacStore::new();
        let role = store.create_role(new_role("admin")).unwrap();

        // Re-submitting its own code must not conflict.
        let updated = store
            .update_role(
                role.id,
                RolePatch {
                    code: Some("admin".to_string()),
                    description: Some("full access".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("full access"));
    }

    #[test]
    fn system_role_resists_deletion() {
        let store = RbacStore::new();
        let role = store.create_system_role(new_role("admin")).unwrap();

        assert!(matches!(
            store.delete_role(role.id),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn deleting_a_role_cascades_to_grants_and_assignments() {
        let store = RbacStore::new();
        let role = store.create_role(new_role("ops")).unwrap();
        let permission = store.create_permission(new_permission("user.read", None)).unwrap();
        store.grant_permission(role.id, permission.id).unwrap();

        let user = UserId::new();
        store
            .assign_role(UserRole {
                user_id: user,
                role_id: role.id,
                data_scope: DataScope::default(),
            })
            .unwrap();

        store.delete_role(role.id).unwrap();
        assert!(store.user_roles(user).is_empty());
        assert!(store.role_codes(user).is_empty());
    }

    #[test]
    fn permission_parent_must_exist() {
        let store = RbacStore::new();
        let err = store
            .create_permission(new_permission("user.read", Some(PermissionId::new())))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { field, .. } if field == "parent_id"));
    }

    #[test]
    fn permission_cannot_become_its_own_parent() {
        let store = RbacStore::new();
        let permission = store.create_permission(new_permission("user.read", None)).unwrap();

        let err = store
            .update_permission(
                permission.id,
                PermissionPatch {
                    parent_id: Some(Some(permission.id)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { field, .. } if field == "parent_id"));
    }

    #[test]
    fn permission_with_children_cannot_be_deleted() {
        let store = RbacStore::new();
        let parent = store.create_permission(new_permission("users", None)).unwrap();
        store
            .create_permission(new_permission("users.read", Some(parent.id)))
            .unwrap();

        assert!(matches!(
            store.delete_permission(parent.id),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn assignment_is_unique_per_user_and_role() {
        let store = RbacStore::new();
        let role = store.create_role(new_role("ops")).unwrap();
        let user = UserId::new();

        store
            .assign_role(UserRole {
                user_id: user,
                role_id: role.id,
                data_scope: DataScope::All,
            })
            .unwrap();

        let err = store
            .assign_role(UserRole {
                user_id: user,
                role_id: role.id,
                data_scope: DataScope::SelfOnly,
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn effective_sets_union_across_roles() {
        let store = RbacStore::new();
        let viewer = store.create_role(new_role("viewer")).unwrap();
        let editor = store.create_role(new_role("editor")).unwrap();

        let read = store.create_permission(new_permission("doc.read", None)).unwrap();
        let write = store.create_permission(new_permission("doc.write", None)).unwrap();
        store.grant_permission(viewer.id, read.id).unwrap();
        store.grant_permission(editor.id, read.id).unwrap();
        store.grant_permission(editor.id, write.id).unwrap();

        let user = UserId::new();
        for role_id in [viewer.id, editor.id] {
            store
                .assign_role(UserRole {
                    user_id: user,
                    role_id,
                    data_scope: DataScope::default(),
                })
                .unwrap();
        }

        assert_eq!(
            store.role_codes(user),
            ["viewer", "editor"].iter().map(|s| s.to_string()).collect()
        );
        assert_eq!(
            store.permission_codes(user),
            ["doc.read", "doc.write"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        );
    }

    #[test]
    fn grants_do_not_travel_the_permission_tree() {
        let store = RbacStore::new();
        let role = store.create_role(new_role("menu-user")).unwrap();

        let parent = store.create_permission(new_permission("menu", None)).unwrap();
        let child = store
            .create_permission(new_permission("menu.users", Some(parent.id)))
            .unwrap();
        store.grant_permission(role.id, child.id).unwrap();

        let user = UserId::new();
        store
            .assign_role(UserRole {
                user_id: user,
                role_id: role.id,
                data_scope: DataScope::default(),
            })
            .unwrap();

        let codes = store.permission_codes(user);
        assert!(codes.contains("menu.users"));
        assert!(!codes.contains("menu"));
    }

    #[test]
    fn permission_tree_reflects_parent_links() {
        let store = RbacStore::new();
        let parent = store.create_permission(new_permission("menu", None)).unwrap();
        store
            .create_permission(new_permission("menu.users", Some(parent.id)))
            .unwrap();

        let tree = store.permission_tree();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].permission.code, "menu");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].permission.code, "menu.users");
    }

    #[test]
    fn list_permissions_filters_by_kind() {
        let store = RbacStore::new();
        store.create_permission(new_permission("api.read", None)).unwrap();
        store
            .create_permission(NewPermission {
                kind: PermissionKind::Menu,
                ..new_permission("menu.home", None)
            })
            .unwrap();

        let (menus, total) =
            store.list_permissions(None, None, Some(PermissionKind::Menu), PageRequest::default());
        assert_eq!(total, 1);
        assert_eq!(menus[0].code, "menu.home");
    }
}
