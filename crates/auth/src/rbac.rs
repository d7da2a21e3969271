//! Role and permission records (RBAC data model).
//!
//! These are the wire/storage shapes; ownership of the records lives in the
//! store, which this crate only sees through the collaborator traits.

use serde::{Deserialize, Serialize};

use aegis_core::{PermissionId, RoleId, UserId};

/// Role record. `name` and `code` are unique within the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub code: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Seeded by the deployment; protected from deletion.
    #[serde(default)]
    pub is_system: bool,
}

/// What a permission protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    Menu,
    Button,
    Api,
}

impl PermissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::Menu => "menu",
            PermissionKind::Button => "button",
            PermissionKind::Api => "api",
        }
    }
}

impl core::fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission record.
///
/// `parent_id` links the presentation tree only; a grant on a child never
/// implies a grant on its parent or vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub code: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(rename = "type")]
    pub kind: PermissionKind,

    /// Route path for menu-type permissions.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub parent_id: Option<PermissionId>,

    #[serde(default)]
    pub sort_order: i32,
}

/// Reach of the data a role assignment exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataScope {
    All,
    Department,
    #[default]
    #[serde(rename = "self")]
    SelfOnly,
}

/// Assignment of a role to a user, unique per (user, role) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: UserId,
    pub role_id: RoleId,

    #[serde(default)]
    pub data_scope: DataScope,
}
