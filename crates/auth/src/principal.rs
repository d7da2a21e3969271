//! Resolved caller identity.

use serde::{Deserialize, Serialize};

use aegis_core::UserId;

/// The authenticated actor behind one request.
///
/// Constructed per-request from a verified token (or a login) and discarded
/// when the request ends; never persisted by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub username: String,
    pub is_active: bool,

    /// Superadmins bypass every predicate in the engine.
    pub is_superadmin: bool,
}

impl Principal {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            is_active: true,
            is_superadmin: false,
        }
    }

    pub fn superadmin(id: UserId, username: impl Into<String>) -> Self {
        Self {
            is_superadmin: true,
            ..Self::new(id, username)
        }
    }
}
