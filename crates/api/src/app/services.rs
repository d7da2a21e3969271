//! Service wiring shared by every handler.

use std::sync::Arc;

use aegis_auth::{PrincipalResolver, TokenCodec};
use aegis_infra::{NewUser, RbacStore, UserStore};

use crate::config::AppConfig;

/// Shared application services, injected into handlers via `Extension`.
pub struct AppServices {
    pub users: Arc<UserStore>,
    pub rbac: Arc<RbacStore>,
    pub resolver: PrincipalResolver,
}

impl AppServices {
    pub fn codec(&self) -> &TokenCodec {
        self.resolver.codec()
    }
}

/// Construct stores, codec, and resolver, seeding the initial superadmin
/// account when the user store is empty.
pub fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let users = Arc::new(UserStore::new());
    let rbac = Arc::new(RbacStore::new());

    let codec = TokenCodec::new(config.token_config())?;
    let resolver = PrincipalResolver::new(codec, users.clone());

    if users.is_empty() {
        users.create(NewUser {
            username: config.admin_username.clone(),
            email: format!("{}@localhost", config.admin_username),
            password: config.admin_password.clone(),
            is_active: true,
            is_superadmin: true,
        })?;
        tracing::warn!(
            username = %config.admin_username,
            "seeded initial superadmin account; change its password"
        );
    }

    Ok(AppServices {
        users,
        rbac,
        resolver,
    })
}
