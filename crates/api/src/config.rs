//! Environment-driven application configuration.

use aegis_auth::TokenConfig;

const DEV_SECRET: &str = "dev-secret-change-me-before-deploying";

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,

    /// Initial superadmin account, seeded only when the store is empty.
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            jwt_secret: DEV_SECRET.to_string(),
            access_ttl_secs: 30 * 60,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let jwt_secret = std::env::var("AEGIS_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("AEGIS_JWT_SECRET not set; using insecure dev default");
            defaults.jwt_secret.clone()
        });

        Self {
            bind_addr: env_or("AEGIS_BIND_ADDR", defaults.bind_addr.clone()),
            jwt_secret,
            access_ttl_secs: env_parsed("AEGIS_ACCESS_TTL_SECS", defaults.access_ttl_secs),
            refresh_ttl_secs: env_parsed("AEGIS_REFRESH_TTL_SECS", defaults.refresh_ttl_secs),
            admin_username: env_or("AEGIS_ADMIN_USERNAME", defaults.admin_username.clone()),
            admin_password: env_or("AEGIS_ADMIN_PASSWORD", defaults.admin_password),
        }
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig::new(self.jwt_secret.clone())
            .with_access_ttl_secs(self.access_ttl_secs)
            .with_refresh_ttl_secs(self.refresh_ttl_secs)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed(key: &str, default: i64) -> i64 {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("{key} is not a valid integer; using {default}");
            default
        }),
        Err(_) => default,
    }
}
