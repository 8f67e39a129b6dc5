use dotenv::dotenv;
use serde::Deserialize;

use crate::auth::admin::{AdminAllowList, INITIAL_ADMIN_EMAILS};

/// One year.
pub const MAX_JWT_TTL_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: u64,
    pub admin_emails: String,
    pub store_backend: StoreBackend,
    pub bcrypt_cost: u32,
    pub db_pool_size: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_ttl_hours", &self.jwt_ttl_hours)
            .field("admin_emails", &self.admin_emails)
            .field("store_backend", &self.store_backend)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("db_pool_size", &self.db_pool_size)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
    #[error("DATABASE_URL must be set for the postgres store")]
    MissingDatabaseUrl,
    #[error("JWT_SECRET must be set")]
    MissingJwtSecret,
    #[error("JWT_TTL_HOURS must be between 1 and 8760, got {0}")]
    InvalidJwtTtl(u64),
}

impl AppConfig {
    /// Reads `.env` if present, then environment variables over defaults.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_builder(config::Config::builder().add_source(config::Environment::default()))
    }

    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let config: AppConfig = builder
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("jwt_secret", "")?
            .set_default("jwt_ttl_hours", 24)?
            .set_default("admin_emails", INITIAL_ADMIN_EMAILS.join(","))?
            .set_default("store_backend", "postgres")?
            .set_default("bcrypt_cost", i64::from(bcrypt::DEFAULT_COST))?
            .set_default("db_pool_size", 10)?
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if !(1..=MAX_JWT_TTL_HOURS).contains(&self.jwt_ttl_hours) {
            return Err(ConfigError::InvalidJwtTtl(self.jwt_ttl_hours));
        }
        if self.store_backend == StoreBackend::Postgres && self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        Ok(())
    }

    pub fn admin_allow_list(&self) -> AdminAllowList {
        AdminAllowList::from_csv(&self.admin_emails)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
