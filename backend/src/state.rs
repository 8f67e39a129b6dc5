use std::sync::Arc;

use crate::auth::admin::AdminAllowList;
use crate::cart::CartBook;
use crate::config::{AppConfig, ConfigError, StoreBackend};
use crate::db;
use crate::store::{MarketStore, MemoryStore, PgStore, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn MarketStore>,
    pub carts: Arc<CartBook>,
    pub admins: AdminAllowList,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to connect to database: {0}")]
    Database(#[from] StoreError),
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn MarketStore>) -> Self {
        let admins = config.admin_allow_list();
        if admins.is_empty() {
            log::warn!("Admin allow-list is empty; nobody can hold the admin role");
        } else {
            log::info!("{} admin email(s) allow-listed", admins.len());
        }
        Self {
            config,
            store,
            carts: Arc::new(CartBook::new()),
            admins,
        }
    }

    /// Picks the store named by `STORE_BACKEND`.
    pub fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let store: Arc<dyn MarketStore> = match config.store_backend {
            StoreBackend::Postgres => {
                let pool = db::establish_pool(&config.database_url, config.db_pool_size)
                    .map_err(StoreError::from)?;
                Arc::new(PgStore::new(pool))
            }
            StoreBackend::Memory => {
                log::warn!("Using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };
        log::info!("Store backend: {}", store.backend_tag());
        Ok(Self::new(config, store))
    }
}
