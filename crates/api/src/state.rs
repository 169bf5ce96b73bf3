use std::sync::Arc;

use keystone_core::messages::MessageService;
use keystone_db::DbPool;

use crate::config::ServerConfig;

/// Handler state. Clones share the pool, config and message catalogue.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<ServerConfig>,
    /// Catalogue in the configured default language.
    pub messages: Arc<MessageService>,
}

impl AppState {
    pub fn new(pool: DbPool, config: ServerConfig) -> Self {
        Self {
            messages: Arc::new(MessageService::new(config.language.as_str())),
            config: Arc::new(config),
            pool,
        }
    }
}
