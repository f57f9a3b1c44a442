use crate::config::Config;
use crate::repository::Store;
use crate::services::EmailService;
use crate::websocket::ConnectionRegistry;
use std::sync::Arc;

/// Shared by every worker
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub registry: ConnectionRegistry,
    pub mailer: Arc<EmailService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, mailer: EmailService, config: Config) -> Self {
        Self {
            store,
            registry: ConnectionRegistry::new(),
            mailer: Arc::new(mailer),
            config: Arc::new(config),
        }
    }
}
