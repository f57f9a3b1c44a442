/// Blog Service Library
///
/// MiniBlog backend: accounts, posts and comments, the follow and friend
/// graphs, direct messages with a WebSocket relay, events and moderation.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers mounted under `/api`
/// - `services`: Business logic layer
/// - `repository`: Storage traits with PostgreSQL and in-memory backends
/// - `websocket`: Live socket sessions and the per-user connection registry
/// - `middleware`: Request extractors resolving the session user
/// - `models`: Data structures shared by storage and handlers
/// - `error`: Error types and handling
/// - `config`: Configuration management
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod security;
pub mod services;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, Result};

use actix_web::web;
use config::StorageBackend;
use repository::{MemoryStore, PgStore, Store};
use std::sync::Arc;

/// Everything an `App` needs besides `AppState` and outer middleware
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(handlers::json_config())
        .app_data(handlers::path_config())
        .app_data(handlers::query_config())
        .service(websocket::ws_handler)
        .configure(handlers::configure);
}

/// Open the configured storage backend
///
/// PostgreSQL pools are verified and migrated before they are returned.
pub async fn build_store(config: &Config) -> std::result::Result<Arc<dyn Store>, String> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            config.database.log_config();
            let pool = db_pool::create_pool(&config.database)
                .await
                .map_err(|e| format!("Database pool creation failed: {}", e))?;

            let store = PgStore::new(pool);
            store
                .migrate()
                .await
                .map_err(|e| format!("Database migration failed: {}", e))?;
            tracing::info!("Connected to database and applied migrations");
            Ok(Arc::new(store))
        }
    }
}
