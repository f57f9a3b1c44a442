/// Health check handlers
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/health/live", web::get().to(liveness));
}

/// GET /api/health
///
/// Reports storage reachability and how many users hold a live socket.
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let online_users = state.registry.online_count().await;

    match state.store.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "status": "ok",
            "storage": state.store.backend_name(),
            "onlineUsers": online_users,
        })),
        Err(e) => {
            tracing::error!(error = %e, "storage health check failed");
            HttpResponse::ServiceUnavailable().json(json!({
                "success": false,
                "status": "degraded",
                "storage": state.store.backend_name(),
                "onlineUsers": online_users,
            }))
        }
    }
}

/// GET /api/health/live
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "alive" }))
}
