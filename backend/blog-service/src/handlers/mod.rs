/// HTTP handlers for blog-service
///
/// One module per resource. Each exposes `configure` to mount its scope
/// under `/api`; the shared envelope helpers live here.
pub mod admin;
pub mod auth;
pub mod bookmarks;
pub mod events;
pub mod follow;
pub mod friends;
pub mod health;
pub mod messages;
pub mod posts;
pub mod users;

use crate::error::AppError;
use actix_web::{web, HttpResponse};
use serde::Serialize;

/// Mount every `/api` route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(health::configure)
            .configure(auth::configure)
            .configure(users::configure)
            .configure(follow::configure)
            .configure(friends::configure)
            .configure(posts::configure)
            .configure(bookmarks::configure)
            .configure(messages::configure)
            .configure(admin::configure)
            .configure(events::configure),
    );
}

/// Malformed JSON bodies answer with the standard error envelope
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(1024 * 1024)
        .error_handler(|err, _req| {
            tracing::debug!("rejected request body: {}", err);
            AppError::BadRequest(format!("Invalid request body: {}", err)).into()
        })
}

/// Unparseable ids in the path answer 400 rather than 404
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        tracing::debug!("rejected path parameter: {}", err);
        AppError::BadRequest("Invalid identifier".to_string()).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid query string: {}", err)).into()
    })
}

pub(crate) fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "success": true, "data": data }))
}

pub(crate) fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(serde_json::json!({ "success": true, "data": data }))
}

pub(crate) fn message(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "success": true, "message": message }))
}

pub(crate) fn message_with<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": message,
        "data": data,
    }))
}

/// `{success, count, data}` for unpaginated listings
pub(crate) fn listing<T: Serialize>(data: Vec<T>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": data.len(),
        "data": data,
    }))
}
