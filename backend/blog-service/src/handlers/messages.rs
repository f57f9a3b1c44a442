/// Direct message handlers
use super::{created, listing, message_with, ok};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::PageParams;
use crate::services::MessageService;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub receiver_id: Uuid,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimeBody {
    pub receiver_id: Uuid,
    #[serde(default)]
    pub message: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/messages")
            .route("/send", web::post().to(send_message))
            .route("/conversations", web::get().to(conversations))
            .route("/unread-count", web::get().to(unread_count))
            .route("/read/{user_id}", web::put().to(mark_read))
            .route("/one-time", web::post().to(send_one_time))
            .route("/one-time/received", web::get().to(one_time_received))
            .route("/one-time/sent", web::get().to(one_time_sent))
            .route("/one-time/{id}/read", web::put().to(mark_one_time_read))
            .route("/{user_id}", web::get().to(conversation)),
    );
}

fn messages(state: &AppState) -> MessageService {
    MessageService::new(state.store.clone(), state.registry.clone())
}

/// POST /api/messages/send
///
/// Persists first; the live push to an online receiver is best effort.
pub async fn send_message(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<SendMessageBody>,
) -> Result<HttpResponse> {
    let sent = messages(&state)
        .send(user.id(), body.receiver_id, &body.content)
        .await?;
    Ok(created(sent))
}

/// GET /api/messages/conversations
pub async fn conversations(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    Ok(listing(messages(&state).conversations(user.id()).await?))
}

/// GET /api/messages/unread-count
pub async fn unread_count(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let count = messages(&state).unread_count(user.id()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "count": count })))
}

/// GET /api/messages/{userId}
pub async fn conversation(
    state: web::Data<AppState>,
    user: AuthUser,
    peer_id: web::Path<Uuid>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = params.resolve(50, 200);
    let thread = messages(&state)
        .conversation(user.id(), peer_id.into_inner(), page)
        .await?;
    Ok(listing(thread))
}

/// PUT /api/messages/read/{userId}
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthUser,
    peer_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let updated = messages(&state)
        .mark_read(user.id(), peer_id.into_inner())
        .await?;
    Ok(message_with(
        "Messages marked as read",
        json!({ "updated": updated }),
    ))
}

/// POST /api/messages/one-time
pub async fn send_one_time(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<OneTimeBody>,
) -> Result<HttpResponse> {
    let sent = messages(&state)
        .send_one_time(user.id(), body.receiver_id, &body.message)
        .await?;
    Ok(created(sent))
}

pub async fn one_time_received(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse> {
    Ok(listing(messages(&state).one_time_received(user.id()).await?))
}

pub async fn one_time_sent(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    Ok(listing(messages(&state).one_time_sent(user.id()).await?))
}

/// PUT /api/messages/one-time/{id}/read
pub async fn mark_one_time_read(
    state: web::Data<AppState>,
    user: AuthUser,
    message_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let read = messages(&state)
        .mark_one_time_read(message_id.into_inner(), user.id())
        .await?;
    Ok(ok(read))
}
