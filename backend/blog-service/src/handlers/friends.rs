/// Friend handlers
use super::{created, listing, message, message_with};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::services::FriendService;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestBody {
    pub receiver_id: Uuid,
    pub message: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/friends")
            .route("", web::get().to(list_friends))
            .route("/request", web::post().to(send_request))
            .route("/accept/{id}", web::put().to(accept_request))
            .route("/reject/{id}", web::put().to(reject_request))
            .route("/requests/received", web::get().to(received_requests))
            .route("/requests/sent", web::get().to(sent_requests))
            .route("/suggestions", web::get().to(suggestions))
            .route("/{friend_id}", web::delete().to(remove_friend)),
    );
}

fn friends(state: &AppState) -> FriendService {
    FriendService::new(state.store.clone())
}

pub async fn send_request(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<FriendRequestBody>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let request = friends(&state)
        .send_request(user.id(), body.receiver_id, body.message)
        .await?;
    Ok(created(request))
}

pub async fn accept_request(
    state: web::Data<AppState>,
    user: AuthUser,
    request_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let request = friends(&state)
        .accept(request_id.into_inner(), user.id())
        .await?;
    Ok(message_with("Friend request accepted", request))
}

pub async fn reject_request(
    state: web::Data<AppState>,
    user: AuthUser,
    request_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let request = friends(&state)
        .reject(request_id.into_inner(), user.id())
        .await?;
    Ok(message_with("Friend request rejected", request))
}

pub async fn received_requests(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse> {
    Ok(listing(friends(&state).received_requests(user.id()).await?))
}

pub async fn sent_requests(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    Ok(listing(friends(&state).sent_requests(user.id()).await?))
}

pub async fn list_friends(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    Ok(listing(friends(&state).friends(user.id()).await?))
}

/// GET /api/friends/suggestions
pub async fn suggestions(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    Ok(listing(friends(&state).suggestions(user.id()).await?))
}

/// DELETE /api/friends/{friendId}
pub async fn remove_friend(
    state: web::Data<AppState>,
    user: AuthUser,
    friend_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    friends(&state)
        .remove(user.id(), friend_id.into_inner())
        .await?;
    Ok(message("Friend removed successfully"))
}
