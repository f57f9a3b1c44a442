/// Follow handlers - follow requests, the follow graph and suggestions
use super::{created, listing, message, message_with, ok};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{PageParams, Paginated};
use crate::services::{MessageService, SocialGraphService};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FollowRequestBody {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OneTimeMessageBody {
    #[serde(default)]
    pub message: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/follow")
            .route("/request/{user_id}", web::post().to(send_request))
            .route("/accept/{id}", web::put().to(accept_request))
            .route("/reject/{id}", web::put().to(reject_request))
            .route("/requests/received", web::get().to(received_requests))
            .route("/requests/sent", web::get().to(sent_requests))
            .route("/people-you-may-know", web::get().to(people_you_may_know))
            .route("/followers", web::get().to(my_followers))
            .route("/connected-users", web::get().to(connected_users))
            .route("/follow-back/{user_id}", web::post().to(follow_back))
            .route("/one-time-message/{user_id}", web::post().to(send_one_time))
            .route("/one-time-messages", web::get().to(one_time_messages))
            .route(
                "/one-time-message-status/{user_id}",
                web::get().to(one_time_status),
            )
            .route("/{user_id}", web::delete().to(unfollow))
            .route("/{user_id}/followers", web::get().to(followers))
            .route("/{user_id}/following", web::get().to(following))
            .route("/{user_id}/status", web::get().to(follow_status)),
    );
}

fn graph(state: &AppState) -> SocialGraphService {
    SocialGraphService::new(state.store.clone())
}

fn messages(state: &AppState) -> MessageService {
    MessageService::new(state.store.clone(), state.registry.clone())
}

/// POST /api/follow/request/{userId}
pub async fn send_request(
    state: web::Data<AppState>,
    user: AuthUser,
    target_id: web::Path<Uuid>,
    body: Option<web::Json<FollowRequestBody>>,
) -> Result<HttpResponse> {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let request = graph(&state)
        .send_request(user.id(), target_id.into_inner(), body.message)
        .await?;
    Ok(created(request))
}

/// PUT /api/follow/accept/{id}
pub async fn accept_request(
    state: web::Data<AppState>,
    user: AuthUser,
    request_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let request = graph(&state)
        .accept(request_id.into_inner(), user.id())
        .await?;
    Ok(message_with("Follow request accepted", request))
}

/// PUT /api/follow/reject/{id}
pub async fn reject_request(
    state: web::Data<AppState>,
    user: AuthUser,
    request_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let request = graph(&state)
        .reject(request_id.into_inner(), user.id())
        .await?;
    Ok(message_with("Follow request rejected", request))
}

/// GET /api/follow/requests/received
pub async fn received_requests(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse> {
    let requests = graph(&state).received_requests(user.id()).await?;
    Ok(listing(requests))
}

/// GET /api/follow/requests/sent
pub async fn sent_requests(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let requests = graph(&state).sent_requests(user.id()).await?;
    Ok(listing(requests))
}

/// GET /api/follow/people-you-may-know
pub async fn people_you_may_know(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse> {
    let people = graph(&state).people_you_may_know(user.id()).await?;
    Ok(listing(people))
}

/// GET /api/follow/followers
pub async fn my_followers(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let followers = graph(&state).my_followers(user.id()).await?;
    Ok(listing(followers))
}

/// GET /api/follow/connected-users
///
/// Mutual follows only.
pub async fn connected_users(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let users = graph(&state).connected_users(user.id()).await?;
    Ok(listing(users))
}

/// POST /api/follow/follow-back/{userId}
pub async fn follow_back(
    state: web::Data<AppState>,
    user: AuthUser,
    target_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    graph(&state)
        .follow_back(user.id(), target_id.into_inner())
        .await?;
    Ok(message("Followed back successfully"))
}

/// POST /api/follow/one-time-message/{userId}
pub async fn send_one_time(
    state: web::Data<AppState>,
    user: AuthUser,
    receiver_id: web::Path<Uuid>,
    body: web::Json<OneTimeMessageBody>,
) -> Result<HttpResponse> {
    let sent = messages(&state)
        .send_one_time(user.id(), receiver_id.into_inner(), &body.message)
        .await?;
    Ok(created(sent))
}

/// GET /api/follow/one-time-messages
pub async fn one_time_messages(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let received = messages(&state).one_time_received(user.id()).await?;
    Ok(listing(received))
}

/// GET /api/follow/one-time-message-status/{userId}
pub async fn one_time_status(
    state: web::Data<AppState>,
    user: AuthUser,
    target_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let status = messages(&state)
        .one_time_status(user.id(), target_id.into_inner())
        .await?;
    Ok(ok(status))
}

/// DELETE /api/follow/{userId}
pub async fn unfollow(
    state: web::Data<AppState>,
    user: AuthUser,
    target_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    graph(&state)
        .unfollow(user.id(), target_id.into_inner())
        .await?;
    Ok(message("Unfollowed successfully"))
}

/// GET /api/follow/{userId}/followers
pub async fn followers(
    state: web::Data<AppState>,
    _user: AuthUser,
    user_id: web::Path<Uuid>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = params.resolve(20, 100);
    let (data, total) = graph(&state).followers(user_id.into_inner(), page).await?;
    Ok(HttpResponse::Ok().json(Paginated::new(data, total, page)))
}

/// GET /api/follow/{userId}/following
pub async fn following(
    state: web::Data<AppState>,
    _user: AuthUser,
    user_id: web::Path<Uuid>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = params.resolve(20, 100);
    let (data, total) = graph(&state).following(user_id.into_inner(), page).await?;
    Ok(HttpResponse::Ok().json(Paginated::new(data, total, page)))
}

/// GET /api/follow/{userId}/status
pub async fn follow_status(
    state: web::Data<AppState>,
    user: AuthUser,
    target_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let status = graph(&state)
        .status(user.id(), target_id.into_inner())
        .await?;
    Ok(ok(status))
}
