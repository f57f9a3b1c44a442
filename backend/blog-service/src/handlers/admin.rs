/// Admin handlers - dashboard, bans, takedowns and the public leaderboard
use super::users::UserListParams;
use super::{message, message_with, ok};
use crate::error::Result;
use crate::middleware::AdminUser;
use crate::models::Paginated;
use crate::services::moderation::ModerationReason;
use crate::services::ModerationService;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/stats", web::get().to(get_stats))
            .route("/users", web::get().to(list_users))
            .route("/users/{id}/ban", web::put().to(toggle_ban))
            .route("/posts/{id}", web::delete().to(delete_post))
            .route("/posts/{id}/feature", web::put().to(toggle_feature))
            .route("/comments/{id}", web::delete().to(delete_comment))
            .route("/leaderboard", web::get().to(leaderboard)),
    );
}

fn moderation(state: &AppState) -> ModerationService {
    ModerationService::new(state.store.clone())
}

/// GET /api/admin/stats
pub async fn get_stats(state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse> {
    let stats = moderation(&state).stats().await?;
    Ok(ok(stats))
}

/// GET /api/admin/users
pub async fn list_users(
    state: web::Data<AppState>,
    _admin: AdminUser,
    params: web::Query<UserListParams>,
) -> Result<HttpResponse> {
    let page = params.page();
    let (data, total) = moderation(&state)
        .list_users(&params.filter(), page)
        .await?;
    Ok(HttpResponse::Ok().json(Paginated::new(data, total, page)))
}

/// PUT /api/admin/users/{id}/ban
///
/// Toggles the ban; the reason is recorded only when banning.
pub async fn toggle_ban(
    state: web::Data<AppState>,
    admin: AdminUser,
    user_id: web::Path<Uuid>,
    body: Option<web::Json<ModerationReason>>,
) -> Result<HttpResponse> {
    let reason = body.and_then(|b| b.into_inner().reason);
    let user = moderation(&state)
        .toggle_ban(admin.id(), user_id.into_inner(), reason)
        .await?;

    let verb = if user.is_banned { "banned" } else { "unbanned" };
    Ok(message_with(&format!("User {} successfully", verb), user))
}

/// DELETE /api/admin/posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    admin: AdminUser,
    post_id: web::Path<Uuid>,
    body: Option<web::Json<ModerationReason>>,
) -> Result<HttpResponse> {
    let reason = body.and_then(|b| b.into_inner().reason);
    moderation(&state)
        .delete_post(admin.id(), post_id.into_inner(), reason)
        .await?;
    Ok(message("Post deleted successfully"))
}

/// DELETE /api/admin/comments/{id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    admin: AdminUser,
    comment_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let removed = moderation(&state)
        .delete_comment(admin.id(), comment_id.into_inner())
        .await?;
    Ok(message_with(
        "Comment deleted successfully",
        json!({ "removed": removed }),
    ))
}

/// PUT /api/admin/posts/{id}/feature
pub async fn toggle_feature(
    state: web::Data<AppState>,
    _admin: AdminUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = moderation(&state)
        .toggle_feature(post_id.into_inner())
        .await?;

    let verb = if post.is_featured { "featured" } else { "unfeatured" };
    Ok(message_with(&format!("Post {} successfully", verb), post))
}

/// GET /api/admin/leaderboard
///
/// Public, no admin role required.
pub async fn leaderboard(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(ok(moderation(&state).leaderboard().await?))
}
