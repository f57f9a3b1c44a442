/// Post handlers - listing, CRUD, engagement and comments
use super::{created, listing, message, ok};
use crate::error::Result;
use crate::middleware::{AuthUser, MaybeAuthUser};
use crate::models::{PageParams, Paginated};
use crate::services::comments::CreateCommentRequest;
use crate::services::posts::{CreatePostRequest, PostListParams, ReshareRequest, UpdatePostRequest};
use crate::services::{CommentService, PostService};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/posts")
            .service(
                web::resource("")
                    .route(web::get().to(list_posts))
                    .route(web::post().to(create_post)),
            )
            .route("/feed", web::get().to(get_feed))
            .route("/drafts", web::get().to(get_drafts))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_post))
                    .route(web::put().to(update_post))
                    .route(web::delete().to(delete_post)),
            )
            .route("/{id}/like", web::post().to(toggle_like))
            .route("/{id}/likes", web::get().to(get_likers))
            .route("/{id}/publish", web::put().to(publish_post))
            .route("/{id}/bookmark", web::post().to(toggle_bookmark))
            .route("/{id}/reshare", web::post().to(reshare_post))
            .route("/{id}/share", web::post().to(share_post))
            .service(
                web::resource("/{id}/comments")
                    .route(web::get().to(list_comments))
                    .route(web::post().to(create_comment)),
            ),
    );
}

fn posts(state: &AppState) -> PostService {
    PostService::new(state.store.clone())
}

/// GET /api/posts
pub async fn list_posts(
    state: web::Data<AppState>,
    params: web::Query<PostListParams>,
) -> Result<HttpResponse> {
    let page = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve(DEFAULT_LIMIT, MAX_LIMIT);

    let (data, total) = posts(&state).list(&params.query(), page).await?;
    Ok(HttpResponse::Ok().json(Paginated::new(data, total, page)))
}

/// POST /api/posts
pub async fn create_post(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    let post = posts(&state).create(user.id(), req.into_inner()).await?;
    Ok(created(post))
}

/// GET /api/posts/feed
///
/// Published posts by the caller and everyone they follow.
pub async fn get_feed(
    state: web::Data<AppState>,
    user: AuthUser,
    params: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = params.resolve(DEFAULT_LIMIT, MAX_LIMIT);
    let (data, total) = posts(&state).feed(user.id(), page).await?;
    Ok(HttpResponse::Ok().json(Paginated::new(data, total, page)))
}

/// GET /api/posts/drafts
pub async fn get_drafts(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let drafts = posts(&state).drafts(user.id()).await?;
    Ok(listing(drafts))
}

/// GET /api/posts/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    viewer: MaybeAuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = posts(&state)
        .get(post_id.into_inner(), viewer.viewer())
        .await?;
    Ok(ok(post))
}

/// PUT /api/posts/{id}
pub async fn update_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
    req: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse> {
    let post = posts(&state)
        .update(post_id.into_inner(), user.viewer(), req.into_inner())
        .await?;
    Ok(ok(post))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    posts(&state)
        .delete(post_id.into_inner(), user.viewer())
        .await?;
    Ok(message("Post deleted successfully"))
}

/// PUT /api/posts/{id}/publish
pub async fn publish_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = posts(&state)
        .publish(post_id.into_inner(), user.viewer())
        .await?;
    Ok(ok(post))
}

/// POST /api/posts/{id}/like
pub async fn toggle_like(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let toggle = posts(&state)
        .toggle_like(post_id.into_inner(), user.id())
        .await?;
    Ok(ok(toggle))
}

/// GET /api/posts/{id}/likes
pub async fn get_likers(
    state: web::Data<AppState>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let likers = posts(&state).likers(post_id.into_inner()).await?;
    Ok(listing(likers))
}

/// POST /api/posts/{id}/bookmark
pub async fn toggle_bookmark(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let toggle = posts(&state)
        .toggle_bookmark(post_id.into_inner(), user.id())
        .await?;
    Ok(ok(toggle))
}

/// POST /api/posts/{id}/reshare
///
/// The body is optional; a bare POST re-shares without a comment.
pub async fn reshare_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
    req: Option<web::Json<ReshareRequest>>,
) -> Result<HttpResponse> {
    let req = req.map(web::Json::into_inner).unwrap_or_default();
    let post = posts(&state)
        .reshare(post_id.into_inner(), user.id(), req)
        .await?;
    Ok(created(post))
}

/// POST /api/posts/{id}/share
pub async fn share_post(
    state: web::Data<AppState>,
    _user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let shares_count = posts(&state).share(post_id.into_inner()).await?;
    Ok(ok(json!({ "sharesCount": shares_count })))
}

/// GET /api/posts/{id}/comments
pub async fn list_comments(
    state: web::Data<AppState>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let comments = CommentService::new(state.store.clone())
        .list(post_id.into_inner())
        .await?;
    Ok(listing(comments))
}

/// POST /api/posts/{id}/comments
pub async fn create_comment(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
    req: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    let comment = CommentService::new(state.store.clone())
        .create(post_id.into_inner(), user.id(), req.into_inner())
        .await?;
    Ok(created(comment))
}
