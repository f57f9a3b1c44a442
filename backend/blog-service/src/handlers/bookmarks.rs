/// Bookmark handlers
use super::{created, message, ok};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{PageParams, Paginated};
use crate::services::bookmarks::{AddBookmarkRequest, UpdateBookmarkRequest};
use crate::services::BookmarkService;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookmarks")
            .service(
                web::resource("")
                    .route(web::get().to(list_bookmarks))
                    .route(web::post().to(add_bookmark)),
            )
            .service(
                web::resource("/{post_id}")
                    .route(web::put().to(update_bookmark))
                    .route(web::delete().to(remove_bookmark)),
            ),
    );
}

fn bookmarks(state: &AppState) -> BookmarkService {
    BookmarkService::new(state.store.clone())
}

/// GET /api/bookmarks
pub async fn list_bookmarks(
    state: web::Data<AppState>,
    user: AuthUser,
    params: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = params.resolve(10, 100);
    let (data, total) = bookmarks(&state).list(user.id(), page).await?;
    Ok(HttpResponse::Ok().json(Paginated::new(data, total, page)))
}

/// POST /api/bookmarks
pub async fn add_bookmark(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<AddBookmarkRequest>,
) -> Result<HttpResponse> {
    let bookmark = bookmarks(&state).add(user.id(), req.into_inner()).await?;
    Ok(created(bookmark))
}

/// PUT /api/bookmarks/{postId}
pub async fn update_bookmark(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
    req: web::Json<UpdateBookmarkRequest>,
) -> Result<HttpResponse> {
    let bookmark = bookmarks(&state)
        .update_note(user.id(), post_id.into_inner(), req.into_inner())
        .await?;
    Ok(ok(bookmark))
}

/// DELETE /api/bookmarks/{postId}
pub async fn remove_bookmark(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    bookmarks(&state)
        .remove(user.id(), post_id.into_inner())
        .await?;
    Ok(message("Bookmark removed successfully"))
}
