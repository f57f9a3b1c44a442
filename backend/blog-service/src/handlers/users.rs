/// User handlers - own profile, public profiles and admin account management
use super::{listing, message, ok};
use crate::error::Result;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::{Page, PageParams, Paginated, UserFilter, UserStatusFilter};
use crate::services::users::{AdminUpdateUserRequest, UpdateProfileRequest};
use crate::services::UserService;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// `?page=&limit=&search=&status=` for admin user listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<UserStatusFilter>,
}

impl UserListParams {
    pub fn page(&self) -> Page {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
        .resolve(20, 100)
    }

    pub fn filter(&self) -> UserFilter {
        UserFilter {
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            status: self.status,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("", web::get().to(list_users))
            .service(
                web::resource("/profile")
                    .route(web::get().to(get_profile))
                    .route(web::put().to(update_profile))
                    .route(web::delete().to(delete_account)),
            )
            .route("/me/posts", web::get().to(my_posts))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_user))
                    .route(web::put().to(admin_update_user))
                    .route(web::delete().to(admin_delete_user)),
            ),
    );
}

fn users(state: &AppState) -> UserService {
    UserService::new(state.store.clone())
}

/// GET /api/users/profile
pub async fn get_profile(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let profile = users(&state).profile(user.id()).await?;
    Ok(ok(profile))
}

/// PUT /api/users/profile
pub async fn update_profile(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let updated = users(&state)
        .update_profile(user.id(), req.into_inner())
        .await?;
    Ok(ok(updated))
}

/// DELETE /api/users/profile
pub async fn delete_account(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    users(&state).delete_account(user.id()).await?;
    Ok(message("Account deleted successfully"))
}

/// GET /api/users/me/posts
pub async fn my_posts(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let posts = users(&state).my_posts(user.id()).await?;
    Ok(listing(posts))
}

/// GET /api/users/{id}
pub async fn get_user(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let profile = users(&state).public_profile(user_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": profile.user,
        "posts": profile.posts,
    })))
}

/// GET /api/users (admin)
pub async fn list_users(
    state: web::Data<AppState>,
    _admin: AdminUser,
    params: web::Query<UserListParams>,
) -> Result<HttpResponse> {
    let page = params.page();
    let (data, total) = users(&state).list_users(&params.filter(), page).await?;
    Ok(HttpResponse::Ok().json(Paginated::new(data, total, page)))
}

/// PUT /api/users/{id} (admin)
pub async fn admin_update_user(
    state: web::Data<AppState>,
    _admin: AdminUser,
    user_id: web::Path<Uuid>,
    req: web::Json<AdminUpdateUserRequest>,
) -> Result<HttpResponse> {
    let updated = users(&state)
        .admin_update(user_id.into_inner(), req.into_inner())
        .await?;
    Ok(ok(updated))
}

/// DELETE /api/users/{id} (admin)
pub async fn admin_delete_user(
    state: web::Data<AppState>,
    admin: AdminUser,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    users(&state)
        .admin_delete(admin.id(), user_id.into_inner())
        .await?;
    Ok(message("User deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_list_params_defaults() {
        let params = UserListParams {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(params.page(), Page::new(1, 20));
        assert!(params.filter().search.is_none());
        assert!(params.filter().status.is_none());
    }
}
