/// Auth handlers - session cookie issue and teardown
use crate::config::AuthConfig;
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::User;
use crate::services::auth::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    SessionUser,
};
use crate::services::AuthService;
use crate::state::AppState;
use actix_middleware::TOKEN_COOKIE;
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{http::StatusCode, web, HttpResponse};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::get().to(logout))
            .route("/me", web::get().to(me))
            .route("/forgotpassword", web::post().to(forgot_password))
            .route("/resetpassword/{token}", web::put().to(reset_password)),
    );
}

fn session_cookie(token: &str, auth: &AuthConfig) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(auth.cookie_secure)
        .max_age(CookieDuration::days(auth.token_ttl_days))
        .finish()
}

/// Issue a token for `user` and answer with it in both the cookie and body
fn token_response(user: &User, status: StatusCode, state: &AppState) -> Result<HttpResponse> {
    let auth = &state.config.auth;
    let token = AuthService::issue_token(user, auth.token_ttl_days)?;

    Ok(HttpResponse::build(status)
        .cookie(session_cookie(&token, auth))
        .json(AuthResponse {
            success: true,
            token,
            user: SessionUser::from(user),
        }))
}

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let service = AuthService::new(state.store.clone());
    let user = service.register(req.into_inner()).await?;
    token_response(&user, StatusCode::CREATED, &state)
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let service = AuthService::new(state.store.clone());
    let user = service.login(req.into_inner()).await?;
    token_response(&user, StatusCode::OK, &state)
}

/// GET /api/auth/logout
///
/// Overwrites the session cookie with `none` for ten seconds.
pub async fn logout(state: web::Data<AppState>) -> HttpResponse {
    let cookie = Cookie::build(TOKEN_COOKIE, "none")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.config.auth.cookie_secure)
        .max_age(CookieDuration::seconds(10))
        .finish();

    HttpResponse::Ok().cookie(cookie).json(serde_json::json!({
        "success": true,
        "message": "User logged out successfully",
    }))
}

/// GET /api/auth/me
pub async fn me(user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "success": true, "user": user.0 }))
}

/// POST /api/auth/forgotpassword
///
/// Always 200 so the response does not reveal which emails are registered.
pub async fn forgot_password(
    state: web::Data<AppState>,
    req: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse> {
    let service = AuthService::new(state.store.clone());
    service
        .forgot_password(req.into_inner(), &state.mailer, &state.config.app.client_url)
        .await?;

    Ok(super::message(
        "If that email is registered, a reset link has been sent",
    ))
}

/// PUT /api/auth/resetpassword/{token}
pub async fn reset_password(
    state: web::Data<AppState>,
    token: web::Path<String>,
    req: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse> {
    let service = AuthService::new(state.store.clone());
    service
        .reset_password(&token.into_inner(), req.into_inner())
        .await?;
    Ok(super::message("Password updated"))
}
