//! Authorization guards that enforce authentication at the type level
//!
//! `JwtAuthMiddleware` only attaches [`AuthClaims`] when a token is valid.
//! These extractors turn the claims into a live account: the user must still
//! exist and must not be banned. Role checks use the stored role, not the one
//! baked into the token.

use crate::error::AppError;
use crate::models::User;
use crate::repository::UserRepository;
use crate::state::AppState;
use actix_middleware::AuthClaims;
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

/// An authenticated, non-banned account
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }

    /// `(id, is_admin)` pair used by ownership checks
    pub fn viewer(&self) -> (Uuid, bool) {
        (self.0.id, self.0.is_admin())
    }
}

/// An authenticated administrator
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl AdminUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

/// The caller's account when a valid session is present, otherwise `None`
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<User>);

impl MaybeAuthUser {
    pub fn viewer(&self) -> Option<(Uuid, bool)> {
        self.0.as_ref().map(|u| (u.id, u.is_admin()))
    }
}

async fn load_user(state: Option<web::Data<AppState>>, claims: Option<AuthClaims>) -> Result<User, AppError> {
    let claims = claims.ok_or_else(|| {
        AppError::Unauthorized("Not authorized to access this route".to_string())
    })?;
    let state = state.ok_or_else(|| AppError::Internal("AppState not configured".to_string()))?;

    let user = state
        .store
        .find_user(claims.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    if user.is_banned {
        return Err(AppError::Forbidden("Your account has been banned".to_string()));
    }
    Ok(user)
}

fn request_parts(req: &HttpRequest) -> (Option<web::Data<AppState>>, Option<AuthClaims>) {
    (
        req.app_data::<web::Data<AppState>>().cloned(),
        req.extensions().get::<AuthClaims>().cloned(),
    )
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let (state, claims) = request_parts(req);
        Box::pin(async move { Ok(AuthUser(load_user(state, claims).await?)) })
    }
}

impl FromRequest for AdminUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let (state, claims) = request_parts(req);
        Box::pin(async move {
            let user = load_user(state, claims).await?;
            if !user.is_admin() {
                return Err(AppError::Forbidden(format!(
                    "User role {} is not authorized to access this route",
                    user.role.as_str()
                ))
                .into());
            }
            Ok(AdminUser(user))
        })
    }
}

impl FromRequest for MaybeAuthUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let (state, claims) = request_parts(req);
        Box::pin(async move {
            if claims.is_none() {
                return Ok(MaybeAuthUser(None));
            }
            Ok(MaybeAuthUser(load_user(state, claims).await.ok()))
        })
    }
}
