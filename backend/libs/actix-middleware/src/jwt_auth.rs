use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage, HttpRequest,
};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use uuid::Uuid;

/// Name of the session cookie set at login
pub const TOKEN_COOKIE: &str = "token";

/// Identity extracted from a valid session token
#[derive(Debug, Clone)]
pub struct AuthClaims {
    pub user_id: Uuid,
    pub role: String,
}

/// Read the raw session token from the `token` cookie, falling back to an
/// `Authorization: Bearer` header
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(TOKEN_COOKIE) {
        let value = cookie.value();
        if !value.is_empty() && value != "none" {
            return Some(value.to_string());
        }
    }

    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// JWT Authentication Middleware
///
/// Attaches [`AuthClaims`] to the request when a valid token is present.
/// Requests without a token, or with an invalid one, pass through
/// unauthenticated so public routes can share a scope with protected ones;
/// handlers that require a user reject the request themselves.
pub struct JwtAuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            if let Some(token) = extract_token(req.request()) {
                match crypto_core::jwt::validate_token(&token) {
                    Ok(token_data) => match Uuid::parse_str(&token_data.claims.sub) {
                        Ok(user_id) => {
                            req.extensions_mut().insert(AuthClaims {
                                user_id,
                                role: token_data.claims.role,
                            });
                        }
                        Err(e) => {
                            tracing::warn!("Invalid user_id UUID in token: {}", e);
                        }
                    },
                    Err(e) => {
                        tracing::debug!("JWT validation failed: {}", e);
                    }
                }
            }

            service.call(req).await
        })
    }
}

/// FromRequest implementation for AuthClaims
impl actix_web::FromRequest for AuthClaims {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<AuthClaims>() {
            Some(claims) => ready(Ok(claims.clone())),
            None => ready(Err(actix_web::error::ErrorUnauthorized(
                "User not authenticated",
            ))),
        }
    }
}
