//! Shared setup for blog-service HTTP integration tests
#![allow(dead_code)]

use actix_middleware::JwtAuthMiddleware;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{http::StatusCode, test, web, App};
use blog_service::config::{Config, EmailSettings};
use blog_service::repository::MemoryStore;
use blog_service::services::{AuthService, EmailService};
use blog_service::state::AppState;
use serde_json::{json, Value};
use std::sync::{Arc, Once};
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@miniblog.local";
pub const ADMIN_PASSWORD: &str = "ChangeMe123!";
pub const PASSWORD: &str = "secret123";

pub fn init_jwt() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        crypto_core::jwt::initialize_jwt_secret(&Config::in_memory().auth.jwt_secret)
            .expect("init jwt secret");
    });
}

/// Fresh state over an empty in-memory store with the admin seeded
pub async fn test_state() -> web::Data<AppState> {
    init_jwt();
    let store = Arc::new(MemoryStore::new());
    AuthService::new(store.clone())
        .seed_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("seed admin");

    let mailer = EmailService::new(&EmailSettings::default()).expect("log-only mailer");
    web::Data::new(AppState::new(store, mailer, Config::in_memory()))
}

pub async fn setup_app(
    state: web::Data<AppState>,
) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .app_data(state)
            .wrap(JwtAuthMiddleware)
            .configure(blog_service::configure_app),
    )
    .await
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// Register an account and return its id and session token
pub async fn register<S>(app: &S, name: &str, email: &str) -> (Uuid, String)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "name": name, "email": email, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED, "register {}", email);

    session_of(test::read_body_json(resp).await)
}

pub async fn login<S>(app: &S, email: &str, password: &str) -> (Uuid, String)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::OK, "login {}", email);

    session_of(test::read_body_json(resp).await)
}

fn session_of(body: Value) -> (Uuid, String) {
    let id = body["user"]["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("user id in auth response");
    let token = body["token"].as_str().expect("token").to_string();
    (id, token)
}

/// Issue a request and return status plus JSON body
pub async fn call_json<S>(app: &S, req: test::TestRequest) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("json body")
    };
    (status, value)
}
