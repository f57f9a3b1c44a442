use actix_middleware::{AuthClaims, JwtAuthMiddleware, TOKEN_COOKIE};
use actix_web::{cookie::Cookie, http::StatusCode, test, web, App, HttpResponse};
use chrono::Duration;
use std::sync::Once;
use uuid::Uuid;

fn init_secret() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        crypto_core::jwt::initialize_jwt_secret("middleware-test-secret-0123456789")
            .expect("init secret");
    });
}

async fn whoami(claims: AuthClaims) -> HttpResponse {
    HttpResponse::Ok().body(format!("{}:{}", claims.user_id, claims.role))
}

async fn public() -> HttpResponse {
    HttpResponse::Ok().body("public")
}

#[actix_web::test]
async fn test_bearer_token_attaches_claims() {
    init_secret();
    let user_id = Uuid::new_v4();
    let token = crypto_core::jwt::generate_token(user_id, "user", Duration::hours(1)).unwrap();

    let app = test::init_service(
        App::new()
            .wrap(JwtAuthMiddleware)
            .route("/me", web::get().to(whoami)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let body = test::call_and_read_body(&app, req).await;

    assert_eq!(body, format!("{user_id}:user").into_bytes());
}

#[actix_web::test]
async fn test_cookie_token_attaches_claims() {
    init_secret();
    let user_id = Uuid::new_v4();
    let token = crypto_core::jwt::generate_token(user_id, "admin", Duration::hours(1)).unwrap();

    let app = test::init_service(
        App::new()
            .wrap(JwtAuthMiddleware)
            .route("/me", web::get().to(whoami)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/me")
        .cookie(Cookie::new(TOKEN_COOKIE, token))
        .to_request();
    let body = test::call_and_read_body(&app, req).await;

    assert_eq!(body, format!("{user_id}:admin").into_bytes());
}

#[actix_web::test]
async fn test_missing_or_invalid_token_passes_through_unauthenticated() {
    init_secret();

    let app = test::init_service(
        App::new()
            .wrap(JwtAuthMiddleware)
            .route("/me", web::get().to(whoami))
            .route("/public", web::get().to(public)),
    )
    .await;

    let req = test::TestRequest::get().uri("/public").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/me")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
