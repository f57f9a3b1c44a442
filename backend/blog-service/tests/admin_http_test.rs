/// HTTP tests for admin-only routes, bans and public health endpoints
mod common;

use actix_web::{http::StatusCode, test};
use common::{
    bearer, call_json, login, register, setup_app, test_state, ADMIN_EMAIL, ADMIN_PASSWORD,
    PASSWORD,
};
use serde_json::json;

#[actix_web::test]
async fn test_admin_routes_reject_regular_users() {
    let app = setup_app(test_state().await).await;
    let (_, token) = register(&app, "Alice", "alice@example.com").await;

    for uri in ["/api/admin/stats", "/api/admin/users", "/api/users"] {
        let (status, body) = call_json(
            &app,
            test::TestRequest::get().uri(uri).insert_header(bearer(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(
            body["message"],
            "User role user is not authorized to access this route"
        );
    }

    // The leaderboard is public
    let (status, body) = call_json(&app, test::TestRequest::get().uri("/api/admin/leaderboard")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["mostLikedPosts"].is_array());
}

#[actix_web::test]
async fn test_ban_blocks_login_and_existing_sessions() {
    let app = setup_app(test_state().await).await;
    let (alice, alice_token) = register(&app, "Alice", "alice@example.com").await;
    let (admin, admin_token) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/admin/users/{}/ban", alice))
            .insert_header(bearer(&admin_token))
            .set_json(json!({ "reason": "spam" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User banned successfully");
    assert_eq!(body["data"]["banReason"], "spam");

    let (status, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Your account has been banned");

    let (status, _) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "alice@example.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/admin/users?status=banned")
            .insert_header(bearer(&admin_token)),
    )
    .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["id"], alice.to_string());

    // Admins are immune
    let (status, body) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/admin/users/{}/ban", admin))
            .insert_header(bearer(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot ban admin users");

    let (status, body) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/admin/users/{}/ban", alice))
            .insert_header(bearer(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User unbanned successfully");
    login(&app, "alice@example.com", PASSWORD).await;
}

#[actix_web::test]
async fn test_stats_and_comment_takedown() {
    let app = setup_app(test_state().await).await;
    let (_, alice_token) = register(&app, "Alice", "alice@example.com").await;
    let (_, admin_token) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (_, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "title": "Hello", "content": "World" })),
    )
    .await;
    let post_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/posts/{}/comments", post_id))
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "content": "first" })),
    )
    .await;
    let comment_id = body["data"]["id"].as_str().unwrap().to_string();

    call_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/posts/{}/comments", post_id))
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "content": "reply", "parentId": comment_id })),
    )
    .await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/admin/stats")
            .insert_header(bearer(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stats"]["totalUsers"], 2);
    assert_eq!(body["data"]["stats"]["publishedPosts"], 1);
    assert_eq!(body["data"]["stats"]["totalComments"], 2);

    let (status, body) = call_json(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/admin/comments/{}", comment_id))
            .insert_header(bearer(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], 2);

    let (_, body) = call_json(
        &app,
        test::TestRequest::get().uri(&format!("/api/posts/{}", post_id)),
    )
    .await;
    assert_eq!(body["data"]["commentsCount"], 0);

    let (status, body) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/admin/posts/{}/feature", post_id))
            .insert_header(bearer(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Post featured successfully");
}

#[actix_web::test]
async fn test_health_reports_storage() {
    let app = setup_app(test_state().await).await;

    let (status, body) = call_json(&app, test::TestRequest::get().uri("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["onlineUsers"], 0);

    let (status, _) = call_json(&app, test::TestRequest::get().uri("/api/health/live")).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn test_events_require_fields() {
    let app = setup_app(test_state().await).await;
    let (_, token) = register(&app, "Alice", "alice@example.com").await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/events")
            .insert_header(bearer(&token))
            .set_json(json!({ "title": "Meetup" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "title, description and date are required");

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/events")
            .insert_header(bearer(&token))
            .set_json(json!({
                "title": "Meetup",
                "description": "Rust and coffee",
                "date": "2099-01-01T18:00:00Z",
                "location": "Library"
            })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let event_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = call_json(&app, test::TestRequest::get().uri("/api/events")).await;
    assert_eq!(body["count"], 1);

    let (status, body) = call_json(
        &app,
        test::TestRequest::get().uri(&format!("/api/events/{}", event_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["name"], "Alice");
}
