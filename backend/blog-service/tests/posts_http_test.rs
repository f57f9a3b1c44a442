/// HTTP tests for post ownership, visibility and engagement
mod common;

use actix_web::{http::StatusCode, test};
use common::{bearer, call_json, login, register, setup_app, test_state, ADMIN_EMAIL, ADMIN_PASSWORD};
use serde_json::{json, Value};

async fn create_post<S>(app: &S, token: &str, body: Value) -> String
where
    S: actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
{
    let (status, body) = call_json(
        app,
        test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(bearer(token))
            .set_json(body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[actix_web::test]
async fn test_non_owner_cannot_mutate_post() {
    let app = setup_app(test_state().await).await;
    let (_, alice_token) = register(&app, "Alice", "alice@example.com").await;
    let (_, bob_token) = register(&app, "Bob", "bob@example.com").await;

    let post_id = create_post(
        &app,
        &alice_token,
        json!({ "title": "Hello", "content": "First post" }),
    )
    .await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/posts/{}", post_id))
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized to delete this post");

    let (status, body) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/posts/{}", post_id))
            .insert_header(bearer(&bob_token))
            .set_json(json!({ "title": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized to update this post");

    // Admins may delete any post
    let (_, admin_token) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (status, _) = call_json(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/posts/{}", post_id))
            .insert_header(bearer(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call_json(
        &app,
        test::TestRequest::get().uri(&format!("/api/posts/{}", post_id)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_drafts_hidden_until_published() {
    let app = setup_app(test_state().await).await;
    let (_, alice_token) = register(&app, "Alice", "alice@example.com").await;
    let (_, bob_token) = register(&app, "Bob", "bob@example.com").await;

    let post_id = create_post(
        &app,
        &alice_token,
        json!({ "title": "Draft", "content": "Not yet", "status": "draft" }),
    )
    .await;

    let (_, body) = call_json(&app, test::TestRequest::get().uri("/api/posts")).await;
    assert_eq!(body["total"], 0);

    let (status, _) = call_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/posts/{}", post_id))
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/posts/{}", post_id))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/posts/drafts")
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(body["count"], 1);

    let (status, body) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/posts/{}/publish", post_id))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "published");

    let (_, body) = call_json(&app, test::TestRequest::get().uri("/api/posts")).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["author"]["name"], "Alice");
}

#[actix_web::test]
async fn test_like_toggle_and_comments() {
    let app = setup_app(test_state().await).await;
    let (_, alice_token) = register(&app, "Alice", "alice@example.com").await;
    let (bob, bob_token) = register(&app, "Bob", "bob@example.com").await;

    let post_id = create_post(
        &app,
        &alice_token,
        json!({ "title": "Hello", "content": "Like me", "tags": ["rust", "rust"] }),
    )
    .await;

    let like_uri = format!("/api/posts/{}/like", post_id);
    let (_, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&like_uri)
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(body["data"], json!({ "likesCount": 1, "liked": true }));

    let (_, body) = call_json(
        &app,
        test::TestRequest::get().uri(&format!("/api/posts/{}/likes", post_id)),
    )
    .await;
    assert_eq!(body["data"][0]["id"], bob.to_string());

    let (_, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&like_uri)
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(body["data"], json!({ "likesCount": 0, "liked": false }));

    let comments_uri = format!("/api/posts/{}/comments", post_id);
    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&comments_uri)
            .insert_header(bearer(&bob_token))
            .set_json(json!({ "content": "Nice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let parent_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&comments_uri)
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "content": "Thanks", "parentId": parent_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&comments_uri)
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "content": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("between 1 and 500"));

    let (_, body) = call_json(&app, test::TestRequest::get().uri(&comments_uri)).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["replies"].as_array().unwrap().len(), 1);

    let (_, body) = call_json(
        &app,
        test::TestRequest::get().uri(&format!("/api/posts/{}", post_id)),
    )
    .await;
    assert_eq!(body["data"]["commentsCount"], 2);
    assert_eq!(body["data"]["tags"], json!(["rust"]));
}

#[actix_web::test]
async fn test_reshare_and_bookmarks() {
    let app = setup_app(test_state().await).await;
    let (_, alice_token) = register(&app, "Alice", "alice@example.com").await;
    let (_, bob_token) = register(&app, "Bob", "bob@example.com").await;

    let post_id = create_post(
        &app,
        &alice_token,
        json!({ "title": "Original", "content": "Worth sharing" }),
    )
    .await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/posts/{}/reshare", post_id))
            .insert_header(bearer(&bob_token))
            .set_json(json!({ "reShareComment": "Read this" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["title"], "Re-shared: Original");
    assert_eq!(body["data"]["isReShare"], true);

    let (status, _) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/bookmarks")
            .insert_header(bearer(&bob_token))
            .set_json(json!({ "postId": post_id, "note": "later" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/bookmarks")
            .insert_header(bearer(&bob_token))
            .set_json(json!({ "postId": post_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Post already bookmarked");

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/bookmarks")
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(body["total"], 1);

    let (status, _) = call_json(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/bookmarks/{}", post_id))
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call_json(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/bookmarks/{}", post_id))
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Bookmark not found");
}
