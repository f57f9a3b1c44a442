/// HTTP tests for direct and one-time messages
mod common;

use actix_web::{http::StatusCode, test};
use common::{bearer, call_json, register, setup_app, test_state};
use serde_json::json;

#[actix_web::test]
async fn test_direct_message_conversation() {
    let app = setup_app(test_state().await).await;
    let (alice, alice_token) = register(&app, "Alice", "alice@example.com").await;
    let (bob, bob_token) = register(&app, "Bob", "bob@example.com").await;

    for content in ["hi bob", "are you there?"] {
        let (status, _) = call_json(
            &app,
            test::TestRequest::post()
                .uri("/api/messages/send")
                .insert_header(bearer(&alice_token))
                .set_json(json!({ "receiverId": bob, "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/messages/unread-count")
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(body["count"], 2);

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/messages/conversations")
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["user"]["id"], alice.to_string());
    assert_eq!(body["data"][0]["lastMessage"]["content"], "are you there?");
    assert_eq!(body["data"][0]["unreadCount"], 2);

    // Oldest first within a thread
    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/messages/{}", alice))
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(body["data"][0]["content"], "hi bob");
    assert_eq!(body["data"][1]["content"], "are you there?");

    let (status, _) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/messages/read/{}", alice))
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/messages/unread-count")
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(body["count"], 0);
}

#[actix_web::test]
async fn test_cannot_message_self_or_send_empty() {
    let app = setup_app(test_state().await).await;
    let (alice, token) = register(&app, "Alice", "alice@example.com").await;
    let (bob, _) = register(&app, "Bob", "bob@example.com").await;

    let (status, _) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/messages/send")
            .insert_header(bearer(&token))
            .set_json(json!({ "receiverId": alice, "content": "me" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/messages/send")
            .insert_header(bearer(&token))
            .set_json(json!({ "receiverId": bob, "content": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Message content is required");

    let (status, _) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/messages/send")
            .insert_header(bearer(&token))
            .set_json(json!({ "receiverId": uuid::Uuid::new_v4(), "content": "hello?" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_one_time_message_is_unique_per_pair() {
    let app = setup_app(test_state().await).await;
    let (alice, alice_token) = register(&app, "Alice", "alice@example.com").await;
    let (bob, bob_token) = register(&app, "Bob", "bob@example.com").await;

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/follow/one-time-message-status/{}", bob))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(body["data"], json!({ "canSend": true, "messageExists": false }));

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/messages/one-time")
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "receiverId": bob, "message": "Loved your post" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let message_id = body["data"]["id"].as_str().unwrap().to_string();

    // The follow alias shares the same uniqueness rule
    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/follow/one-time-message/{}", bob))
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "message": "Again" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "You have already sent a one-time message to this user"
    );

    // The reverse direction is a different pair
    let (status, _) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/messages/one-time")
            .insert_header(bearer(&bob_token))
            .set_json(json!({ "receiverId": alice, "message": "Thanks!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/messages/one-time/{}/read", message_id))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/messages/one-time/{}/read", message_id))
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isRead"], true);

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/messages/one-time/received")
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["sender"]["id"], alice.to_string());

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/messages/one-time")
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "receiverId": bob, "message": "x".repeat(201) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Message must be between 1 and 200 characters");
}
