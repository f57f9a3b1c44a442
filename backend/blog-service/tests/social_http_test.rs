/// HTTP tests for the follow request lifecycle and friendships
mod common;

use actix_web::{http::StatusCode, test};
use common::{bearer, call_json, register, setup_app, test_state};
use serde_json::json;

#[actix_web::test]
async fn test_follow_request_lifecycle() {
    let app = setup_app(test_state().await).await;
    let (alice, alice_token) = register(&app, "Alice", "alice@example.com").await;
    let (bob, bob_token) = register(&app, "Bob", "bob@example.com").await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/follow/request/{}", bob))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["message"], "Hi! I would like to follow you.");
    let request_id = body["data"]["id"].as_str().unwrap().to_string();

    // Pending request blocks a duplicate
    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/follow/request/{}", bob))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Follow request already sent");

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/follow/{}/status", bob))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(body["data"]["hasPendingRequest"], true);
    assert_eq!(body["data"]["isFollowing"], false);

    // Only the target may decide
    let (status, _) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/follow/accept/{}", request_id))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/follow/accept/{}", request_id))
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "accepted");

    let (status, body) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/follow/accept/{}", request_id))
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Request has already been processed");

    // An existing edge blocks new requests
    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/follow/request/{}", bob))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Already following this user");

    let (status, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/follow/{}/followers", bob))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["pages"], 1);
    assert_eq!(body["data"][0]["id"], alice.to_string());

    // Bob follows back, making the pair mutual
    let (status, _) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/follow/follow-back/{}", alice))
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/follow/connected-users")
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["id"], bob.to_string());

    let (status, _) = call_json(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/follow/{}", bob))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call_json(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/follow/{}", bob))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not following this user");
}

#[actix_web::test]
async fn test_rejected_follow_request_cannot_be_resent() {
    let app = setup_app(test_state().await).await;
    let (_, alice_token) = register(&app, "Alice", "alice@example.com").await;
    let (bob, bob_token) = register(&app, "Bob", "bob@example.com").await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/follow/request/{}", bob))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/follow/reject/{}", request_id))
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "rejected");

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/follow/request/{}", bob))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Follow request already sent");
}

#[actix_web::test]
async fn test_cannot_follow_self_or_missing_user() {
    let app = setup_app(test_state().await).await;
    let (alice, token) = register(&app, "Alice", "alice@example.com").await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/follow/request/{}", alice))
            .insert_header(bearer(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You cannot follow yourself");

    let (status, _) = call_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/follow/request/{}", uuid::Uuid::new_v4()))
            .insert_header(bearer(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/follow/request/not-a-uuid")
            .insert_header(bearer(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid identifier");
}

#[actix_web::test]
async fn test_friend_request_accept_and_remove() {
    let app = setup_app(test_state().await).await;
    let (alice, alice_token) = register(&app, "Alice", "alice@example.com").await;
    let (bob, bob_token) = register(&app, "Bob", "bob@example.com").await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/friends/request")
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "receiverId": bob })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/friends/requests/received")
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["sender"]["id"], alice.to_string());

    let (status, _) = call_json(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/friends/accept/{}", request_id))
            .insert_header(bearer(&bob_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/friends")
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["id"], bob.to_string());

    let (status, _) = call_json(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/friends/{}", bob))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call_json(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/friends/{}", bob))
            .insert_header(bearer(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Friend not found");
}
