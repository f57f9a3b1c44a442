/// PostgreSQL repository tests
///
/// Skipped unless `TEST_DATABASE_URL` points at a disposable database. Every
/// test creates its own users, so runs do not interfere with each other.
use blog_service::error::AppError;
use blog_service::models::{NewUser, Page, RequestStatus, Role, User};
use blog_service::repository::{
    MessageRepository, PgStore, SocialGraphRepository, Store, UserRepository,
};
use serial_test::serial;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn pg_store() -> Option<PgStore> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping PostgreSQL tests");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect postgres");
    let store = PgStore::new(pool);
    store.migrate().await.expect("run migrations");
    Some(store)
}

async fn seed_user(store: &PgStore, name: &str) -> User {
    let tag = Uuid::new_v4().simple().to_string();
    store
        .create_user(NewUser {
            name: name.to_string(),
            username: None,
            email: format!("{}-{}@example.com", name.to_lowercase(), tag),
            password_hash: "hash".to_string(),
            role: Role::User,
        })
        .await
        .expect("create user")
}

#[tokio::test]
#[serial]
async fn test_pg_ping_and_backend_name() {
    let Some(store) = pg_store().await else { return };

    store.ping().await.expect("ping");
    assert_eq!(store.backend_name(), "postgres");
}

#[tokio::test]
#[serial]
async fn test_pg_follow_request_lifecycle() {
    let Some(store) = pg_store().await else { return };
    let alice = seed_user(&store, "Alice").await;
    let bob = seed_user(&store, "Bob").await;

    let request = store
        .create_follow_request(alice.id, bob.id, "hi".to_string())
        .await
        .expect("create request");

    // Unique index on the ordered pair
    let err = store
        .create_follow_request(alice.id, bob.id, "again".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let accepted = store
        .accept_follow_request(request.id)
        .await
        .expect("accept")
        .expect("pending request");
    assert_eq!(accepted.status, RequestStatus::Accepted);
    assert!(store
        .accept_follow_request(request.id)
        .await
        .expect("second accept")
        .is_none());

    assert!(store.is_following(alice.id, bob.id).await.unwrap());
    let (followers, total) = store
        .followers(bob.id, Some(Page::new(1, 20)))
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(followers[0].id, alice.id);

    let bob = store.find_user(bob.id).await.unwrap().unwrap();
    assert_eq!(bob.followers_count, 1);

    assert!(store.delete_follow_edge(alice.id, bob.id).await.unwrap());
    let bob = store.find_user(bob.id).await.unwrap().unwrap();
    assert_eq!(bob.followers_count, 0);

    // Unfollow drops the accepted row so the pair can be requested again
    store
        .create_follow_request(alice.id, bob.id, "again".to_string())
        .await
        .expect("request after unfollow");
}

#[tokio::test]
#[serial]
async fn test_pg_rejected_request_is_terminal() {
    let Some(store) = pg_store().await else { return };
    let alice = seed_user(&store, "Alice").await;
    let bob = seed_user(&store, "Bob").await;

    let request = store
        .create_follow_request(alice.id, bob.id, "hi".to_string())
        .await
        .expect("create request");
    let rejected = store
        .reject_follow_request(request.id)
        .await
        .expect("reject")
        .expect("pending request");
    assert_eq!(rejected.status, RequestStatus::Rejected);

    let err = store
        .create_follow_request(alice.id, bob.id, "please".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
#[serial]
async fn test_pg_one_time_message_unique_per_pair() {
    let Some(store) = pg_store().await else { return };
    let alice = seed_user(&store, "Alice").await;
    let bob = seed_user(&store, "Bob").await;

    let first = store
        .create_one_time_message(alice.id, bob.id, "hello".to_string())
        .await
        .unwrap();
    assert!(first.is_some());

    let second = store
        .create_one_time_message(alice.id, bob.id, "hello again".to_string())
        .await
        .unwrap();
    assert!(second.is_none());

    let reverse = store
        .create_one_time_message(bob.id, alice.id, "hi".to_string())
        .await
        .unwrap();
    assert!(reverse.is_some());
}

#[tokio::test]
#[serial]
async fn test_pg_duplicate_email_conflicts() {
    let Some(store) = pg_store().await else { return };
    let alice = seed_user(&store, "Alice").await;

    let err = store
        .create_user(NewUser {
            name: "Copy".to_string(),
            username: None,
            email: alice.email.clone(),
            password_hash: "hash".to_string(),
            role: Role::User,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}
