use super::{MemoryStore, PgStore};
use crate::error::{AppError, Result};
use crate::models::{FriendRequest, Friendship, RequestStatus, User, UserSummary};
use uuid::Uuid;

/// Friend requests and symmetric friendships
#[async_trait::async_trait]
pub trait FriendRepository: Send + Sync {
    async fn find_friend_request(&self, id: Uuid) -> Result<Option<FriendRequest>>;

    /// Pending request between `a` and `b` in either direction
    async fn pending_friend_request_between(&self, a: Uuid, b: Uuid)
        -> Result<Option<FriendRequest>>;

    async fn create_friend_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        message: String,
    ) -> Result<FriendRequest>;

    /// Flip to accepted, create the friendship and bump both `friends_count`
    /// in one step. `None` when the request is not pending.
    async fn accept_friend_request(&self, id: Uuid) -> Result<Option<FriendRequest>>;

    async fn reject_friend_request(&self, id: Uuid) -> Result<Option<FriendRequest>>;

    async fn received_friend_requests(&self, user_id: Uuid) -> Result<Vec<FriendRequest>>;

    async fn sent_friend_requests(&self, user_id: Uuid) -> Result<Vec<FriendRequest>>;

    async fn are_friends(&self, a: Uuid, b: Uuid) -> Result<bool>;

    async fn friends(&self, user_id: Uuid) -> Result<Vec<UserSummary>>;

    /// Delete the friendship and decrement both counters. False if absent.
    async fn remove_friend(&self, user_id: Uuid, friend_id: Uuid) -> Result<bool>;

    /// Active, non-banned strangers ordered by follower count
    async fn friend_suggestions(&self, user_id: Uuid, limit: i64) -> Result<Vec<UserSummary>>;
}

#[async_trait::async_trait]
impl FriendRepository for PgStore {
    async fn find_friend_request(&self, id: Uuid) -> Result<Option<FriendRequest>> {
        let request =
            sqlx::query_as::<_, FriendRequest>("SELECT * FROM friend_requests WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(request)
    }

    async fn pending_friend_request_between(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> Result<Option<FriendRequest>> {
        let request = sqlx::query_as::<_, FriendRequest>(
            r#"
            SELECT * FROM friend_requests
            WHERE status = 'pending'
              AND ((sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1))
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(self.pool())
        .await?;
        Ok(request)
    }

    async fn create_friend_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        message: String,
    ) -> Result<FriendRequest> {
        let request = sqlx::query_as::<_, FriendRequest>(
            r#"
            INSERT INTO friend_requests (id, sender_id, receiver_id, status, message)
            VALUES ($1, $2, $3, 'pending', $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(sender_id)
        .bind(receiver_id)
        .bind(message)
        .fetch_one(self.pool())
        .await?;
        Ok(request)
    }

    async fn accept_friend_request(&self, id: Uuid) -> Result<Option<FriendRequest>> {
        let mut tx = self.pool().begin().await?;

        let accepted = sqlx::query_as::<_, FriendRequest>(
            r#"
            UPDATE friend_requests SET status = 'accepted', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(request) = accepted else {
            tx.rollback().await?;
            return Ok(None);
        };

        let (low, high) = Friendship::key(request.sender_id, request.receiver_id);
        let inserted = sqlx::query(
            r#"
            INSERT INTO friendships (user_low, user_high)
            VALUES ($1, $2)
            ON CONFLICT (user_low, user_high) DO NOTHING
            "#,
        )
        .bind(low)
        .bind(high)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted > 0 {
            sqlx::query(
                "UPDATE users SET friends_count = friends_count + 1, updated_at = NOW() WHERE id IN ($1, $2)",
            )
            .bind(low)
            .bind(high)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(request))
    }

    async fn reject_friend_request(&self, id: Uuid) -> Result<Option<FriendRequest>> {
        let request = sqlx::query_as::<_, FriendRequest>(
            r#"
            UPDATE friend_requests SET status = 'rejected', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(request)
    }

    async fn received_friend_requests(&self, user_id: Uuid) -> Result<Vec<FriendRequest>> {
        let requests = sqlx::query_as::<_, FriendRequest>(
            r#"
            SELECT * FROM friend_requests
            WHERE receiver_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(requests)
    }

    async fn sent_friend_requests(&self, user_id: Uuid) -> Result<Vec<FriendRequest>> {
        let requests = sqlx::query_as::<_, FriendRequest>(
            r#"
            SELECT * FROM friend_requests
            WHERE sender_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(requests)
    }

    async fn are_friends(&self, a: Uuid, b: Uuid) -> Result<bool> {
        let (low, high) = Friendship::key(a, b);
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM friendships WHERE user_low = $1 AND user_high = $2)",
        )
        .bind(low)
        .bind(high)
        .fetch_one(self.pool())
        .await?;
        Ok(exists)
    }

    async fn friends(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.username, u.avatar_url, u.bio
            FROM friendships f
            JOIN users u
              ON u.id = CASE WHEN f.user_low = $1 THEN f.user_high ELSE f.user_low END
            WHERE f.user_low = $1 OR f.user_high = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(users)
    }

    async fn remove_friend(&self, user_id: Uuid, friend_id: Uuid) -> Result<bool> {
        let (low, high) = Friendship::key(user_id, friend_id);
        let mut tx = self.pool().begin().await?;

        let deleted = sqlx::query("DELETE FROM friendships WHERE user_low = $1 AND user_high = $2")
            .bind(low)
            .bind(high)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE users SET friends_count = GREATEST(friends_count - 1, 0), updated_at = NOW()
            WHERE id IN ($1, $2)
            "#,
        )
        .bind(low)
        .bind(high)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn friend_suggestions(&self, user_id: Uuid, limit: i64) -> Result<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.username, u.avatar_url, u.bio
            FROM users u
            WHERE u.id <> $1
              AND u.is_active = TRUE
              AND u.is_banned = FALSE
              AND NOT EXISTS (
                  SELECT 1 FROM friendships f
                  WHERE (f.user_low = $1 AND f.user_high = u.id)
                     OR (f.user_high = $1 AND f.user_low = u.id)
              )
            ORDER BY u.followers_count DESC, u.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(users)
    }
}

#[async_trait::async_trait]
impl FriendRepository for MemoryStore {
    async fn find_friend_request(&self, id: Uuid) -> Result<Option<FriendRequest>> {
        Ok(self.state.read().await.friend_requests.get(&id).cloned())
    }

    async fn pending_friend_request_between(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> Result<Option<FriendRequest>> {
        let state = self.state.read().await;
        Ok(state
            .friend_requests
            .values()
            .find(|r| {
                r.status == RequestStatus::Pending
                    && ((r.sender_id == a && r.receiver_id == b)
                        || (r.sender_id == b && r.receiver_id == a))
            })
            .cloned())
    }

    async fn create_friend_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        message: String,
    ) -> Result<FriendRequest> {
        let mut state = self.state.write().await;
        let duplicate = state.friend_requests.values().any(|r| {
            r.status == RequestStatus::Pending
                && Friendship::key(r.sender_id, r.receiver_id)
                    == Friendship::key(sender_id, receiver_id)
        });
        if duplicate {
            return Err(AppError::Conflict(
                "Duplicate field value entered".to_string(),
            ));
        }

        let now = state.now();
        let request = FriendRequest {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            status: RequestStatus::Pending,
            message,
            created_at: now,
            updated_at: now,
        };
        state.friend_requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn accept_friend_request(&self, id: Uuid) -> Result<Option<FriendRequest>> {
        let mut state = self.state.write().await;
        let now = state.now();

        let request = match state.friend_requests.get_mut(&id) {
            Some(r) if r.status == RequestStatus::Pending => {
                r.status = RequestStatus::Accepted;
                r.updated_at = now;
                r.clone()
            }
            _ => return Ok(None),
        };

        if !state.are_friends(request.sender_id, request.receiver_id) {
            let (user_low, user_high) = Friendship::key(request.sender_id, request.receiver_id);
            state.friendships.push(Friendship {
                user_low,
                user_high,
                created_at: now,
            });
            state.with_user(user_low, |u| u.friends_count += 1);
            state.with_user(user_high, |u| u.friends_count += 1);
        }

        Ok(Some(request))
    }

    async fn reject_friend_request(&self, id: Uuid) -> Result<Option<FriendRequest>> {
        let mut state = self.state.write().await;
        let now = state.now();
        match state.friend_requests.get_mut(&id) {
            Some(r) if r.status == RequestStatus::Pending => {
                r.status = RequestStatus::Rejected;
                r.updated_at = now;
                Ok(Some(r.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn received_friend_requests(&self, user_id: Uuid) -> Result<Vec<FriendRequest>> {
        let state = self.state.read().await;
        let mut requests: Vec<FriendRequest> = state
            .friend_requests
            .values()
            .filter(|r| r.receiver_id == user_id && r.status == RequestStatus::Pending)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn sent_friend_requests(&self, user_id: Uuid) -> Result<Vec<FriendRequest>> {
        let state = self.state.read().await;
        let mut requests: Vec<FriendRequest> = state
            .friend_requests
            .values()
            .filter(|r| r.sender_id == user_id && r.status == RequestStatus::Pending)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn are_friends(&self, a: Uuid, b: Uuid) -> Result<bool> {
        Ok(self.state.read().await.are_friends(a, b))
    }

    async fn friends(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        let state = self.state.read().await;
        let mut edges: Vec<&Friendship> = state
            .friendships
            .iter()
            .filter(|f| f.involves(user_id))
            .collect();
        edges.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(edges
            .iter()
            .filter_map(|f| state.users.get(&f.other(user_id)).map(User::summary))
            .collect())
    }

    async fn remove_friend(&self, user_id: Uuid, friend_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let (low, high) = Friendship::key(user_id, friend_id);
        let before = state.friendships.len();
        state
            .friendships
            .retain(|f| !(f.user_low == low && f.user_high == high));
        if state.friendships.len() == before {
            return Ok(false);
        }

        state.with_user(low, |u| u.friends_count = (u.friends_count - 1).max(0));
        state.with_user(high, |u| u.friends_count = (u.friends_count - 1).max(0));
        Ok(true)
    }

    async fn friend_suggestions(&self, user_id: Uuid, limit: i64) -> Result<Vec<UserSummary>> {
        let state = self.state.read().await;
        let mut candidates: Vec<&User> = state
            .users
            .values()
            .filter(|u| {
                u.id != user_id && u.is_active && !u.is_banned && !state.are_friends(user_id, u.id)
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.followers_count
                .cmp(&a.followers_count)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(candidates
            .into_iter()
            .take(limit.max(0) as usize)
            .map(User::summary)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, Role};
    use crate::repository::UserRepository;

    async fn seed_user(store: &MemoryStore, name: &str) -> User {
        store
            .create_user(NewUser {
                name: name.to_string(),
                username: None,
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_accept_creates_symmetric_friendship() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "Alice").await;
        let bob = seed_user(&store, "Bob").await;

        let request = store
            .create_friend_request(alice.id, bob.id, String::new())
            .await
            .unwrap();
        assert!(store.accept_friend_request(request.id).await.unwrap().is_some());
        assert!(store.accept_friend_request(request.id).await.unwrap().is_none());

        assert!(store.are_friends(bob.id, alice.id).await.unwrap());
        let friends = store.friends(bob.id).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].id, alice.id);

        let alice = store.find_user(alice.id).await.unwrap().unwrap();
        assert_eq!(alice.friends_count, 1);
    }

    #[tokio::test]
    async fn test_pending_request_is_unique_per_unordered_pair() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "Alice").await;
        let bob = seed_user(&store, "Bob").await;

        store
            .create_friend_request(alice.id, bob.id, String::new())
            .await
            .unwrap();
        let err = store
            .create_friend_request(bob.id, alice.id, String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(store
            .pending_friend_request_between(bob.id, alice.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_remove_friend_and_suggestions() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "Alice").await;
        let bob = seed_user(&store, "Bob").await;
        let carol = seed_user(&store, "Carol").await;

        let request = store
            .create_friend_request(alice.id, bob.id, String::new())
            .await
            .unwrap();
        store.accept_friend_request(request.id).await.unwrap();

        let suggestions = store.friend_suggestions(alice.id, 10).await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].id, carol.id);

        assert!(store.remove_friend(bob.id, alice.id).await.unwrap());
        assert!(!store.remove_friend(bob.id, alice.id).await.unwrap());
        let bob = store.find_user(bob.id).await.unwrap().unwrap();
        assert_eq!(bob.friends_count, 0);
    }
}
