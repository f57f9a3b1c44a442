use super::memory::paginate;
use super::{MemoryStore, PgStore};
use crate::error::{AppError, Result};
use crate::models::{Follow, FollowRequest, Page, RequestStatus, Role, User, UserSummary};
use uuid::Uuid;

/// Follow requests and accepted follow edges
#[async_trait::async_trait]
pub trait SocialGraphRepository: Send + Sync {
    async fn find_follow_request(&self, id: Uuid) -> Result<Option<FollowRequest>>;

    /// The pending request `follower_id -> following_id`, if any
    async fn pending_follow_request(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Option<FollowRequest>>;

    /// Insert a pending request. Any existing request for the ordered pair,
    /// whatever its status, surfaces as [`AppError::Conflict`].
    async fn create_follow_request(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        message: String,
    ) -> Result<FollowRequest>;

    /// Flip a pending request to accepted, materialize the edge and bump both
    /// counters atomically. `None` when the request is not pending.
    async fn accept_follow_request(&self, id: Uuid) -> Result<Option<FollowRequest>>;

    /// Flip a pending request to rejected. `None` when the request is not
    /// pending.
    async fn reject_follow_request(&self, id: Uuid) -> Result<Option<FollowRequest>>;

    /// Pending requests addressed to `user_id`, newest first
    async fn received_follow_requests(&self, user_id: Uuid) -> Result<Vec<FollowRequest>>;

    /// Pending requests sent by `user_id`, newest first
    async fn sent_follow_requests(&self, user_id: Uuid) -> Result<Vec<FollowRequest>>;

    async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool>;

    /// Create the edge directly (follow-back) with counters, settling any
    /// pending request for the same pair. Returns false if the edge existed.
    async fn create_follow_edge(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool>;

    /// Remove the edge, decrement both counters and drop the accepted request
    /// for the pair. Returns false if absent.
    async fn delete_follow_edge(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool>;

    /// Accounts following `user_id`, newest edge first, with the total
    async fn followers(&self, user_id: Uuid, page: Option<Page>)
        -> Result<(Vec<UserSummary>, i64)>;

    /// Accounts `user_id` follows, newest edge first, with the total
    async fn following(&self, user_id: Uuid, page: Option<Page>)
        -> Result<(Vec<UserSummary>, i64)>;

    /// Accounts that follow `user_id` and are followed back
    async fn mutual_follows(&self, user_id: Uuid) -> Result<Vec<UserSummary>>;

    /// Regular, non-banned accounts with no edge and no pending or accepted
    /// request with `user_id` in either direction, newest first
    async fn people_you_may_know(&self, user_id: Uuid, limit: i64) -> Result<Vec<UserSummary>>;
}

#[async_trait::async_trait]
impl SocialGraphRepository for PgStore {
    async fn find_follow_request(&self, id: Uuid) -> Result<Option<FollowRequest>> {
        let request =
            sqlx::query_as::<_, FollowRequest>("SELECT * FROM follow_requests WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(request)
    }

    async fn pending_follow_request(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Option<FollowRequest>> {
        let request = sqlx::query_as::<_, FollowRequest>(
            r#"
            SELECT * FROM follow_requests
            WHERE follower_id = $1 AND following_id = $2 AND status = 'pending'
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(request)
    }

    async fn create_follow_request(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        message: String,
    ) -> Result<FollowRequest> {
        let request = sqlx::query_as::<_, FollowRequest>(
            r#"
            INSERT INTO follow_requests (id, follower_id, following_id, status, message)
            VALUES ($1, $2, $3, 'pending', $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(follower_id)
        .bind(following_id)
        .bind(message)
        .fetch_one(self.pool())
        .await?;
        Ok(request)
    }

    async fn accept_follow_request(&self, id: Uuid) -> Result<Option<FollowRequest>> {
        let mut tx = self.pool().begin().await?;

        let accepted = sqlx::query_as::<_, FollowRequest>(
            r#"
            UPDATE follow_requests SET status = 'accepted', updated_at = NOW()
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

        let inserted = sqlx::query(
            r#"
            INSERT INTO follows (id, follower_id, following_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.follower_id)
        .bind(request.following_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted > 0 {
            bump_follow_counters(&mut tx, request.follower_id, request.following_id, 1).await?;
        }

        tx.commit().await?;
        Ok(Some(request))
    }

    async fn reject_follow_request(&self, id: Uuid) -> Result<Option<FollowRequest>> {
        let request = sqlx::query_as::<_, FollowRequest>(
            r#"
            UPDATE follow_requests SET status = 'rejected', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(request)
    }

    async fn received_follow_requests(&self, user_id: Uuid) -> Result<Vec<FollowRequest>> {
        let requests = sqlx::query_as::<_, FollowRequest>(
            r#"
            SELECT * FROM follow_requests
            WHERE following_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(requests)
    }

    async fn sent_follow_requests(&self, user_id: Uuid) -> Result<Vec<FollowRequest>> {
        let requests = sqlx::query_as::<_, FollowRequest>(
            r#"
            SELECT * FROM follow_requests
            WHERE follower_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(requests)
    }

    async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(self.pool())
        .await?;
        Ok(exists)
    }

    async fn create_follow_edge(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO follows (id, follower_id, following_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(follower_id)
        .bind(following_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        bump_follow_counters(&mut tx, follower_id, following_id, 1).await?;

        sqlx::query(
            r#"
            UPDATE follow_requests SET status = 'accepted', updated_at = NOW()
            WHERE follower_id = $1 AND following_id = $2 AND status = 'pending'
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_follow_edge(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let mut tx = self.pool().begin().await?;

        let deleted = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower_id)
            .bind(following_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        bump_follow_counters(&mut tx, follower_id, following_id, -1).await?;

        // Frees the pair for a fresh request; rejected rows stay terminal
        sqlx::query(
            r#"
            DELETE FROM follow_requests
            WHERE follower_id = $1 AND following_id = $2 AND status = 'accepted'
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn followers(
        &self,
        user_id: Uuid,
        page: Option<Page>,
    ) -> Result<(Vec<UserSummary>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE following_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await?;

        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.username, u.avatar_url, u.bio
            FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = $1
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.map(|p| p.limit))
        .bind(page.map(|p| p.offset()).unwrap_or(0))
        .fetch_all(self.pool())
        .await?;

        Ok((users, total))
    }

    async fn following(
        &self,
        user_id: Uuid,
        page: Option<Page>,
    ) -> Result<(Vec<UserSummary>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await?;

        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.username, u.avatar_url, u.bio
            FROM follows f
            JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = $1
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.map(|p| p.limit))
        .bind(page.map(|p| p.offset()).unwrap_or(0))
        .fetch_all(self.pool())
        .await?;

        Ok((users, total))
    }

    async fn mutual_follows(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.username, u.avatar_url, u.bio
            FROM follows outgoing
            JOIN follows incoming
              ON incoming.follower_id = outgoing.following_id
             AND incoming.following_id = outgoing.follower_id
            JOIN users u ON u.id = outgoing.following_id
            WHERE outgoing.follower_id = $1
            ORDER BY u.name
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(users)
    }

    async fn people_you_may_know(&self, user_id: Uuid, limit: i64) -> Result<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.username, u.avatar_url, u.bio
            FROM users u
            WHERE u.id <> $1
              AND u.role = 'user'
              AND u.is_banned = FALSE
              AND NOT EXISTS (
                  SELECT 1 FROM follows f
                  WHERE (f.follower_id = $1 AND f.following_id = u.id)
                     OR (f.follower_id = u.id AND f.following_id = $1)
              )
              AND NOT EXISTS (
                  SELECT 1 FROM follow_requests r
                  WHERE r.status IN ('pending', 'accepted')
                    AND ((r.follower_id = $1 AND r.following_id = u.id)
                      OR (r.follower_id = u.id AND r.following_id = $1))
              )
            ORDER BY u.created_at DESC
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

/// Adjust `following_count` of the follower and `followers_count` of the
/// followed account by `delta`
async fn bump_follow_counters(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    follower_id: Uuid,
    following_id: Uuid,
    delta: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users SET following_count = GREATEST(following_count + $2, 0), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(follower_id)
    .bind(delta)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE users SET followers_count = GREATEST(followers_count + $2, 0), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(following_id)
    .bind(delta)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait::async_trait]
impl SocialGraphRepository for MemoryStore {
    async fn find_follow_request(&self, id: Uuid) -> Result<Option<FollowRequest>> {
        Ok(self.state.read().await.follow_requests.get(&id).cloned())
    }

    async fn pending_follow_request(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Option<FollowRequest>> {
        let state = self.state.read().await;
        Ok(state
            .follow_requests
            .values()
            .find(|r| {
                r.follower_id == follower_id
                    && r.following_id == following_id
                    && r.status == RequestStatus::Pending
            })
            .cloned())
    }

    async fn create_follow_request(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        message: String,
    ) -> Result<FollowRequest> {
        let mut state = self.state.write().await;
        let duplicate = state
            .follow_requests
            .values()
            .any(|r| r.follower_id == follower_id && r.following_id == following_id);
        if duplicate {
            return Err(AppError::Conflict(
                "Duplicate field value entered".to_string(),
            ));
        }

        let now = state.now();
        let request = FollowRequest {
            id: Uuid::new_v4(),
            follower_id,
            following_id,
            status: RequestStatus::Pending,
            message,
            created_at: now,
            updated_at: now,
        };
        state.follow_requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn accept_follow_request(&self, id: Uuid) -> Result<Option<FollowRequest>> {
        let mut state = self.state.write().await;
        let now = state.now();

        let request = match state.follow_requests.get_mut(&id) {
            Some(r) if r.status == RequestStatus::Pending => {
                r.status = RequestStatus::Accepted;
                r.updated_at = now;
                r.clone()
            }
            _ => return Ok(None),
        };

        if !state.is_following(request.follower_id, request.following_id) {
            state.follows.push(Follow {
                id: Uuid::new_v4(),
                follower_id: request.follower_id,
                following_id: request.following_id,
                created_at: now,
            });
            state.with_user(request.follower_id, |u| u.following_count += 1);
            state.with_user(request.following_id, |u| u.followers_count += 1);
        }

        Ok(Some(request))
    }

    async fn reject_follow_request(&self, id: Uuid) -> Result<Option<FollowRequest>> {
        let mut state = self.state.write().await;
        let now = state.now();
        match state.follow_requests.get_mut(&id) {
            Some(r) if r.status == RequestStatus::Pending => {
                r.status = RequestStatus::Rejected;
                r.updated_at = now;
                Ok(Some(r.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn received_follow_requests(&self, user_id: Uuid) -> Result<Vec<FollowRequest>> {
        let state = self.state.read().await;
        let mut requests: Vec<FollowRequest> = state
            .follow_requests
            .values()
            .filter(|r| r.following_id == user_id && r.status == RequestStatus::Pending)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn sent_follow_requests(&self, user_id: Uuid) -> Result<Vec<FollowRequest>> {
        let state = self.state.read().await;
        let mut requests: Vec<FollowRequest> = state
            .follow_requests
            .values()
            .filter(|r| r.follower_id == user_id && r.status == RequestStatus::Pending)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .is_following(follower_id, following_id))
    }

    async fn create_follow_edge(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.is_following(follower_id, following_id) {
            return Ok(false);
        }

        let now = state.now();
        state.follows.push(Follow {
            id: Uuid::new_v4(),
            follower_id,
            following_id,
            created_at: now,
        });
        state.with_user(follower_id, |u| u.following_count += 1);
        state.with_user(following_id, |u| u.followers_count += 1);

        for request in state.follow_requests.values_mut() {
            if request.follower_id == follower_id
                && request.following_id == following_id
                && request.status == RequestStatus::Pending
            {
                request.status = RequestStatus::Accepted;
                request.updated_at = now;
            }
        }
        Ok(true)
    }

    async fn delete_follow_edge(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.following_id == following_id));
        if state.follows.len() == before {
            return Ok(false);
        }

        state.with_user(follower_id, |u| {
            u.following_count = (u.following_count - 1).max(0)
        });
        state.with_user(following_id, |u| {
            u.followers_count = (u.followers_count - 1).max(0)
        });
        state.follow_requests.retain(|_, r| {
            !(r.follower_id == follower_id
                && r.following_id == following_id
                && r.status == RequestStatus::Accepted)
        });
        Ok(true)
    }

    async fn followers(
        &self,
        user_id: Uuid,
        page: Option<Page>,
    ) -> Result<(Vec<UserSummary>, i64)> {
        let state = self.state.read().await;
        let mut edges: Vec<&Follow> = state
            .follows
            .iter()
            .filter(|f| f.following_id == user_id)
            .collect();
        edges.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let users: Vec<UserSummary> = edges
            .iter()
            .filter_map(|f| state.users.get(&f.follower_id).map(User::summary))
            .collect();
        let total = users.len() as i64;
        Ok((paginate(users, page), total))
    }

    async fn following(
        &self,
        user_id: Uuid,
        page: Option<Page>,
    ) -> Result<(Vec<UserSummary>, i64)> {
        let state = self.state.read().await;
        let mut edges: Vec<&Follow> = state
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .collect();
        edges.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let users: Vec<UserSummary> = edges
            .iter()
            .filter_map(|f| state.users.get(&f.following_id).map(User::summary))
            .collect();
        let total = users.len() as i64;
        Ok((paginate(users, page), total))
    }

    async fn mutual_follows(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        let state = self.state.read().await;
        let mut users: Vec<UserSummary> = state
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id && state.is_following(f.following_id, user_id))
            .filter_map(|f| state.users.get(&f.following_id).map(User::summary))
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn people_you_may_know(&self, user_id: Uuid, limit: i64) -> Result<Vec<UserSummary>> {
        let state = self.state.read().await;
        let connected = |other: Uuid| {
            state.is_following(user_id, other)
                || state.is_following(other, user_id)
                || state.follow_requests.values().any(|r| {
                    r.status != RequestStatus::Rejected
                        && ((r.follower_id == user_id && r.following_id == other)
                            || (r.follower_id == other && r.following_id == user_id))
                })
        };

        let mut candidates: Vec<&User> = state
            .users
            .values()
            .filter(|u| {
                u.id != user_id && u.role == Role::User && !u.is_banned && !connected(u.id)
            })
            .collect();
        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(candidates
            .into_iter()
            .take(limit.max(0) as usize)
            .map(User::summary)
            .collect())
    }
}
