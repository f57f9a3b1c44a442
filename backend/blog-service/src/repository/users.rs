use super::{like_pattern, MemoryStore, PgStore};
use crate::error::Result;
use crate::models::{NewUser, Page, User, UserChanges, UserFilter, UserStatusFilter, UserSummary};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

/// Accounts and profile data
#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Lookup by (lowercased) email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Author cards for a set of ids; unknown ids are skipped
    async fn user_summaries(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>>;

    /// Apply a partial update, returning the updated account
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>>;

    /// Delete an account and everything it owns, fixing counters on the
    /// accounts and posts it touched
    async fn delete_user(&self, id: Uuid) -> Result<bool>;

    /// Filtered listing, newest first. Returns the page and the total count.
    async fn list_users(&self, filter: &UserFilter, page: Page) -> Result<(Vec<User>, i64)>;

    /// Store (or clear) a hashed password reset token
    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Account holding `token_hash` whose token expires after `now`
    async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>>;

    /// Ban or unban; banning records the reason and date, unbanning clears both
    async fn set_ban(&self, id: Uuid, banned: bool, reason: Option<String>)
        -> Result<Option<User>>;

    /// (total accounts, banned accounts)
    async fn user_counts(&self) -> Result<(i64, i64)>;

    async fn recent_users(&self, limit: i64) -> Result<Vec<User>>;

    /// Non-banned accounts ordered by posts + likes given + comments
    async fn most_active_users(&self, limit: i64) -> Result<Vec<User>>;
}

fn push_user_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    match filter.status {
        Some(UserStatusFilter::Banned) => {
            qb.push(" AND is_banned = TRUE");
        }
        Some(UserStatusFilter::Active) => {
            qb.push(" AND is_banned = FALSE");
        }
        None => {}
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search.trim());
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR username ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait::async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, username, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role)
        .fetch_one(self.pool())
        .await?;

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username.to_lowercase())
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    async fn user_summaries(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT id, name, username, avatar_url, bio FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await?;
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                username = COALESCE($3, username),
                email = COALESCE($4, email),
                password_hash = COALESCE($5, password_hash),
                role = COALESCE($6, role),
                bio = COALESCE($7, bio),
                location = COALESCE($8, location),
                website = COALESCE($9, website),
                avatar_url = COALESCE($10, avatar_url),
                is_active = COALESCE($11, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.role)
        .bind(changes.bio)
        .bind(changes.location)
        .bind(changes.website)
        .bind(changes.avatar_url)
        .bind(changes.is_active)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"
            UPDATE users SET followers_count = GREATEST(followers_count - 1, 0)
            WHERE id IN (SELECT following_id FROM follows WHERE follower_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users SET following_count = GREATEST(following_count - 1, 0)
            WHERE id IN (SELECT follower_id FROM follows WHERE following_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users SET friends_count = GREATEST(friends_count - 1, 0)
            WHERE id IN (
                SELECT CASE WHEN user_low = $1 THEN user_high ELSE user_low END
                FROM friendships WHERE user_low = $1 OR user_high = $1
            )
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE posts SET likes_count = GREATEST(likes_count - 1, 0)
            WHERE id IN (SELECT post_id FROM post_likes WHERE user_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE posts SET bookmarks_count = GREATEST(bookmarks_count - 1, 0)
            WHERE id IN (SELECT post_id FROM bookmarks WHERE user_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        // The user's comments disappear together with every reply to them
        sqlx::query(
            r#"
            UPDATE posts p SET comments_count = GREATEST(p.comments_count - c.removed, 0)
            FROM (
                SELECT post_id, COUNT(*) AS removed FROM comments
                WHERE author_id = $1
                   OR parent_id IN (SELECT id FROM comments WHERE author_id = $1)
                GROUP BY post_id
            ) c
            WHERE p.id = c.post_id
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self, filter: &UserFilter, page: Page) -> Result<(Vec<User>, i64)> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_user_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE TRUE");
        push_user_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let users = qb.build_query_as::<User>().fetch_all(self.pool()).await?;

        Ok((users, total))
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_password_token = $2, reset_password_expire = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE reset_password_token = $1 AND reset_password_expire > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    async fn set_ban(
        &self,
        id: Uuid,
        banned: bool,
        reason: Option<String>,
    ) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                is_banned = $2,
                ban_reason = CASE WHEN $2 THEN $3 ELSE NULL END,
                ban_date = CASE WHEN $2 THEN NOW() ELSE NULL END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(banned)
        .bind(reason)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    async fn user_counts(&self) -> Result<(i64, i64)> {
        let counts: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_banned) FROM users",
        )
        .fetch_one(self.pool())
        .await?;
        Ok(counts)
    }

    async fn recent_users(&self, limit: i64) -> Result<Vec<User>> {
        let users =
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC LIMIT $1")
                .bind(limit)
                .fetch_all(self.pool())
                .await?;
        Ok(users)
    }

    async fn most_active_users(&self, limit: i64) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE is_banned = FALSE
            ORDER BY (posts_count + likes_given + comments_count) DESC, created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(users)
    }
}

#[async_trait::async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        let email = new_user.email.to_lowercase();
        let username = new_user.username.map(|u| u.to_lowercase());
        if state.users.values().any(|u| {
            u.email == email || (username.is_some() && u.username.as_deref() == username.as_deref())
        }) {
            return Err(crate::error::AppError::Conflict(
                "Duplicate field value entered".to_string(),
            ));
        }

        let now = state.now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            username,
            email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            bio: None,
            location: None,
            website: None,
            avatar_url: None,
            reset_password_token: None,
            reset_password_expire: None,
            followers_count: 0,
            following_count: 0,
            friends_count: 0,
            posts_count: 0,
            likes_given: 0,
            comments_count: 0,
            is_active: true,
            is_banned: false,
            ban_reason: None,
            ban_date: None,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_lowercase();
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.username.as_deref() == Some(username.as_str()))
            .cloned())
    }

    async fn user_summaries(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).map(User::summary))
            .collect())
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        if let Some(email) = &changes.email {
            if state.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(crate::error::AppError::Conflict(
                    "Duplicate field value entered".to_string(),
                ));
            }
        }
        if let Some(username) = &changes.username {
            if state
                .users
                .values()
                .any(|u| u.id != id && u.username.as_ref() == Some(username))
            {
                return Err(crate::error::AppError::Conflict(
                    "Duplicate field value entered".to_string(),
                ));
            }
        }

        let now = state.now();
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(username) = changes.username {
            user.username = Some(username);
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(bio) = changes.bio {
            user.bio = Some(bio);
        }
        if let Some(location) = changes.location {
            user.location = Some(location);
        }
        if let Some(website) = changes.website {
            user.website = Some(website);
        }
        if let Some(avatar_url) = changes.avatar_url {
            user.avatar_url = Some(avatar_url);
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        user.updated_at = now;
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&id) {
            return Ok(false);
        }

        let (edges, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.follows)
            .into_iter()
            .partition(|f| f.follower_id == id || f.following_id == id);
        state.follows = kept;
        for edge in edges {
            if edge.follower_id == id {
                state.with_user(edge.following_id, |u| {
                    u.followers_count = (u.followers_count - 1).max(0)
                });
            } else {
                state.with_user(edge.follower_id, |u| {
                    u.following_count = (u.following_count - 1).max(0)
                });
            }
        }

        let (friendships, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.friendships)
            .into_iter()
            .partition(|f| f.involves(id));
        state.friendships = kept;
        for friendship in friendships {
            state.with_user(friendship.other(id), |u| {
                u.friends_count = (u.friends_count - 1).max(0)
            });
        }

        let liked: Vec<Uuid> = state
            .post_likes
            .iter()
            .filter(|(_, user_id, _)| *user_id == id)
            .map(|(post_id, _, _)| *post_id)
            .collect();
        state.post_likes.retain(|(_, user_id, _)| *user_id != id);
        for post_id in liked {
            state.with_post(post_id, |p| p.likes_count = (p.likes_count - 1).max(0));
        }

        let bookmarked: Vec<Uuid> = state
            .bookmarks
            .iter()
            .filter(|b| b.user_id == id)
            .map(|b| b.post_id)
            .collect();
        state.bookmarks.retain(|b| b.user_id != id);
        for post_id in bookmarked {
            state.with_post(post_id, |p| {
                p.bookmarks_count = (p.bookmarks_count - 1).max(0)
            });
        }

        state.remove_comments_where(|c| c.author_id == id);

        let owned_posts: Vec<Uuid> = state
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in owned_posts {
            state.remove_post_cascade(post_id);
        }

        state
            .follow_requests
            .retain(|_, r| r.follower_id != id && r.following_id != id);
        state
            .friend_requests
            .retain(|_, r| r.sender_id != id && r.receiver_id != id);
        state
            .messages
            .retain(|m| m.sender_id != id && m.receiver_id != id);
        state
            .one_time_messages
            .retain(|m| m.sender_id != id && m.receiver_id != id);
        state.events.retain(|_, e| e.user_id != id);

        state.users.remove(&id);
        Ok(true)
    }

    async fn list_users(&self, filter: &UserFilter, page: Page) -> Result<(Vec<User>, i64)> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = users.len() as i64;
        let users = users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((users, total))
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let now = state.now();
        state.with_user(id, |u| {
            u.reset_password_token = token_hash;
            u.reset_password_expire = expires_at;
            u.updated_at = now;
        });
        Ok(())
    }

    async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| {
                u.reset_password_token.as_deref() == Some(token_hash)
                    && u.reset_password_expire.map(|exp| exp > now).unwrap_or(false)
            })
            .cloned())
    }

    async fn set_ban(
        &self,
        id: Uuid,
        banned: bool,
        reason: Option<String>,
    ) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        let now = state.now();
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        user.is_banned = banned;
        if banned {
            user.ban_reason = reason;
            user.ban_date = Some(now);
        } else {
            user.ban_reason = None;
            user.ban_date = None;
        }
        user.updated_at = now;
        Ok(Some(user.clone()))
    }

    async fn user_counts(&self) -> Result<(i64, i64)> {
        let state = self.state.read().await;
        let total = state.users.len() as i64;
        let banned = state.users.values().filter(|u| u.is_banned).count() as i64;
        Ok((total, banned))
    }

    async fn recent_users(&self, limit: i64) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users.truncate(limit.max(0) as usize);
        Ok(users)
    }

    async fn most_active_users(&self, limit: i64) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| !u.is_banned)
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            b.activity_score()
                .cmp(&a.activity_score())
                .then(a.created_at.cmp(&b.created_at))
        });
        users.truncate(limit.max(0) as usize);
        Ok(users)
    }
}
