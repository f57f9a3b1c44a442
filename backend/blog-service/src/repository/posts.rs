use super::memory::paginate;
use super::{like_pattern, MemoryStore, PgStore};
use crate::error::Result;
use crate::models::{
    NewPost, Page, Post, PostChanges, PostQuery, PostSort, PostStatus, User, UserSummary,
};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

/// Posts, likes and engagement counters
#[async_trait::async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post and bump the author's `posts_count`
    async fn create_post(&self, new_post: NewPost) -> Result<Post>;

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>>;

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>>;

    /// Delete a post with its likes, comments and bookmarks, decrementing the
    /// author's `posts_count`
    async fn delete_post(&self, id: Uuid) -> Result<bool>;

    /// Published posts matching `query`, with the total
    async fn list_posts(&self, query: &PostQuery, page: Page) -> Result<(Vec<Post>, i64)>;

    /// Published posts by `user_id` and the accounts they follow, newest first
    async fn feed_posts(&self, user_id: Uuid, page: Page) -> Result<(Vec<Post>, i64)>;

    /// Drafts of `user_id`, most recently edited first
    async fn drafts(&self, user_id: Uuid) -> Result<Vec<Post>>;

    async fn posts_by_author(&self, author_id: Uuid, published_only: bool) -> Result<Vec<Post>>;

    /// Like or unlike, keeping `likes_count` and the user's `likes_given` in
    /// step. Returns `(likes_count, liked)`, or `None` if the post is gone.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<(i32, bool)>>;

    /// Accounts that liked a post, most recent like first
    async fn post_likers(&self, post_id: Uuid) -> Result<Vec<UserSummary>>;

    async fn increment_shares(&self, post_id: Uuid) -> Result<Option<i32>>;

    /// Flip `is_featured`, setting or clearing `featured_date`
    async fn toggle_featured(&self, post_id: Uuid) -> Result<Option<Post>>;

    async fn post_count(&self) -> Result<i64>;

    async fn recent_posts(&self, limit: i64) -> Result<Vec<Post>>;

    async fn most_liked_posts(&self, limit: i64) -> Result<Vec<Post>>;

    /// Published posts created since `since`, by likes then comments
    async fn weekly_picks(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<Post>>;
}

fn push_post_filter(qb: &mut QueryBuilder<'_, Postgres>, query: &PostQuery) {
    qb.push(" WHERE status = 'published'");
    if let Some(category) = &query.category {
        qb.push(" AND ").push_bind(category.clone()).push(" = ANY(categories)");
    }
    if let Some(tag) = &query.tag {
        qb.push(" AND ").push_bind(tag.clone()).push(" = ANY(tags)");
    }
    if let Some(author) = query.author {
        qb.push(" AND author_id = ").push_bind(author);
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search.trim());
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR content ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn order_clause(sort: PostSort) -> &'static str {
    match sort {
        PostSort::Latest => " ORDER BY created_at DESC",
        PostSort::MostLiked => " ORDER BY likes_count DESC, created_at DESC",
        PostSort::MostCommented => " ORDER BY comments_count DESC, created_at DESC",
    }
}

#[async_trait::async_trait]
impl PostRepository for PgStore {
    async fn create_post(&self, new_post: NewPost) -> Result<Post> {
        let mut tx = self.pool().begin().await?;

        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (
                id, title, content, rich_content, author_id, status, categories, tags,
                feeling, location, is_reshare, original_post_id, reshare_comment
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_post.title)
        .bind(&new_post.content)
        .bind(&new_post.rich_content)
        .bind(new_post.author_id)
        .bind(new_post.status)
        .bind(&new_post.categories)
        .bind(&new_post.tags)
        .bind(&new_post.feeling)
        .bind(&new_post.location)
        .bind(new_post.is_reshare)
        .bind(new_post.original_post_id)
        .bind(&new_post.reshare_comment)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET posts_count = posts_count + 1 WHERE id = $1")
            .bind(new_post.author_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(post)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                rich_content = COALESCE($4, rich_content),
                status = COALESCE($5, status),
                categories = COALESCE($6, categories),
                tags = COALESCE($7, tags),
                feeling = COALESCE($8, feeling),
                location = COALESCE($9, location),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.content)
        .bind(changes.rich_content)
        .bind(changes.status)
        .bind(changes.categories)
        .bind(changes.tags)
        .bind(changes.feeling)
        .bind(changes.location)
        .fetch_optional(self.pool())
        .await?;
        Ok(post)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool().begin().await?;

        let author: Option<Uuid> =
            sqlx::query_scalar("DELETE FROM posts WHERE id = $1 RETURNING author_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(author_id) = author else {
            tx.rollback().await?;
            return Ok(false);
        };

        sqlx::query("UPDATE users SET posts_count = GREATEST(posts_count - 1, 0) WHERE id = $1")
            .bind(author_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_posts(&self, query: &PostQuery, page: Page) -> Result<(Vec<Post>, i64)> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts");
        push_post_filter(&mut count_qb, query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM posts");
        push_post_filter(&mut qb, query);
        qb.push(order_clause(query.sort));
        qb.push(" LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let posts = qb.build_query_as::<Post>().fetch_all(self.pool()).await?;

        Ok((posts, total))
    }

    async fn feed_posts(&self, user_id: Uuid, page: Page) -> Result<(Vec<Post>, i64)> {
        const FEED_FILTER: &str = r#"
            WHERE status = 'published'
              AND (author_id = $1
                   OR author_id IN (SELECT following_id FROM follows WHERE follower_id = $1))
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM posts {FEED_FILTER}"))
            .bind(user_id)
            .fetch_one(self.pool())
            .await?;

        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT * FROM posts {FEED_FILTER} ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;

        Ok((posts, total))
    }

    async fn drafts(&self, user_id: Uuid) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT * FROM posts
            WHERE author_id = $1 AND status = 'draft'
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(posts)
    }

    async fn posts_by_author(&self, author_id: Uuid, published_only: bool) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT * FROM posts
            WHERE author_id = $1 AND ($2 = FALSE OR status = 'published')
            ORDER BY created_at DESC
            "#,
        )
        .bind(author_id)
        .bind(published_only)
        .fetch_all(self.pool())
        .await?;
        Ok(posts)
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<(i32, bool)>> {
        let mut tx = self.pool().begin().await?;

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let (liked, delta) = if removed > 0 {
            (false, -1)
        } else {
            sqlx::query("INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2)")
                .bind(post_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            (true, 1)
        };

        let likes_count: i32 = sqlx::query_scalar(
            r#"
            UPDATE posts SET likes_count = GREATEST(likes_count + $2, 0)
            WHERE id = $1
            RETURNING likes_count
            "#,
        )
        .bind(post_id)
        .bind(delta)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET likes_given = GREATEST(likes_given + $2, 0) WHERE id = $1")
            .bind(user_id)
            .bind(delta)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some((likes_count, liked)))
    }

    async fn post_likers(&self, post_id: Uuid) -> Result<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.username, u.avatar_url, u.bio
            FROM post_likes l
            JOIN users u ON u.id = l.user_id
            WHERE l.post_id = $1
            ORDER BY l.created_at DESC
            "#,
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await?;
        Ok(users)
    }

    async fn increment_shares(&self, post_id: Uuid) -> Result<Option<i32>> {
        let shares: Option<i32> = sqlx::query_scalar(
            "UPDATE posts SET shares_count = shares_count + 1 WHERE id = $1 RETURNING shares_count",
        )
        .bind(post_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(shares)
    }

    async fn toggle_featured(&self, post_id: Uuid) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET
                is_featured = NOT is_featured,
                featured_date = CASE WHEN is_featured THEN NULL ELSE NOW() END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(post_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(post)
    }

    async fn post_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    async fn recent_posts(&self, limit: i64) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(posts)
    }

    async fn most_liked_posts(&self, limit: i64) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT * FROM posts
            WHERE status = 'published'
            ORDER BY likes_count DESC, created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(posts)
    }

    async fn weekly_picks(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT * FROM posts
            WHERE status = 'published' AND created_at >= $1
            ORDER BY likes_count DESC, comments_count DESC, created_at DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(posts)
    }
}

fn sort_posts(posts: &mut [Post], sort: PostSort) {
    match sort {
        PostSort::Latest => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        PostSort::MostLiked => posts.sort_by(|a, b| {
            b.likes_count
                .cmp(&a.likes_count)
                .then(b.created_at.cmp(&a.created_at))
        }),
        PostSort::MostCommented => posts.sort_by(|a, b| {
            b.comments_count
                .cmp(&a.comments_count)
                .then(b.created_at.cmp(&a.created_at))
        }),
    }
}

fn take(posts: Vec<Post>, limit: i64) -> Vec<Post> {
    posts.into_iter().take(limit.max(0) as usize).collect()
}

#[async_trait::async_trait]
impl PostRepository for MemoryStore {
    async fn create_post(&self, new_post: NewPost) -> Result<Post> {
        let mut state = self.state.write().await;
        let now = state.now();
        let post = Post {
            id: Uuid::new_v4(),
            title: new_post.title,
            content: new_post.content,
            rich_content: new_post.rich_content,
            author_id: new_post.author_id,
            status: new_post.status,
            categories: new_post.categories,
            tags: new_post.tags,
            feeling: new_post.feeling,
            location: new_post.location,
            is_reshare: new_post.is_reshare,
            original_post_id: new_post.original_post_id,
            reshare_comment: new_post.reshare_comment,
            likes_count: 0,
            comments_count: 0,
            bookmarks_count: 0,
            shares_count: 0,
            is_featured: false,
            featured_date: None,
            created_at: now,
            updated_at: now,
        };
        state.posts.insert(post.id, post.clone());
        state.with_user(post.author_id, |u| u.posts_count += 1);
        Ok(post)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.state.read().await.posts.get(&id).cloned())
    }

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>> {
        let mut state = self.state.write().await;
        let now = state.now();
        let Some(post) = state.posts.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        if let Some(rich_content) = changes.rich_content {
            post.rich_content = Some(rich_content);
        }
        if let Some(status) = changes.status {
            post.status = status;
        }
        if let Some(categories) = changes.categories {
            post.categories = categories;
        }
        if let Some(tags) = changes.tags {
            post.tags = tags;
        }
        if let Some(feeling) = changes.feeling {
            post.feeling = Some(feeling);
        }
        if let Some(location) = changes.location {
            post.location = Some(location);
        }
        post.updated_at = now;
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.remove_post_cascade(id) {
            Some(post) => {
                state.with_user(post.author_id, |u| {
                    u.posts_count = (u.posts_count - 1).max(0)
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_posts(&self, query: &PostQuery, page: Page) -> Result<(Vec<Post>, i64)> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        sort_posts(&mut posts, query.sort);
        let total = posts.len() as i64;
        Ok((paginate(posts, Some(page)), total))
    }

    async fn feed_posts(&self, user_id: Uuid, page: Page) -> Result<(Vec<Post>, i64)> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| {
                p.is_published()
                    && (p.author_id == user_id || state.is_following(user_id, p.author_id))
            })
            .cloned()
            .collect();
        sort_posts(&mut posts, PostSort::Latest);
        let total = posts.len() as i64;
        Ok((paginate(posts, Some(page)), total))
    }

    async fn drafts(&self, user_id: Uuid) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| p.author_id == user_id && p.status == PostStatus::Draft)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(posts)
    }

    async fn posts_by_author(&self, author_id: Uuid, published_only: bool) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| p.author_id == author_id && (!published_only || p.is_published()))
            .cloned()
            .collect();
        sort_posts(&mut posts, PostSort::Latest);
        Ok(posts)
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<(i32, bool)>> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&post_id) {
            return Ok(None);
        }

        let before = state.post_likes.len();
        state
            .post_likes
            .retain(|(p, u, _)| !(*p == post_id && *u == user_id));
        let liked = state.post_likes.len() == before;
        let delta = if liked {
            let now = state.now();
            state.post_likes.push((post_id, user_id, now));
            1
        } else {
            -1
        };

        let mut likes_count = 0;
        state.with_post(post_id, |p| {
            p.likes_count = (p.likes_count + delta).max(0);
            likes_count = p.likes_count;
        });
        state.with_user(user_id, |u| u.likes_given = (u.likes_given + delta).max(0));
        Ok(Some((likes_count, liked)))
    }

    async fn post_likers(&self, post_id: Uuid) -> Result<Vec<UserSummary>> {
        let state = self.state.read().await;
        let mut likes: Vec<&(Uuid, Uuid, DateTime<Utc>)> = state
            .post_likes
            .iter()
            .filter(|(p, _, _)| *p == post_id)
            .collect();
        likes.sort_by(|a, b| b.2.cmp(&a.2));
        Ok(likes
            .iter()
            .filter_map(|(_, u, _)| state.users.get(u).map(User::summary))
            .collect())
    }

    async fn increment_shares(&self, post_id: Uuid) -> Result<Option<i32>> {
        let mut state = self.state.write().await;
        Ok(state.posts.get_mut(&post_id).map(|p| {
            p.shares_count += 1;
            p.shares_count
        }))
    }

    async fn toggle_featured(&self, post_id: Uuid) -> Result<Option<Post>> {
        let mut state = self.state.write().await;
        let now = state.now();
        Ok(state.posts.get_mut(&post_id).map(|p| {
            p.is_featured = !p.is_featured;
            p.featured_date = if p.is_featured { Some(now) } else { None };
            p.clone()
        }))
    }

    async fn post_count(&self) -> Result<i64> {
        Ok(self.state.read().await.posts.len() as i64)
    }

    async fn recent_posts(&self, limit: i64) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state.posts.values().cloned().collect();
        sort_posts(&mut posts, PostSort::Latest);
        Ok(take(posts, limit))
    }

    async fn most_liked_posts(&self, limit: i64) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| p.is_published())
            .cloned()
            .collect();
        sort_posts(&mut posts, PostSort::MostLiked);
        Ok(take(posts, limit))
    }

    async fn weekly_picks(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| p.is_published() && p.created_at >= since)
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            b.likes_count
                .cmp(&a.likes_count)
                .then(b.comments_count.cmp(&a.comments_count))
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(take(posts, limit))
    }
}
