use super::memory::paginate;
use super::{MemoryStore, PgStore};
use crate::error::Result;
use crate::models::{Bookmark, Page};
use uuid::Uuid;

/// Saved posts per user
#[async_trait::async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Newest first, with the total
    async fn bookmarks_for_user(&self, user_id: Uuid, page: Page) -> Result<(Vec<Bookmark>, i64)>;

    async fn find_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<Bookmark>>;

    /// Save a post and bump its `bookmarks_count`. `None` if already saved.
    async fn add_bookmark(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        note: Option<String>,
    ) -> Result<Option<Bookmark>>;

    async fn update_bookmark_note(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        note: Option<String>,
    ) -> Result<Option<Bookmark>>;

    /// Unsave a post and decrement its `bookmarks_count`. False if not saved.
    async fn remove_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;
}

#[async_trait::async_trait]
impl BookmarkRepository for PgStore {
    async fn bookmarks_for_user(&self, user_id: Uuid, page: Page) -> Result<(Vec<Bookmark>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookmarks WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await?;

        let bookmarks = sqlx::query_as::<_, Bookmark>(
            r#"
            SELECT * FROM bookmarks
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;

        Ok((bookmarks, total))
    }

    async fn find_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<Bookmark>> {
        let bookmark = sqlx::query_as::<_, Bookmark>(
            "SELECT * FROM bookmarks WHERE user_id = $1 AND post_id = $2",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(bookmark)
    }

    async fn add_bookmark(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        note: Option<String>,
    ) -> Result<Option<Bookmark>> {
        let mut tx = self.pool().begin().await?;

        let bookmark = sqlx::query_as::<_, Bookmark>(
            r#"
            INSERT INTO bookmarks (id, user_id, post_id, note)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, post_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(post_id)
        .bind(note)
        .fetch_optional(&mut *tx)
        .await?;

        if bookmark.is_some() {
            sqlx::query("UPDATE posts SET bookmarks_count = bookmarks_count + 1 WHERE id = $1")
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(bookmark)
    }

    async fn update_bookmark_note(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        note: Option<String>,
    ) -> Result<Option<Bookmark>> {
        let bookmark = sqlx::query_as::<_, Bookmark>(
            r#"
            UPDATE bookmarks SET note = $3
            WHERE user_id = $1 AND post_id = $2
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .bind(note)
        .fetch_optional(self.pool())
        .await?;
        Ok(bookmark)
    }

    async fn remove_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let mut tx = self.pool().begin().await?;

        let removed = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE posts SET bookmarks_count = GREATEST(bookmarks_count - 1, 0) WHERE id = $1",
        )
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl BookmarkRepository for MemoryStore {
    async fn bookmarks_for_user(&self, user_id: Uuid, page: Page) -> Result<(Vec<Bookmark>, i64)> {
        let state = self.state.read().await;
        let mut bookmarks: Vec<Bookmark> = state
            .bookmarks
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookmarks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = bookmarks.len() as i64;
        Ok((paginate(bookmarks, Some(page)), total))
    }

    async fn find_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<Bookmark>> {
        let state = self.state.read().await;
        Ok(state
            .bookmarks
            .iter()
            .find(|b| b.user_id == user_id && b.post_id == post_id)
            .cloned())
    }

    async fn add_bookmark(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        note: Option<String>,
    ) -> Result<Option<Bookmark>> {
        let mut state = self.state.write().await;
        if state
            .bookmarks
            .iter()
            .any(|b| b.user_id == user_id && b.post_id == post_id)
        {
            return Ok(None);
        }

        let now = state.now();
        let bookmark = Bookmark {
            id: Uuid::new_v4(),
            user_id,
            post_id,
            note,
            created_at: now,
        };
        state.bookmarks.push(bookmark.clone());
        state.with_post(post_id, |p| p.bookmarks_count += 1);
        Ok(Some(bookmark))
    }

    async fn update_bookmark_note(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        note: Option<String>,
    ) -> Result<Option<Bookmark>> {
        let mut state = self.state.write().await;
        Ok(state
            .bookmarks
            .iter_mut()
            .find(|b| b.user_id == user_id && b.post_id == post_id)
            .map(|b| {
                b.note = note;
                b.clone()
            }))
    }

    async fn remove_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.bookmarks.len();
        state
            .bookmarks
            .retain(|b| !(b.user_id == user_id && b.post_id == post_id));
        if state.bookmarks.len() == before {
            return Ok(false);
        }
        state.with_post(post_id, |p| {
            p.bookmarks_count = (p.bookmarks_count - 1).max(0)
        });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewPost, NewUser, PostStatus, Role};
    use crate::repository::{PostRepository, UserRepository};

    #[tokio::test]
    async fn test_bookmark_lifecycle_tracks_counter() {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                name: "Reader".to_string(),
                username: None,
                email: "reader@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        let post = store
            .create_post(NewPost {
                title: "Keep".to_string(),
                content: "for later".to_string(),
                rich_content: None,
                author_id: user.id,
                status: PostStatus::Published,
                categories: Vec::new(),
                tags: Vec::new(),
                feeling: None,
                location: None,
                is_reshare: false,
                original_post_id: None,
                reshare_comment: None,
            })
            .await
            .unwrap();

        assert!(store
            .add_bookmark(user.id, post.id, Some("read".to_string()))
            .await
            .unwrap()
            .is_some());
        assert!(store.add_bookmark(user.id, post.id, None).await.unwrap().is_none());
        assert_eq!(
            store.find_post(post.id).await.unwrap().unwrap().bookmarks_count,
            1
        );

        let updated = store
            .update_bookmark_note(user.id, post.id, Some("reread".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.note.as_deref(), Some("reread"));

        let (listed, total) = store
            .bookmarks_for_user(user.id, Page::new(1, 10))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(listed[0].post_id, post.id);

        assert!(store.remove_bookmark(user.id, post.id).await.unwrap());
        assert!(!store.remove_bookmark(user.id, post.id).await.unwrap());
        assert_eq!(
            store.find_post(post.id).await.unwrap().unwrap().bookmarks_count,
            0
        );
    }
}
