use super::{MemoryStore, PgStore};
use crate::error::Result;
use crate::models::Comment;
use uuid::Uuid;

/// Comments and one level of replies
#[async_trait::async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert a comment, bumping the post's and the author's
    /// `comments_count` together
    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        parent_id: Option<Uuid>,
        content: String,
    ) -> Result<Comment>;

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>>;

    /// Every comment and reply on a post, newest first
    async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>>;

    /// Delete a comment and its replies, decrementing the post's
    /// `comments_count` by the number removed. Returns that number.
    async fn delete_comment(&self, id: Uuid) -> Result<u64>;

    async fn comment_count(&self) -> Result<i64>;
}

#[async_trait::async_trait]
impl CommentRepository for PgStore {
    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        parent_id: Option<Uuid>,
        content: String,
    ) -> Result<Comment> {
        let mut tx = self.pool().begin().await?;

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, content, author_id, post_id, parent_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(content)
        .bind(author_id)
        .bind(post_id)
        .bind(parent_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET comments_count = comments_count + 1 WHERE id = $1")
            .bind(author_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(comment)
    }

    async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE post_id = $1 ORDER BY created_at DESC",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await?;
        Ok(comments)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<u64> {
        let mut tx = self.pool().begin().await?;

        let post_id: Option<Uuid> =
            sqlx::query_scalar("SELECT post_id FROM comments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(post_id) = post_id else {
            tx.rollback().await?;
            return Ok(0);
        };

        let removed = sqlx::query("DELETE FROM comments WHERE id = $1 OR parent_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(
            "UPDATE posts SET comments_count = GREATEST(comments_count - $2, 0) WHERE id = $1",
        )
        .bind(post_id)
        .bind(removed as i32)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn comment_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl CommentRepository for MemoryStore {
    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        parent_id: Option<Uuid>,
        content: String,
    ) -> Result<Comment> {
        let mut state = self.state.write().await;
        let now = state.now();
        let comment = Comment {
            id: Uuid::new_v4(),
            content,
            author_id,
            post_id,
            parent_id,
            created_at: now,
            updated_at: now,
        };
        state.comments.insert(comment.id, comment.clone());
        state.with_post(post_id, |p| p.comments_count += 1);
        state.with_user(author_id, |u| u.comments_count += 1);
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&id).cloned())
    }

    async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<u64> {
        let mut state = self.state.write().await;
        Ok(state.remove_comments_where(|c| c.id == id))
    }

    async fn comment_count(&self) -> Result<i64> {
        Ok(self.state.read().await.comments.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewPost, NewUser, PostStatus, Role};
    use crate::repository::{PostRepository, UserRepository};

    #[tokio::test]
    async fn test_delete_removes_replies_and_fixes_counter() {
        let store = MemoryStore::new();
        let author = store
            .create_user(NewUser {
                name: "Writer".to_string(),
                username: None,
                email: "writer@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        let post = store
            .create_post(NewPost {
                title: "Discuss".to_string(),
                content: "Thoughts?".to_string(),
                rich_content: None,
                author_id: author.id,
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

        let root = store
            .create_comment(post.id, author.id, None, "root".to_string())
            .await
            .unwrap();
        store
            .create_comment(post.id, author.id, Some(root.id), "reply".to_string())
            .await
            .unwrap();
        store
            .create_comment(post.id, author.id, None, "other".to_string())
            .await
            .unwrap();

        let post_before = store.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(post_before.comments_count, 3);

        assert_eq!(store.delete_comment(root.id).await.unwrap(), 2);
        assert_eq!(store.delete_comment(root.id).await.unwrap(), 0);

        let post_after = store.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(post_after.comments_count, 1);
        assert_eq!(store.comments_for_post(post.id).await.unwrap().len(), 1);

        // The author's lifetime counter is not rolled back
        let author = store.find_user(author.id).await.unwrap().unwrap();
        assert_eq!(author.comments_count, 3);
    }
}
