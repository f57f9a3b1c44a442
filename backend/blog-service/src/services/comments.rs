/// Comment service - threaded comments on posts
use super::posts::post_not_found;
use super::user_cards;
use crate::error::{AppError, Result};
use crate::models::{Comment, CommentView, UserSummary};
use crate::repository::{CommentRepository, PostRepository, Store};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 500, message = "Comment must be between 1 and 500 characters"))]
    pub content: String,
    pub parent_id: Option<Uuid>,
}

pub struct CommentService {
    store: Arc<dyn Store>,
}

impl CommentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Top-level comments newest first, each with its replies oldest first
    pub async fn list(&self, post_id: Uuid) -> Result<Vec<CommentView>> {
        if self.store.find_post(post_id).await?.is_none() {
            return Err(post_not_found());
        }

        let comments = self.store.comments_for_post(post_id).await?;
        let cards = user_cards(self.store.as_ref(), comments.iter().map(|c| c.author_id)).await?;
        Ok(build_tree(comments, &cards))
    }

    /// Add a comment or a reply
    ///
    /// Threads are one level deep: replying to a reply attaches to its
    /// top-level comment.
    pub async fn create(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        req: CreateCommentRequest,
    ) -> Result<CommentView> {
        let req = CreateCommentRequest {
            content: req.content.trim().to_string(),
            ..req
        };
        req.validate()?;

        if self.store.find_post(post_id).await?.is_none() {
            return Err(post_not_found());
        }

        let parent_id = match req.parent_id {
            Some(parent_id) => {
                let parent = self
                    .store
                    .find_comment(parent_id)
                    .await?
                    .filter(|c| c.post_id == post_id)
                    .ok_or_else(|| AppError::NotFound("Parent comment not found".to_string()))?;
                Some(parent.parent_id.unwrap_or(parent.id))
            }
            None => None,
        };

        let comment = self
            .store
            .create_comment(post_id, author_id, parent_id, req.content)
            .await?;
        tracing::info!(comment_id = %comment.id, post_id = %post_id, "comment created");

        let cards = user_cards(self.store.as_ref(), [author_id]).await?;
        Ok(CommentView {
            author: cards.get(&author_id).cloned(),
            comment,
            replies: Vec::new(),
        })
    }
}

fn build_tree(comments: Vec<Comment>, cards: &HashMap<Uuid, UserSummary>) -> Vec<CommentView> {
    let (top_level, replies): (Vec<Comment>, Vec<Comment>) =
        comments.into_iter().partition(|c| c.parent_id.is_none());

    let mut by_parent: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
    // Replies arrive newest first; reverse for reading order
    for reply in replies.into_iter().rev() {
        if let Some(parent_id) = reply.parent_id {
            by_parent.entry(parent_id).or_default().push(CommentView {
                author: cards.get(&reply.author_id).cloned(),
                comment: reply,
                replies: Vec::new(),
            });
        }
    }

    top_level
        .into_iter()
        .map(|comment| CommentView {
            author: cards.get(&comment.author_id).cloned(),
            replies: by_parent.remove(&comment.id).unwrap_or_default(),
            comment,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewPost, NewUser, PostStatus, Role};
    use crate::repository::{MemoryStore, UserRepository};

    async fn setup() -> (CommentService, Arc<dyn Store>, Uuid, Uuid) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                name: "alice".to_string(),
                username: None,
                email: "alice@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        let post = store
            .create_post(NewPost {
                title: "Post".to_string(),
                content: "Body".to_string(),
                rich_content: None,
                author_id: user.id,
                status: PostStatus::Published,
                categories: vec![],
                tags: vec![],
                feeling: None,
                location: None,
                is_reshare: false,
                original_post_id: None,
                reshare_comment: None,
            })
            .await
            .unwrap();
        (CommentService::new(store.clone()), store, user.id, post.id)
    }

    fn comment(content: &str, parent_id: Option<Uuid>) -> CreateCommentRequest {
        CreateCommentRequest {
            content: content.to_string(),
            parent_id,
        }
    }

    #[tokio::test]
    async fn test_replies_nest_one_level() {
        let (service, store, alice, post_id) = setup().await;

        let top = service.create(post_id, alice, comment("first", None)).await.unwrap();
        let reply = service
            .create(post_id, alice, comment("reply", Some(top.comment.id)))
            .await
            .unwrap();
        let nested = service
            .create(post_id, alice, comment("reply to reply", Some(reply.comment.id)))
            .await
            .unwrap();
        assert_eq!(nested.comment.parent_id, Some(top.comment.id));

        let tree = service.list(post_id).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].replies.len(), 2);
        assert_eq!(tree[0].replies[0].comment.content, "reply");

        let post = store.find_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.comments_count, 3);
    }

    #[tokio::test]
    async fn test_comment_validation() {
        let (service, _, alice, post_id) = setup().await;

        assert!(matches!(
            service.create(post_id, alice, comment("  ", None)).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(service
            .create(post_id, alice, comment(&"x".repeat(501), None))
            .await
            .is_err());

        let err = service
            .create(post_id, alice, comment("orphan", Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::NotFound("Parent comment not found".to_string()));

        let err = service
            .create(Uuid::new_v4(), alice, comment("lost", None))
            .await
            .unwrap_err();
        assert_eq!(err, post_not_found());
    }
}
