/// Post service - handles post creation, retrieval, and management
use super::post_views;
use crate::error::{AppError, Result};
use crate::models::{
    NewPost, Page, Post, PostChanges, PostQuery, PostSort, PostStatus, PostView, UserSummary,
};
use crate::repository::{BookmarkRepository, PostRepository, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

const TITLE_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title is required and must be less than 100 characters"
    ))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    pub rich_content: Option<serde_json::Value>,
    pub status: Option<PostStatus>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub feeling: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title is required and must be less than 100 characters"
    ))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: Option<String>,
    pub rich_content: Option<serde_json::Value>,
    pub status: Option<PostStatus>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub feeling: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReshareRequest {
    pub re_share_comment: Option<String>,
}

/// `GET /api/posts` query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub author: Option<Uuid>,
    pub search: Option<String>,
    pub sort_by: Option<PostSort>,
}

impl PostListParams {
    pub fn query(&self) -> PostQuery {
        PostQuery {
            category: non_empty(self.category.clone()),
            tag: non_empty(self.tag.clone()),
            author: self.author,
            search: non_empty(self.search.clone()),
            sort: self.sort_by.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    pub likes_count: i32,
    pub liked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkToggle {
    pub bookmarks_count: i32,
    pub bookmarked: bool,
}

/// Who is asking: user id and whether they are an admin
pub type Viewer = (Uuid, bool);

pub struct PostService {
    store: Arc<dyn Store>,
}

impl PostService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Published posts matching `query`, with the total
    pub async fn list(&self, query: &PostQuery, page: Page) -> Result<(Vec<PostView>, i64)> {
        let (posts, total) = self.store.list_posts(query, page).await?;
        Ok((post_views(self.store.as_ref(), posts).await?, total))
    }

    /// Get a post by ID; drafts only for their author or an admin
    pub async fn get(&self, post_id: Uuid, viewer: Option<Viewer>) -> Result<PostView> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(post_not_found)?;

        let visible = post.is_published()
            || viewer
                .map(|(user_id, is_admin)| post.can_be_managed_by(user_id, is_admin))
                .unwrap_or(false);
        if !visible {
            return Err(post_not_found());
        }

        self.view(post).await
    }

    /// Create a new post; published unless a status says otherwise
    pub async fn create(&self, author_id: Uuid, req: CreatePostRequest) -> Result<PostView> {
        let req = CreatePostRequest {
            title: req.title.trim().to_string(),
            content: req.content.trim().to_string(),
            ..req
        };
        req.validate()?;

        let post = self
            .store
            .create_post(NewPost {
                title: req.title,
                content: req.content,
                rich_content: req.rich_content,
                author_id,
                status: req.status.unwrap_or(PostStatus::Published),
                categories: clean_labels(req.categories),
                tags: clean_labels(req.tags),
                feeling: non_empty(req.feeling),
                location: non_empty(req.location),
                is_reshare: false,
                original_post_id: None,
                reshare_comment: None,
            })
            .await?;

        tracing::info!(post_id = %post.id, author_id = %author_id, "post created");
        self.view(post).await
    }

    pub async fn update(
        &self,
        post_id: Uuid,
        (caller_id, is_admin): Viewer,
        req: UpdatePostRequest,
    ) -> Result<PostView> {
        let req = UpdatePostRequest {
            title: req.title.map(|t| t.trim().to_string()),
            content: req.content.map(|c| c.trim().to_string()),
            ..req
        };
        req.validate()?;
        self.check_owner(post_id, caller_id, is_admin, "update").await?;

        let changes = PostChanges {
            title: req.title,
            content: req.content,
            rich_content: req.rich_content,
            status: req.status,
            categories: req.categories.map(|c| clean_labels(Some(c))),
            tags: req.tags.map(|t| clean_labels(Some(t))),
            feeling: req.feeling,
            location: req.location,
        };

        let post = self
            .store
            .update_post(post_id, changes)
            .await?
            .ok_or_else(post_not_found)?;
        tracing::info!(post_id = %post_id, "post updated");
        self.view(post).await
    }

    pub async fn delete(&self, post_id: Uuid, (caller_id, is_admin): Viewer) -> Result<()> {
        self.check_owner(post_id, caller_id, is_admin, "delete").await?;
        if !self.store.delete_post(post_id).await? {
            return Err(post_not_found());
        }
        tracing::info!(post_id = %post_id, deleted_by = %caller_id, "post deleted");
        Ok(())
    }

    pub async fn publish(&self, post_id: Uuid, (caller_id, is_admin): Viewer) -> Result<PostView> {
        self.check_owner(post_id, caller_id, is_admin, "publish").await?;
        let post = self
            .store
            .update_post(
                post_id,
                PostChanges {
                    status: Some(PostStatus::Published),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(post_not_found)?;
        tracing::info!(post_id = %post_id, "post published");
        self.view(post).await
    }

    /// The caller's drafts, most recently edited first
    pub async fn drafts(&self, user_id: Uuid) -> Result<Vec<PostView>> {
        let posts = self.store.drafts(user_id).await?;
        post_views(self.store.as_ref(), posts).await
    }

    /// Published posts by followed accounts plus the caller's own
    pub async fn feed(&self, user_id: Uuid, page: Page) -> Result<(Vec<PostView>, i64)> {
        let (posts, total) = self.store.feed_posts(user_id, page).await?;
        Ok((post_views(self.store.as_ref(), posts).await?, total))
    }

    pub async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeToggle> {
        let (likes_count, liked) = self
            .store
            .toggle_like(post_id, user_id)
            .await?
            .ok_or_else(post_not_found)?;
        Ok(LikeToggle { likes_count, liked })
    }

    pub async fn likers(&self, post_id: Uuid) -> Result<Vec<UserSummary>> {
        if self.store.find_post(post_id).await?.is_none() {
            return Err(post_not_found());
        }
        self.store.post_likers(post_id).await
    }

    /// Save or unsave a post for the caller
    pub async fn toggle_bookmark(&self, post_id: Uuid, user_id: Uuid) -> Result<BookmarkToggle> {
        if self.store.find_post(post_id).await?.is_none() {
            return Err(post_not_found());
        }

        let bookmarked = if self.store.remove_bookmark(user_id, post_id).await? {
            false
        } else {
            // A concurrent add wins the race; the caller still ends up bookmarked
            self.store.add_bookmark(user_id, post_id, None).await?;
            true
        };

        let bookmarks_count = self
            .store
            .find_post(post_id)
            .await?
            .map(|p| p.bookmarks_count)
            .ok_or_else(post_not_found)?;
        Ok(BookmarkToggle {
            bookmarks_count,
            bookmarked,
        })
    }

    /// Re-share a published post as a new published post by the caller
    pub async fn reshare(
        &self,
        original_id: Uuid,
        user_id: Uuid,
        req: ReshareRequest,
    ) -> Result<PostView> {
        let original = self
            .store
            .find_post(original_id)
            .await?
            .filter(|p| p.is_published())
            .ok_or_else(|| AppError::NotFound("Original post not found".to_string()))?;

        let comment = non_empty(req.re_share_comment);
        let post = self
            .store
            .create_post(NewPost {
                title: reshare_title(&original.title),
                content: comment.clone().unwrap_or_default(),
                rich_content: None,
                author_id: user_id,
                status: PostStatus::Published,
                categories: original.categories.clone(),
                tags: original.tags.clone(),
                feeling: None,
                location: None,
                is_reshare: true,
                original_post_id: Some(original.id),
                reshare_comment: comment,
            })
            .await?;

        tracing::info!(post_id = %post.id, original_id = %original_id, "post re-shared");
        self.view(post).await
    }

    pub async fn share(&self, post_id: Uuid) -> Result<i32> {
        self.store
            .increment_shares(post_id)
            .await?
            .ok_or_else(post_not_found)
    }

    async fn check_owner(
        &self,
        post_id: Uuid,
        caller_id: Uuid,
        is_admin: bool,
        verb: &str,
    ) -> Result<()> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(post_not_found)?;

        if !post.can_be_managed_by(caller_id, is_admin) {
            return Err(AppError::Unauthorized(format!(
                "Not authorized to {} this post",
                verb
            )));
        }
        Ok(())
    }

    async fn view(&self, post: Post) -> Result<PostView> {
        let mut views = post_views(self.store.as_ref(), vec![post]).await?;
        views.pop().ok_or_else(post_not_found)
    }
}

pub(crate) fn post_not_found() -> AppError {
    AppError::NotFound("Post not found".to_string())
}

/// `Re-shared: <title>`, cut to the title limit on a char boundary
fn reshare_title(original: &str) -> String {
    format!("Re-shared: {original}")
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed, non-empty, de-duplicated labels in their original order
fn clean_labels(labels: Option<Vec<String>>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for label in labels.unwrap_or_default() {
        let label = label.trim().to_string();
        if !label.is_empty() && !cleaned.contains(&label) {
            cleaned.push(label);
        }
    }
    cleaned
}
