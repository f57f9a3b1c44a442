use super::UserSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub rich_content: Option<serde_json::Value>,
    pub author_id: Uuid,
    pub status: PostStatus,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub feeling: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "isReShare")]
    pub is_reshare: bool,
    #[serde(rename = "originalPost")]
    pub original_post_id: Option<Uuid>,
    #[serde(rename = "reShareComment")]
    pub reshare_comment: Option<String>,
    pub likes_count: i32,
    pub comments_count: i32,
    pub bookmarks_count: i32,
    pub shares_count: i32,
    pub is_featured: bool,
    pub featured_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    /// Author or admin
    pub fn can_be_managed_by(&self, user_id: Uuid, is_admin: bool) -> bool {
        self.author_id == user_id || is_admin
    }
}

/// Post with its author card attached
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<UserSummary>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub rich_content: Option<serde_json::Value>,
    pub author_id: Uuid,
    pub status: PostStatus,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub feeling: Option<String>,
    pub location: Option<String>,
    pub is_reshare: bool,
    pub original_post_id: Option<Uuid>,
    pub reshare_comment: Option<String>,
}

/// Partial post update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub rich_content: Option<serde_json::Value>,
    pub status: Option<PostStatus>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub feeling: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PostSort {
    #[default]
    Latest,
    MostLiked,
    MostCommented,
}

/// Filters for the public post listing (published posts only)
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub author: Option<Uuid>,
    pub search: Option<String>,
    pub sort: PostSort,
}

impl PostQuery {
    pub fn matches(&self, post: &Post) -> bool {
        if !post.is_published() {
            return false;
        }
        if let Some(category) = &self.category {
            if !post.categories.iter().any(|c| c == category) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !post.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(author) = self.author {
            if post.author_id != author {
                return false;
            }
        }
        match self.search.as_deref().map(str::to_lowercase) {
            Some(needle) if !needle.is_empty() => {
                post.title.to_lowercase().contains(&needle)
                    || post.content.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Top-level comment with author card and its replies
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<UserSummary>,
    pub replies: Vec<CommentView>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookmarkView {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    pub post: Option<PostView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post(status: PostStatus) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::new_v4(),
            title: "Rust ownership".to_string(),
            content: "Borrowing explained".to_string(),
            rich_content: None,
            author_id: Uuid::new_v4(),
            status,
            categories: vec!["tech".to_string()],
            tags: vec!["rust".to_string()],
            feeling: None,
            location: None,
            is_reshare: false,
            original_post_id: None,
            reshare_comment: None,
            likes_count: 0,
            comments_count: 0,
            bookmarks_count: 0,
            shares_count: 0,
            is_featured: false,
            featured_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_query_excludes_drafts() {
        let query = PostQuery::default();
        assert!(query.matches(&sample_post(PostStatus::Published)));
        assert!(!query.matches(&sample_post(PostStatus::Draft)));
    }

    #[test]
    fn test_query_filters() {
        let post = sample_post(PostStatus::Published);
        let by_search = PostQuery {
            search: Some("BORROW".to_string()),
            ..Default::default()
        };
        assert!(by_search.matches(&post));

        let by_tag = PostQuery {
            tag: Some("go".to_string()),
            ..Default::default()
        };
        assert!(!by_tag.matches(&post));

        let by_author = PostQuery {
            author: Some(post.author_id),
            category: Some("tech".to_string()),
            ..Default::default()
        };
        assert!(by_author.matches(&post));
    }

    #[test]
    fn test_serialized_field_names() {
        let post = sample_post(PostStatus::Draft);
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["status"], "draft");
        assert_eq!(json["isReShare"], false);
        assert!(json.get("likesCount").is_some());
        assert!(json.get("originalPost").is_some());
    }

    #[test]
    fn test_management_rule() {
        let post = sample_post(PostStatus::Published);
        assert!(post.can_be_managed_by(post.author_id, false));
        assert!(post.can_be_managed_by(Uuid::new_v4(), true));
        assert!(!post.can_be_managed_by(Uuid::new_v4(), false));
    }
}
