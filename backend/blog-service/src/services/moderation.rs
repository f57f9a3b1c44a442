/// Moderation service - admin dashboard, bans, takedowns and the leaderboard
use super::post_views;
use super::posts::post_not_found;
use crate::error::{AppError, Result};
use crate::models::{Page, Post, PostQuery, PostView, User, UserFilter, UserSummary};
use crate::repository::{CommentRepository, PostRepository, Store, UserRepository};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const RECENT_LIMIT: i64 = 5;
const LEADERBOARD_LIMIT: i64 = 5;
const WEEKLY_PICKS_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModerationReason {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsTotals {
    pub total_users: i64,
    pub total_posts: i64,
    pub total_comments: i64,
    pub banned_users: i64,
    pub draft_posts: i64,
    pub published_posts: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub recent_users: Vec<User>,
    pub recent_posts: Vec<Post>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub stats: StatsTotals,
    pub recent_activity: RecentActivity,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUser {
    #[serde(flatten)]
    pub user: UserSummary,
    pub posts_count: i32,
    pub likes_given: i32,
    pub comments_count: i32,
    pub activity_score: i64,
}

impl From<&User> for ActiveUser {
    fn from(user: &User) -> Self {
        Self {
            user: user.summary(),
            posts_count: user.posts_count,
            likes_given: user.likes_given,
            comments_count: user.comments_count,
            activity_score: user.activity_score(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub most_liked_posts: Vec<PostView>,
    pub most_active_users: Vec<ActiveUser>,
    pub weekly_picks: Vec<PostView>,
}

pub struct ModerationService {
    store: Arc<dyn Store>,
}

impl ModerationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn stats(&self) -> Result<AdminStats> {
        let (total_users, banned_users) = self.store.user_counts().await?;
        let total_posts = self.store.post_count().await?;
        let total_comments = self.store.comment_count().await?;
        // Listing total over published posts with no filters
        let (_, published_posts) = self
            .store
            .list_posts(&PostQuery::default(), Page::new(1, 1))
            .await?;

        Ok(AdminStats {
            stats: StatsTotals {
                total_users,
                total_posts,
                total_comments,
                banned_users,
                draft_posts: (total_posts - published_posts).max(0),
                published_posts,
            },
            recent_activity: RecentActivity {
                recent_users: self.store.recent_users(RECENT_LIMIT).await?,
                recent_posts: self.store.recent_posts(RECENT_LIMIT).await?,
            },
        })
    }

    pub async fn list_users(&self, filter: &UserFilter, page: Page) -> Result<(Vec<User>, i64)> {
        self.store.list_users(filter, page).await
    }

    /// Ban or unban a non-admin account
    pub async fn toggle_ban(&self, admin_id: Uuid, user_id: Uuid, reason: Option<String>) -> Result<User> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if user.is_admin() {
            return Err(AppError::BadRequest("Cannot ban admin users".to_string()));
        }

        let banned = !user.is_banned;
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let updated = self
            .store
            .set_ban(user_id, banned, reason)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!(
            user_id = %user_id,
            admin_id = %admin_id,
            banned,
            reason = updated.ban_reason.as_deref().unwrap_or(""),
            "ban status changed"
        );
        Ok(updated)
    }

    /// Remove any post, recording who did it and why
    pub async fn delete_post(&self, admin_id: Uuid, post_id: Uuid, reason: Option<String>) -> Result<()> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(post_not_found)?;

        if !self.store.delete_post(post_id).await? {
            return Err(post_not_found());
        }

        tracing::warn!(
            post_id = %post_id,
            author_id = %post.author_id,
            moderated_by = %admin_id,
            reason = reason.as_deref().unwrap_or("unspecified"),
            title = %post.title,
            "post removed by moderator"
        );
        Ok(())
    }

    /// Remove a comment and its replies; returns how many were removed
    pub async fn delete_comment(&self, admin_id: Uuid, comment_id: Uuid) -> Result<u64> {
        if self.store.find_comment(comment_id).await?.is_none() {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }

        let removed = self.store.delete_comment(comment_id).await?;
        tracing::warn!(
            comment_id = %comment_id,
            moderated_by = %admin_id,
            removed,
            "comment removed by moderator"
        );
        Ok(removed)
    }

    pub async fn toggle_feature(&self, post_id: Uuid) -> Result<Post> {
        let post = self
            .store
            .toggle_featured(post_id)
            .await?
            .ok_or_else(post_not_found)?;
        tracing::info!(post_id = %post_id, featured = post.is_featured, "feature flag toggled");
        Ok(post)
    }

    pub async fn leaderboard(&self) -> Result<Leaderboard> {
        let most_liked = self.store.most_liked_posts(LEADERBOARD_LIMIT).await?;
        let most_active = self.store.most_active_users(LEADERBOARD_LIMIT).await?;
        let since = Utc::now() - Duration::days(WEEKLY_PICKS_DAYS);
        let weekly = self.store.weekly_picks(since, LEADERBOARD_LIMIT).await?;

        Ok(Leaderboard {
            most_liked_posts: post_views(self.store.as_ref(), most_liked).await?,
            most_active_users: most_active.iter().map(ActiveUser::from).collect(),
            weekly_picks: post_views(self.store.as_ref(), weekly).await?,
        })
    }
}
