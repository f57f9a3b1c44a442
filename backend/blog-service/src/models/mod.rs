/// Data models for blog-service
///
/// This module defines structures for:
/// - User: accounts, profile fields and denormalized social counters
/// - FollowRequest / Follow: the directed social graph
/// - FriendRequest / Friendship: symmetric friendships
/// - Post / Comment / Bookmark: content and engagement
/// - Message / OneTimeMessage: direct messaging
/// - Event: community events
mod event;
mod message;
mod post;
mod social;
mod user;

pub use event::{Event, NewEvent};
pub use message::{ConversationSummary, Message, OneTimeMessage};
pub use post::{
    Bookmark, BookmarkView, Comment, CommentView, NewPost, Post, PostChanges, PostQuery, PostSort,
    PostStatus, PostView,
};
pub use social::{Follow, FollowRequest, FriendRequest, Friendship, RequestStatus};
pub use user::{NewUser, Role, User, UserChanges, UserFilter, UserStatusFilter, UserSummary};

use serde::{Deserialize, Serialize};

/// Resolved pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// Number of pages needed for `total` items
    pub fn pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}

/// `?page=&limit=` query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn resolve(&self, default_limit: i64, max_limit: i64) -> Page {
        let limit = self.limit.unwrap_or(default_limit).clamp(1, max_limit);
        Page::new(self.page.unwrap_or(1), limit)
    }
}

/// Paginated list envelope
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
    pub data: Vec<T>,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            success: true,
            count: data.len(),
            total,
            page: page.page,
            pages: page.pages(total),
            data,
        }
    }
}
