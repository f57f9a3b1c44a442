use crate::models::{
    Bookmark, Comment, Event, Follow, FollowRequest, FriendRequest, Friendship, Message,
    OneTimeMessage, Page, Post, User,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local store
///
/// All state sits behind one lock, so every multi-row write is atomic with
/// respect to other requests.
#[derive(Default)]
pub struct MemoryStore {
    pub(super) state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Default)]
pub(super) struct MemoryState {
    last_timestamp: Option<DateTime<Utc>>,
    pub users: HashMap<Uuid, User>,
    pub follow_requests: HashMap<Uuid, FollowRequest>,
    pub follows: Vec<Follow>,
    pub friend_requests: HashMap<Uuid, FriendRequest>,
    pub friendships: Vec<Friendship>,
    pub posts: HashMap<Uuid, Post>,
    /// (post_id, user_id, liked_at)
    pub post_likes: Vec<(Uuid, Uuid, DateTime<Utc>)>,
    pub comments: HashMap<Uuid, Comment>,
    pub bookmarks: Vec<Bookmark>,
    pub messages: Vec<Message>,
    pub one_time_messages: Vec<OneTimeMessage>,
    pub events: HashMap<Uuid, Event>,
}

impl MemoryState {
    /// Strictly increasing clock so "newest first" orderings are stable
    pub fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    /// Apply `f` to a user if present
    pub fn with_user(&mut self, user_id: Uuid, f: impl FnOnce(&mut User)) {
        if let Some(user) = self.users.get_mut(&user_id) {
            f(user);
        }
    }

    pub fn with_post(&mut self, post_id: Uuid, f: impl FnOnce(&mut Post)) {
        if let Some(post) = self.posts.get_mut(&post_id) {
            f(post);
        }
    }

    pub fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> bool {
        self.follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id)
    }

    pub fn are_friends(&self, a: Uuid, b: Uuid) -> bool {
        let (low, high) = Friendship::key(a, b);
        self.friendships
            .iter()
            .any(|f| f.user_low == low && f.user_high == high)
    }

    /// Remove comments matching `predicate` together with their replies,
    /// fixing each post's comment counter. Returns the number removed.
    pub fn remove_comments_where(&mut self, predicate: impl Fn(&Comment) -> bool) -> u64 {
        let roots: Vec<Uuid> = self
            .comments
            .values()
            .filter(|c| predicate(c))
            .map(|c| c.id)
            .collect();
        let doomed: Vec<Uuid> = self
            .comments
            .values()
            .filter(|c| {
                roots.contains(&c.id) || c.parent_id.map(|p| roots.contains(&p)).unwrap_or(false)
            })
            .map(|c| c.id)
            .collect();

        for id in &doomed {
            if let Some(comment) = self.comments.remove(id) {
                self.with_post(comment.post_id, |p| {
                    p.comments_count = (p.comments_count - 1).max(0)
                });
            }
        }
        doomed.len() as u64
    }

    /// Remove a post with its likes, comments and bookmarks
    pub fn remove_post_cascade(&mut self, post_id: Uuid) -> Option<Post> {
        let post = self.posts.remove(&post_id)?;
        self.post_likes.retain(|(p, _, _)| *p != post_id);
        self.comments.retain(|_, c| c.post_id != post_id);
        self.bookmarks.retain(|b| b.post_id != post_id);
        for other in self.posts.values_mut() {
            if other.original_post_id == Some(post_id) {
                other.original_post_id = None;
            }
        }
        Some(post)
    }
}

/// Slice an already ordered listing; `None` returns everything
pub(super) fn paginate<T>(items: Vec<T>, page: Option<Page>) -> Vec<T> {
    match page {
        Some(page) => items
            .into_iter()
            .skip(page.offset().max(0) as usize)
            .take(page.limit.max(0) as usize)
            .collect(),
        None => items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_strictly_increasing() {
        let mut state = MemoryState::default();
        let mut previous = state.now();
        for _ in 0..100 {
            let next = state.now();
            assert!(next > previous);
            previous = next;
        }
    }
}
