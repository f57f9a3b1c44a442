//! Storage layer
//!
//! One `#[async_trait]` repository trait per aggregate, implemented for both
//! [`PgStore`] (PostgreSQL, the production backend) and [`MemoryStore`]
//! (process-local, used for local runs and tests). Multi-row writes that keep
//! denormalized counters in step run inside one transaction on PostgreSQL and
//! under one write lock in memory.
mod bookmarks;
mod comments;
mod events;
mod friends;
mod memory;
mod messages;
mod postgres;
mod posts;
mod social_graph;
mod users;

pub use bookmarks::BookmarkRepository;
pub use comments::CommentRepository;
pub use events::EventRepository;
pub use friends::FriendRepository;
pub use memory::MemoryStore;
pub use messages::MessageRepository;
pub use postgres::{PgStore, MIGRATOR};
pub use posts::PostRepository;
pub use social_graph::SocialGraphRepository;
pub use users::UserRepository;

use crate::error::Result;

/// Every repository behind one handle
#[async_trait::async_trait]
pub trait Store:
    UserRepository
    + SocialGraphRepository
    + FriendRepository
    + PostRepository
    + CommentRepository
    + BookmarkRepository
    + MessageRepository
    + EventRepository
    + Send
    + Sync
{
    /// Cheap liveness probe of the backing storage
    async fn ping(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Escape `%`, `_` and `\` for use inside an ILIKE pattern
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
