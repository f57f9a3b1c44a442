/// Business logic layer for blog-service
///
/// Services own the rules (ownership, state transitions, uniqueness checks
/// with friendly messages) and talk to storage through [`Store`]. Handlers
/// construct them per request from the shared [`crate::state::AppState`].
pub mod auth;
pub mod bookmarks;
pub mod comments;
pub mod email;
pub mod events;
pub mod friends;
pub mod messages;
pub mod moderation;
pub mod posts;
pub mod social_graph;
pub mod users;

pub use auth::AuthService;
pub use bookmarks::BookmarkService;
pub use comments::CommentService;
pub use email::{EmailService, MailError};
pub use events::EventService;
pub use friends::FriendService;
pub use messages::MessageService;
pub use moderation::ModerationService;
pub use posts::PostService;
pub use social_graph::SocialGraphService;
pub use users::UserService;

use crate::error::Result;
use crate::models::{Post, PostView, UserSummary};
use crate::repository::{Store, UserRepository};
use std::collections::HashMap;
use uuid::Uuid;

/// Author cards for a set of user ids, keyed by id
pub(crate) async fn user_cards(
    store: &dyn Store,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, UserSummary>> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    let cards = store.user_summaries(&ids).await?;
    Ok(cards.into_iter().map(|card| (card.id, card)).collect())
}

/// Attach author cards to posts, preserving order
pub(crate) async fn post_views(store: &dyn Store, posts: Vec<Post>) -> Result<Vec<PostView>> {
    let cards = user_cards(store, posts.iter().map(|p| p.author_id)).await?;
    Ok(posts
        .into_iter()
        .map(|post| PostView {
            author: cards.get(&post.author_id).cloned(),
            post,
        })
        .collect())
}
