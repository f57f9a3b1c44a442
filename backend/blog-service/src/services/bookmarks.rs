/// Bookmark service - saved posts with optional notes
use super::post_views;
use super::posts::post_not_found;
use crate::error::{AppError, Result};
use crate::models::{Bookmark, BookmarkView, Page};
use crate::repository::{BookmarkRepository, PostRepository, Store};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddBookmarkRequest {
    pub post_id: Uuid,
    #[validate(length(max = 200, message = "Note cannot be more than 200 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBookmarkRequest {
    #[validate(length(max = 200, message = "Note cannot be more than 200 characters"))]
    pub note: Option<String>,
}

pub struct BookmarkService {
    store: Arc<dyn Store>,
}

impl BookmarkService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The caller's bookmarks, newest first, each with its post
    pub async fn list(&self, user_id: Uuid, page: Page) -> Result<(Vec<BookmarkView>, i64)> {
        let (bookmarks, total) = self.store.bookmarks_for_user(user_id, page).await?;

        let mut posts = Vec::with_capacity(bookmarks.len());
        for bookmark in &bookmarks {
            if let Some(post) = self.store.find_post(bookmark.post_id).await? {
                posts.push(post);
            }
        }
        let mut views: HashMap<Uuid, _> = post_views(self.store.as_ref(), posts)
            .await?
            .into_iter()
            .map(|view| (view.post.id, view))
            .collect();

        let data = bookmarks
            .into_iter()
            .map(|bookmark| BookmarkView {
                post: views.remove(&bookmark.post_id),
                bookmark,
            })
            .collect();
        Ok((data, total))
    }

    pub async fn add(&self, user_id: Uuid, req: AddBookmarkRequest) -> Result<Bookmark> {
        req.validate()?;

        if self.store.find_post(req.post_id).await?.is_none() {
            return Err(post_not_found());
        }
        if self.store.find_bookmark(user_id, req.post_id).await?.is_some() {
            return Err(already_bookmarked());
        }

        let bookmark = self
            .store
            .add_bookmark(user_id, req.post_id, clean_note(req.note))
            .await?
            .ok_or_else(already_bookmarked)?;
        tracing::debug!(post_id = %req.post_id, user_id = %user_id, "bookmark added");
        Ok(bookmark)
    }

    pub async fn update_note(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        req: UpdateBookmarkRequest,
    ) -> Result<Bookmark> {
        req.validate()?;
        self.store
            .update_bookmark_note(user_id, post_id, clean_note(req.note))
            .await?
            .ok_or_else(bookmark_not_found)
    }

    pub async fn remove(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        if !self.store.remove_bookmark(user_id, post_id).await? {
            return Err(bookmark_not_found());
        }
        Ok(())
    }
}

fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

fn already_bookmarked() -> AppError {
    AppError::BadRequest("Post already bookmarked".to_string())
}

fn bookmark_not_found() -> AppError {
    AppError::NotFound("Bookmark not found".to_string())
}
