/// User service - own profile, public profiles and admin account management
use super::post_views;
use crate::error::{AppError, Result};
use crate::models::{Page, Post, PostView, Role, User, UserChanges, UserFilter, UserSummary};
use crate::repository::{PostRepository, Store, UserRepository};
use crate::security::{hash_password, verify_password};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 30, message = "Username must be between 2 and 30 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "Please include a valid email"))]
    pub email: Option<String>,
    pub current_password: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: Option<String>,
    #[validate(length(max = 500, message = "Bio cannot be more than 500 characters"))]
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 30, message = "Username must be between 2 and 30 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "Please include a valid email"))]
    pub email: Option<String>,
    pub role: Option<Role>,
    #[validate(length(max = 500, message = "Bio cannot be more than 500 characters"))]
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Publicly visible account data
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(flatten)]
    pub summary: UserSummary,
    pub location: Option<String>,
    pub website: Option<String>,
    pub followers_count: i32,
    pub following_count: i32,
    pub posts_count: i32,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            summary: user.summary(),
            location: user.location.clone(),
            website: user.website.clone(),
            followers_count: user.followers_count,
            following_count: user.following_count,
            posts_count: user.posts_count,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub user: PublicUser,
    pub posts: Vec<PostView>,
}

pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User> {
        self.find(user_id).await
    }

    /// Update the caller's own profile
    ///
    /// Changing the password requires the current one.
    pub async fn update_profile(&self, user_id: Uuid, req: UpdateProfileRequest) -> Result<User> {
        req.validate()?;
        let user = self.find(user_id).await?;

        let password_hash = match req.new_password.as_deref() {
            Some(new_password) => {
                let current = req
                    .current_password
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| {
                        AppError::BadRequest("Current password is required".to_string())
                    })?;
                if !verify_password(current, &user.password_hash)? {
                    return Err(AppError::Unauthorized(
                        "Current password is incorrect".to_string(),
                    ));
                }
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        let email = normalize(req.email);
        let username = normalize(req.username);
        self.ensure_identity_free(user_id, email.as_deref(), username.as_deref())
            .await?;

        let changes = UserChanges {
            name: req.name.map(|n| n.trim().to_string()),
            username,
            email,
            password_hash,
            bio: req.bio,
            location: req.location,
            website: req.website,
            avatar_url: req.avatar_url,
            ..Default::default()
        };

        let updated = self
            .store
            .update_user(user_id, changes)
            .await
            .map_err(map_identity_conflict)?
            .ok_or_else(user_not_found)?;
        tracing::info!(user_id = %user_id, "profile updated");
        Ok(updated)
    }

    /// Delete the caller's own account with everything it owns
    pub async fn delete_account(&self, user_id: Uuid) -> Result<()> {
        let user = self.find(user_id).await?;
        if user.is_admin() {
            return Err(AppError::BadRequest(
                "Admin account cannot be deleted".to_string(),
            ));
        }

        if !self.store.delete_user(user_id).await? {
            return Err(user_not_found());
        }
        tracing::info!(user_id = %user_id, "account deleted by owner");
        Ok(())
    }

    /// Every post by the caller, drafts included
    pub async fn my_posts(&self, user_id: Uuid) -> Result<Vec<Post>> {
        self.store.posts_by_author(user_id, false).await
    }

    /// Public card plus published posts
    pub async fn public_profile(&self, user_id: Uuid) -> Result<PublicProfile> {
        let user = self.find(user_id).await?;
        let posts = self.store.posts_by_author(user_id, true).await?;
        Ok(PublicProfile {
            user: PublicUser::from(&user),
            posts: post_views(self.store.as_ref(), posts).await?,
        })
    }

    pub async fn list_users(&self, filter: &UserFilter, page: Page) -> Result<(Vec<User>, i64)> {
        self.store.list_users(filter, page).await
    }

    pub async fn admin_update(&self, user_id: Uuid, req: AdminUpdateUserRequest) -> Result<User> {
        req.validate()?;
        self.find(user_id).await?;

        let email = normalize(req.email);
        let username = normalize(req.username);
        self.ensure_identity_free(user_id, email.as_deref(), username.as_deref())
            .await?;

        let changes = UserChanges {
            name: req.name.map(|n| n.trim().to_string()),
            username,
            email,
            role: req.role,
            bio: req.bio,
            location: req.location,
            website: req.website,
            avatar_url: req.avatar_url,
            is_active: req.is_active,
            ..Default::default()
        };

        let updated = self
            .store
            .update_user(user_id, changes)
            .await
            .map_err(map_identity_conflict)?
            .ok_or_else(user_not_found)?;
        tracing::info!(user_id = %user_id, "account updated by admin");
        Ok(updated)
    }

    pub async fn admin_delete(&self, admin_id: Uuid, user_id: Uuid) -> Result<()> {
        if admin_id == user_id {
            return Err(AppError::BadRequest(
                "Admin account cannot be deleted".to_string(),
            ));
        }
        if !self.store.delete_user(user_id).await? {
            return Err(user_not_found());
        }
        tracing::info!(user_id = %user_id, admin_id = %admin_id, "account deleted by admin");
        Ok(())
    }

    async fn find(&self, user_id: Uuid) -> Result<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(user_not_found)
    }

    async fn ensure_identity_free(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        username: Option<&str>,
    ) -> Result<()> {
        if let Some(email) = email {
            if let Some(other) = self.store.find_user_by_email(email).await? {
                if other.id != user_id {
                    return Err(AppError::BadRequest("Email already in use".to_string()));
                }
            }
        }
        if let Some(username) = username {
            if let Some(other) = self.store.find_user_by_username(username).await? {
                if other.id != user_id {
                    return Err(AppError::BadRequest("Username already taken".to_string()));
                }
            }
        }
        Ok(())
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

fn map_identity_conflict(err: AppError) -> AppError {
    match err {
        AppError::Conflict(_) => {
            AppError::BadRequest("Email or username already in use".to_string())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewPost, NewUser, PostStatus};
    use crate::repository::MemoryStore;

    async fn seed(store: &Arc<dyn Store>, name: &str, password: &str, role: Role) -> User {
        store
            .create_user(NewUser {
                name: name.to_string(),
                username: Some(name.to_string()),
                email: format!("{name}@example.com"),
                password_hash: hash_password(password).unwrap(),
                role,
            })
            .await
            .unwrap()
    }

    fn new_post(author_id: Uuid, status: PostStatus) -> NewPost {
        NewPost {
            title: "Title".to_string(),
            content: "Body".to_string(),
            rich_content: None,
            author_id,
            status,
            categories: vec![],
            tags: vec![],
            feeling: None,
            location: None,
            is_reshare: false,
            original_post_id: None,
            reshare_comment: None,
        }
    }

    #[tokio::test]
    async fn test_password_change_requires_current_password() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = UserService::new(store.clone());
        let alice = seed(&store, "alice", "secret1", Role::User).await;

        let err = service
            .update_profile(
                alice.id,
                UpdateProfileRequest {
                    new_password: Some("newsecret".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, AppError::BadRequest("Current password is required".to_string()));

        let err = service
            .update_profile(
                alice.id,
                UpdateProfileRequest {
                    current_password: Some("wrong1".to_string()),
                    new_password: Some("newsecret".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let updated = service
            .update_profile(
                alice.id,
                UpdateProfileRequest {
                    current_password: Some("secret1".to_string()),
                    new_password: Some("newsecret".to_string()),
                    bio: Some("Hello".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("Hello"));
        assert!(verify_password("newsecret", &updated.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_username_must_be_unique() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = UserService::new(store.clone());
        let alice = seed(&store, "alice", "secret1", Role::User).await;
        seed(&store, "bob", "secret1", Role::User).await;

        let err = service
            .update_profile(
                alice.id,
                UpdateProfileRequest {
                    username: Some("Bob".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, AppError::BadRequest("Username already taken".to_string()));
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_own_account() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = UserService::new(store.clone());
        let admin = seed(&store, "root", "secret1", Role::Admin).await;
        let alice = seed(&store, "alice", "secret1", Role::User).await;

        assert!(service.delete_account(admin.id).await.is_err());
        assert!(service.admin_delete(admin.id, admin.id).await.is_err());

        service.delete_account(alice.id).await.unwrap();
        assert!(store.find_user(alice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_public_profile_hides_drafts() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = UserService::new(store.clone());
        let alice = seed(&store, "alice", "secret1", Role::User).await;

        store
            .create_post(new_post(alice.id, PostStatus::Published))
            .await
            .unwrap();
        store
            .create_post(new_post(alice.id, PostStatus::Draft))
            .await
            .unwrap();

        let profile = service.public_profile(alice.id).await.unwrap();
        assert_eq!(profile.posts.len(), 1);
        assert_eq!(profile.user.posts_count, 2);

        assert_eq!(service.my_posts(alice.id).await.unwrap().len(), 2);
    }
}
