use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Registered account
///
/// Password and reset-token hashes never leave the service.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expire: Option<DateTime<Utc>>,
    pub followers_count: i32,
    pub following_count: i32,
    pub friends_count: i32,
    pub posts_count: i32,
    pub likes_given: i32,
    pub comments_count: i32,
    pub is_active: bool,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub ban_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Sum used by the leaderboard
    pub fn activity_score(&self) -> i64 {
        i64::from(self.posts_count) + i64::from(self.likes_given) + i64::from(self.comments_count)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            bio: self.bio.clone(),
        }
    }
}

/// Public author card embedded in posts, comments and listings
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

/// Input for account creation
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial account update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatusFilter {
    Banned,
    Active,
}

/// Admin user listing filter
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive match over name, email and username
    pub search: Option<String>,
    pub status: Option<UserStatusFilter>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        let status_ok = match self.status {
            Some(UserStatusFilter::Banned) => user.is_banned,
            Some(UserStatusFilter::Active) => !user.is_banned,
            None => true,
        };
        let search_ok = match self.search.as_deref().map(str::to_lowercase) {
            Some(needle) if !needle.is_empty() => {
                user.name.to_lowercase().contains(&needle)
                    || user.email.to_lowercase().contains(&needle)
                    || user
                        .username
                        .as_deref()
                        .map(|u| u.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            }
            _ => true,
        };
        status_ok && search_ok
    }
}
