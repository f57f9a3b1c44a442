/// Auth service - registration, login, password reset and admin seeding
use crate::error::{AppError, Result};
use crate::models::{NewUser, Role, User, UserChanges};
use crate::repository::{Store, UserRepository};
use crate::security::{hash_password, verify_password};
use crate::services::EmailService;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Reset links stay valid this long
const RESET_TOKEN_TTL_MINUTES: i64 = 10;
/// Random bytes in a reset token before hex encoding
const RESET_TOKEN_BYTES: usize = 20;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,
    #[validate(email(message = "Please include a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 2, max = 30, message = "Username must be between 2 and 30 characters"))]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please include a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please include a valid email"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Identity returned alongside a fresh token
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: SessionUser,
}

pub struct AuthService {
    store: Arc<dyn Store>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create an account with the `user` role
    pub async fn register(&self, req: RegisterRequest) -> Result<User> {
        req.validate()?;

        let email = req.email.trim().to_lowercase();
        let username = req
            .username
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty());

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(user_exists());
        }
        if let Some(username) = &username {
            if self.store.find_user_by_username(username).await?.is_some() {
                return Err(AppError::BadRequest("Username already taken".to_string()));
            }
        }

        let password_hash = hash_password(&req.password)?;
        let user = self
            .store
            .create_user(NewUser {
                name: req.name.trim().to_string(),
                username,
                email,
                password_hash,
                role: Role::User,
            })
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => user_exists(),
                other => other,
            })?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Check credentials; banned accounts cannot sign in
    pub async fn login(&self, req: LoginRequest) -> Result<User> {
        req.validate()?;

        let email = req.email.trim().to_lowercase();
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(&req.password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "login rejected: wrong password");
            return Err(invalid_credentials());
        }
        if user.is_banned {
            return Err(AppError::Forbidden("Your account has been banned".to_string()));
        }

        tracing::info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    pub async fn me(&self, user_id: Uuid) -> Result<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Store a hashed reset token and email the link
    ///
    /// Unknown addresses succeed silently. If the mail cannot be sent the
    /// token is cleared again and the failure is only logged.
    pub async fn forgot_password(
        &self,
        req: ForgotPasswordRequest,
        mailer: &EmailService,
        client_url: &str,
    ) -> Result<()> {
        req.validate()?;

        let email = req.email.trim().to_lowercase();
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = crypto_core::random_token_hex(RESET_TOKEN_BYTES);
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.store
            .set_reset_token(user.id, Some(crypto_core::sha256_hex(&token)), Some(expires_at))
            .await?;

        let reset_url = format!("{}/reset-password/{}", client_url.trim_end_matches('/'), token);
        if let Err(e) = mailer.send_password_reset_email(&user.email, &reset_url).await {
            tracing::error!(user_id = %user.id, error = %e, "failed to send password reset email");
            self.store.set_reset_token(user.id, None, None).await?;
        }

        Ok(())
    }

    /// Consume a reset token and set the new password
    pub async fn reset_password(&self, token: &str, req: ResetPasswordRequest) -> Result<User> {
        req.validate()?;

        let user = self
            .store
            .find_user_by_reset_token(&crypto_core::sha256_hex(token), Utc::now())
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid or expired token".to_string()))?;

        let password_hash = hash_password(&req.password)?;
        let updated = self
            .store
            .update_user(
                user.id,
                UserChanges {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid or expired token".to_string()))?;
        self.store.set_reset_token(user.id, None, None).await?;

        tracing::info!(user_id = %user.id, "password reset");
        Ok(updated)
    }

    /// Session token for `user`, valid for `ttl_days`
    pub fn issue_token(user: &User, ttl_days: i64) -> Result<String> {
        crypto_core::jwt::generate_token(user.id, user.role.as_str(), Duration::days(ttl_days))
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    /// Create the configured administrator if no account uses that email
    pub async fn seed_admin(&self, email: &str, password: &str) -> Result<bool> {
        let email = email.trim().to_lowercase();
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Ok(false);
        }

        let password_hash = hash_password(password)?;
        let admin = self
            .store
            .create_user(NewUser {
                name: "Admin".to_string(),
                username: Some("admin".to_string()),
                email,
                password_hash,
                role: Role::Admin,
            })
            .await?;

        tracing::info!(user_id = %admin.id, "administrator account seeded");
        Ok(true)
    }
}

fn user_exists() -> AppError {
    AppError::BadRequest("User already exists".to_string())
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".to_string())
}
