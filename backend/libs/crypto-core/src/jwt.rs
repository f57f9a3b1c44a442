/// Session token module for MiniBlog services
///
/// Tokens are HS256 JWTs signed with a single shared secret loaded once at
/// startup. The same token travels in the `token` cookie set at login and,
/// for non-browser clients, in an `Authorization: Bearer` header.
///
/// ## Usage
///
/// ```rust,ignore
/// use crypto_core::jwt;
///
/// let secret = std::env::var("JWT_SECRET")?;
/// jwt::initialize_jwt_secret(&secret)?;
///
/// let token = jwt::generate_token(user_id, "user", chrono::Duration::days(7))?;
/// let claims = jwt::validate_token(&token)?.claims;
/// ```
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Secrets shorter than this are rejected outright
const MIN_SECRET_LEN: usize = 16;

// ============================================================================
// Data Structures
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Role at issue time ("user" or "admin")
    pub role: String,
}

// ============================================================================
// Key Storage
// ============================================================================

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

static JWT_KEYS: OnceCell<SigningKeys> = OnceCell::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the signing secret
///
/// MUST be called during application startup before any JWT operations.
/// Can only be called once - subsequent calls return an error.
pub fn initialize_jwt_secret(secret: &str) -> Result<()> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(anyhow!(
            "JWT secret must be at least {MIN_SECRET_LEN} bytes"
        ));
    }

    let keys = SigningKeys {
        encoding: EncodingKey::from_secret(secret.as_bytes()),
        decoding: DecodingKey::from_secret(secret.as_bytes()),
    };

    JWT_KEYS
        .set(keys)
        .map_err(|_| anyhow!("JWT secret already initialized"))
}

/// Whether `initialize_jwt_secret` has completed
pub fn is_initialized() -> bool {
    JWT_KEYS.get().is_some()
}

fn keys() -> Result<&'static SigningKeys> {
    JWT_KEYS.get().ok_or_else(|| {
        anyhow!("JWT secret not initialized. Call initialize_jwt_secret() during startup.")
    })
}

// ============================================================================
// Token Generation
// ============================================================================

/// Generate a session token for `user_id` valid for `ttl`
pub fn generate_token(user_id: Uuid, role: &str, ttl: Duration) -> Result<String> {
    let now = Utc::now();
    let expiry = now + ttl;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: expiry.timestamp(),
        role: role.to_string(),
    };

    encode(&Header::new(JWT_ALGORITHM), &claims, &keys()?.encoding)
        .map_err(|e| anyhow!("Failed to generate session token: {e}"))
}

// ============================================================================
// Token Validation
// ============================================================================

/// Validate and decode a session token
///
/// Verifies the HS256 signature and the expiration claim. Tokens signed with
/// any other algorithm are rejected.
pub fn validate_token(token: &str) -> Result<TokenData<Claims>> {
    let mut validation = Validation::new(JWT_ALGORITHM);
    validation.validate_exp = true;

    decode::<Claims>(token, &keys()?.decoding, &validation)
        .map_err(|e| anyhow!("Token validation failed: {e}"))
}

/// Extract user ID from a validated token
pub fn get_user_id_from_token(token: &str) -> Result<Uuid> {
    let token_data = validate_token(token)?;
    Uuid::parse_str(&token_data.claims.sub)
        .map_err(|e| anyhow!("Invalid user ID format in token: {e}"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "unit-test-secret-0123456789abcdef";

    fn init_test_secret() {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| {
            initialize_jwt_secret(TEST_SECRET).expect("Failed to initialize test secret");
        });
    }

    #[test]
    fn test_generate_token() {
        init_test_secret();

        let token = generate_token(Uuid::new_v4(), "user", Duration::days(7));

        assert!(token.is_ok());
        assert_eq!(token.unwrap().matches('.').count(), 2);
    }

    #[test]
    fn test_validate_valid_token() {
        init_test_secret();

        let user_id = Uuid::new_v4();
        let token = generate_token(user_id, "admin", Duration::hours(1))
            .expect("Failed to generate token");

        let token_data = validate_token(&token).expect("token should validate");
        assert_eq!(token_data.claims.sub, user_id.to_string());
        assert_eq!(token_data.claims.role, "admin");
    }

    #[test]
    fn test_validate_invalid_token() {
        init_test_secret();

        assert!(validate_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        init_test_secret();

        let token = generate_token(Uuid::new_v4(), "user", Duration::hours(-2))
            .expect("Failed to generate token");

        assert!(validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_user_id() {
        init_test_secret();

        let user_id = Uuid::new_v4();
        let token = generate_token(user_id, "user", Duration::days(1))
            .expect("Failed to generate token");

        assert_eq!(get_user_id_from_token(&token).unwrap(), user_id);
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(initialize_jwt_secret("short").is_err());
    }
}
