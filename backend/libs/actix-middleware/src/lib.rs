//! # Actix Middleware Library
//!
//! Shared middleware components for MiniBlog actix services
//!
//! ## Modules
//! - `jwt_auth`: session token authentication (cookie or bearer)

pub mod jwt_auth;

pub use jwt_auth::{extract_token, AuthClaims, JwtAuthMiddleware, TOKEN_COOKIE};
