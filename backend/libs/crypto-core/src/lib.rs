//! Shared cryptographic helpers for MiniBlog services
//!
//! - `jwt`: session token issue and validation (HS256, shared secret)
//! - `hash`: SHA-256 digests and random tokens for password reset links

pub mod hash;
pub mod jwt;

pub use hash::{random_token_hex, sha256, sha256_hex};
