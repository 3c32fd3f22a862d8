//! Token lifecycle and password hashing.
//!
//! Tokens are HS256 JWTs; nothing about them is persisted except revocation
//! markers, which live in the store's `revoked_tokens` collection.

pub mod password;
pub mod token;

pub use token::{ACCESS_ISSUER, REFRESH_ISSUER, TokenManager};

use roost_db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Bad signature, expired, wrong issuer, revoked, or wrong credentials.
    /// Deliberately carries no detail; the distinction is logged, not exposed.
    #[error("unauthorized")]
    Unauthorized,
    #[error("token encoding failed: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}
