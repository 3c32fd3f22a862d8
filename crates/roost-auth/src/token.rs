use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use roost_db::Store;

use crate::AuthError;

/// Issuer claim on short-lived access tokens (1 hour).
pub const ACCESS_ISSUER: &str = "roost-access";
/// Issuer claim on long-lived refresh tokens (60 days).
pub const REFRESH_ISSUER: &str = "roost-refresh";

const ACCESS_TTL_HOURS: i64 = 1;
const REFRESH_TTL_HOURS: i64 = 1440;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
}

/// Mints and validates bearer tokens, and tracks revocations through the
/// store. Token contents themselves are never persisted.
pub struct TokenManager {
    secret: String,
    store: Arc<Store>,
}

impl TokenManager {
    pub fn new(secret: impl Into<String>, store: Arc<Store>) -> Self {
        Self {
            secret: secret.into(),
            store,
        }
    }

    pub fn issue_access(&self, subject: u64) -> Result<String, AuthError> {
        self.issue(ACCESS_ISSUER, subject, Duration::hours(ACCESS_TTL_HOURS))
    }

    pub fn issue_refresh(&self, subject: u64) -> Result<String, AuthError> {
        self.issue(REFRESH_ISSUER, subject, Duration::hours(REFRESH_TTL_HOURS))
    }

    fn issue(&self, issuer: &str, subject: u64, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            iss: issuer.to_string(),
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(AuthError::Encoding)
    }

    /// Validates signature, expiry, and issuer; returns the subject id.
    /// Does NOT consult the revocation set — refresh-flow callers must go
    /// through [`Self::verify_refresh`] instead.
    pub fn verify(&self, token: &str, expected_issuer: &str) -> Result<u64, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[expected_issuer]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            debug!("token rejected: {e}");
            AuthError::Unauthorized
        })?;

        data.claims.sub.parse().map_err(|_| {
            debug!("token subject is not an account id: {}", data.claims.sub);
            AuthError::Unauthorized
        })
    }

    /// Full refresh-token check: signature, expiry, issuer, and revocation.
    pub fn verify_refresh(&self, token: &str) -> Result<u64, AuthError> {
        let subject = self.verify(token, REFRESH_ISSUER)?;
        if self.is_revoked(token)? {
            debug!("refresh token for account {subject} is revoked");
            return Err(AuthError::Unauthorized);
        }
        Ok(subject)
    }

    /// Permanently bars a token from refresh use. Idempotent; the first
    /// revocation timestamp wins.
    pub fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let now = Utc::now();
        self.store.read_modify_write(|ds| {
            ds.revoked_tokens.entry(token.to_string()).or_insert(now);
            Ok::<_, AuthError>(())
        })
    }

    pub fn is_revoked(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.store.load()?.revoked_tokens.contains_key(token))
    }
}
