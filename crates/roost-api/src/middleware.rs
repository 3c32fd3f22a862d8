use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use roost_auth::ACCESS_ISSUER;

use crate::ApiError;
use crate::state::AppState;

/// The authenticated subject of the access token on this request.
#[derive(Debug, Clone, Copy)]
pub struct AuthAccount(pub u64);

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)
}

/// Pull the shared secret out of `Authorization: ApiKey <key>` (webhook).
pub fn api_key(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("ApiKey "))
        .ok_or(ApiError::Unauthorized)
}

/// Gate for mutating routes: requires a valid, unexpired **access** token.
/// Refresh tokens are rejected here by issuer mismatch, so a long-lived
/// credential can never authorize a domain operation directly.
pub async fn require_access(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?;
    let account_id = state.tokens.verify(token, ACCESS_ISSUER)?;
    req.extensions_mut().insert(AuthAccount(account_id));
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert!(bearer_token(&headers("ApiKey abc")).is_err());
        assert!(bearer_token(&HeaderMap::new()).is_err());
    }

    #[test]
    fn api_key_extraction() {
        assert_eq!(api_key(&headers("ApiKey hook-secret")).unwrap(), "hook-secret");
        assert!(api_key(&headers("Bearer abc")).is_err());
        assert!(api_key(&HeaderMap::new()).is_err());
    }
}
