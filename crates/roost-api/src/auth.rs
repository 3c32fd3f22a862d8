//! Login, token refresh, and revocation flows.

use axum::{Json, extract::State, http::{HeaderMap, StatusCode}, response::IntoResponse};

use roost_types::api::{LoginRequest, LoginResponse, RefreshResponse};

use crate::middleware::bearer_token;
use crate::state::AppState;
use crate::{ApiError, blocking};

/// Authenticate and mint a fresh access + refresh pair.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let svc = state.accounts.clone();
    let account = blocking(move || svc.authenticate(&req.email, &req.password)).await?;

    let token = state.tokens.issue_access(account.id)?;
    let refresh_token = state.tokens.issue_refresh(account.id)?;

    Ok(Json(LoginResponse {
        id: account.id,
        email: account.email,
        upgraded: account.upgraded,
        token,
        refresh_token,
    }))
}

/// Trade a valid, unrevoked refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers)?.to_owned();
    let tokens = state.tokens.clone();
    // Revocation lookup hits the store, so run it off the async runtime.
    let access = blocking(move || {
        let subject = tokens.verify_refresh(&token)?;
        Ok(tokens.issue_access(subject)?)
    })
    .await?;
    Ok(Json(RefreshResponse { token: access }))
}

/// Permanently revoke the presented refresh token. Idempotent.
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers)?.to_owned();
    let tokens = state.tokens.clone();
    blocking(move || Ok(tokens.revoke(&token)?)).await?;
    Ok(StatusCode::OK)
}
