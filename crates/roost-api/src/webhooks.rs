//! Payment-provider webhook. Authenticated by shared key, not a user token.

use axum::{Json, extract::State, http::{HeaderMap, StatusCode}, response::IntoResponse};
use tracing::debug;

use roost_types::api::WebhookRequest;

use crate::middleware::api_key;
use crate::state::AppState;
use crate::{ApiError, blocking};

const UPGRADE_EVENT: &str = "account.upgraded";

pub async fn post_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<WebhookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let key = api_key(&headers)?;
    if key != state.webhook_key {
        return Err(ApiError::Unauthorized);
    }

    // Only the upgrade event matters; everything else is acknowledged and
    // dropped so the provider doesn't retry.
    if req.event != UPGRADE_EVENT {
        debug!("ignoring webhook event {:?}", req.event);
        return Ok(StatusCode::OK);
    }

    let svc = state.accounts.clone();
    blocking(move || svc.upgrade(req.data.account_id).map(|_| ())).await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{Router, body::Body, http::Request, routing::post};
    use tower::ServiceExt;

    use roost_auth::TokenManager;
    use roost_db::Store;

    use super::*;
    use crate::AppStateInner;

    fn test_state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("roost.json")).unwrap());
        let tokens = Arc::new(TokenManager::new("test-secret", store.clone()));
        let state = Arc::new(AppStateInner::new(store, tokens, "hook-secret".into()));
        (dir, state)
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/api/webhooks", post(post_webhook))
            .with_state(state)
    }

    fn webhook_request(key: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/webhooks")
            .header("Authorization", format!("ApiKey {key}"))
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn wrong_key_is_unauthorized() {
        let (_dir, state) = test_state();
        let res = app(state)
            .oneshot(webhook_request(
                "wrong",
                r#"{"event":"account.upgraded","data":{"account_id":1}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_event_is_acknowledged_without_effect() {
        let (_dir, state) = test_state();
        let account = state.accounts.create("a@x.com", "pw1").unwrap();

        let res = app(state.clone())
            .oneshot(webhook_request(
                "hook-secret",
                &format!(r#"{{"event":"account.downgraded","data":{{"account_id":{}}}}}"#, account.id),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(!state.store.load().unwrap().accounts[&account.id].upgraded);
    }

    #[tokio::test]
    async fn upgrade_event_flips_the_flag() {
        let (_dir, state) = test_state();
        let account = state.accounts.create("a@x.com", "pw1").unwrap();

        let res = app(state.clone())
            .oneshot(webhook_request(
                "hook-secret",
                &format!(r#"{{"event":"account.upgraded","data":{{"account_id":{}}}}}"#, account.id),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(state.store.load().unwrap().accounts[&account.id].upgraded);
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let (_dir, state) = test_state();
        let res = app(state)
            .oneshot(webhook_request(
                "hook-secret",
                r#"{"event":"account.upgraded","data":{"account_id":99}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
