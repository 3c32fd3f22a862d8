//! Domain services (messages, accounts) and the thin axum handlers in front
//! of them. Services own the business rules; handlers only decode requests,
//! run the service call off the async runtime, and encode the result.

pub mod accounts;
pub mod auth;
pub mod error;
pub mod filter;
pub mod messages;
pub mod middleware;
pub mod state;
pub mod webhooks;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

use tracing::error;

/// Run blocking store/hash work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {e}");
        ApiError::Internal("background task failed".into())
    })?
}
