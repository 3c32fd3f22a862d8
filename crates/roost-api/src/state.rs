use std::sync::Arc;

use roost_auth::TokenManager;
use roost_db::Store;

use crate::accounts::AccountService;
use crate::messages::MessageService;

pub type AppState = Arc<AppStateInner>;

/// Everything the handlers need, constructed once at startup. No component
/// reads configuration from the ambient environment after this point.
pub struct AppStateInner {
    pub store: Arc<Store>,
    pub tokens: Arc<TokenManager>,
    pub messages: MessageService,
    pub accounts: AccountService,
    /// Shared secret for the payment webhook (`Authorization: ApiKey <key>`).
    pub webhook_key: String,
}

impl AppStateInner {
    pub fn new(store: Arc<Store>, tokens: Arc<TokenManager>, webhook_key: String) -> Self {
        Self {
            messages: MessageService::new(store.clone()),
            accounts: AccountService::new(store.clone()),
            store,
            tokens,
            webhook_key,
        }
    }
}
