use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, info};

use roost_auth::password;
use roost_db::Store;
use roost_types::Account;
use roost_types::api::{AccountResponse, CreateAccountRequest, UpdateAccountRequest};

use crate::middleware::AuthAccount;
use crate::state::AppState;
use crate::{ApiError, blocking};

/// Account domain operations. Passwords are hashed before they ever reach
/// the store; plaintext is never persisted or logged.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<Store>,
}

impl AccountService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn create(&self, email: &str, password: &str) -> Result<Account, ApiError> {
        if !valid_email(email) {
            return Err(ApiError::Validation("invalid email".into()));
        }
        // Hashing is slow by design; keep it outside the critical section.
        let password_hash = password::hash_password(password)?;
        let account = self.store.read_modify_write(|ds| {
            if ds.account_by_email(email).is_some() {
                return Err(ApiError::Conflict("email already exists".into()));
            }
            let id = ds.next_account_id();
            let account = Account {
                id,
                email: email.to_string(),
                password_hash,
                upgraded: false,
            };
            ds.accounts.insert(id, account.clone());
            Ok(account)
        })?;
        info!("created account {}", account.id);
        Ok(account)
    }

    /// Unknown email and wrong password both come back as `Unauthorized`;
    /// the distinction stays in the logs.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Account, ApiError> {
        if !valid_email(email) {
            return Err(ApiError::Validation("invalid email".into()));
        }
        let ds = self.store.load()?;
        let Some(account) = ds.account_by_email(email) else {
            debug!("login failed: no account for that email");
            return Err(ApiError::Unauthorized);
        };
        password::verify_password(password, &account.password_hash).map_err(|e| {
            debug!("login failed for account {}: bad password", account.id);
            ApiError::from(e)
        })?;
        Ok(account.clone())
    }

    /// Replaces email and password. The caller has already proven (via an
    /// access token) that it is account `id`.
    pub fn update(&self, id: u64, new_email: &str, new_password: &str) -> Result<Account, ApiError> {
        if !valid_email(new_email) {
            return Err(ApiError::Validation("invalid email".into()));
        }
        let password_hash = password::hash_password(new_password)?;
        self.store.read_modify_write(|ds| {
            if ds
                .account_by_email(new_email)
                .is_some_and(|other| other.id != id)
            {
                return Err(ApiError::Conflict("email already exists".into()));
            }
            let account = ds
                .accounts
                .get_mut(&id)
                .ok_or_else(|| ApiError::NotFound(format!("account {id}")))?;
            account.email = new_email.to_string();
            account.password_hash = password_hash;
            Ok(account.clone())
        })
    }

    /// Flips the paid-tier flag. Only the payment webhook calls this.
    pub fn upgrade(&self, id: u64) -> Result<Account, ApiError> {
        let account = self.store.read_modify_write(|ds| {
            let account = ds
                .accounts
                .get_mut(&id)
                .ok_or_else(|| ApiError::NotFound(format!("account {id}")))?;
            account.upgraded = true;
            Ok::<_, ApiError>(account.clone())
        })?;
        info!("account {} upgraded", account.id);
        Ok(account)
    }
}

/// RFC-5322-flavoured sanity check, not a full grammar: one `@`, a
/// dot-atom local part, and hostname-shaped domain labels.
fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 || domain.is_empty() || domain.len() > 255 {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~.".contains(c));
    let domain_ok = domain.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    local_ok && domain_ok
}

// -- Handlers --

pub async fn post_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let svc = state.accounts.clone();
    let account = blocking(move || svc.create(&req.email, &req.password)).await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

pub async fn put_account(
    State(state): State<AppState>,
    Extension(AuthAccount(id)): Extension<AuthAccount>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let svc = state.accounts.clone();
    let account = blocking(move || svc.update(id, &req.email, &req.password)).await?;
    Ok(Json(AccountResponse::from(account)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (tempfile::TempDir, AccountService) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("roost.json")).unwrap());
        (dir, AccountService::new(store))
    }

    #[test]
    fn create_hashes_the_password() {
        let (_dir, svc) = service();
        let account = svc.create("a@x.com", "pw1").unwrap();
        assert_eq!(account.id, 1);
        assert_eq!(account.email, "a@x.com");
        assert_ne!(account.password_hash, "pw1");
        assert!(!account.upgraded);
    }

    #[test]
    fn malformed_email_is_rejected() {
        let (_dir, svc) = service();
        for bad in ["", "no-at-sign", "@x.com", "a@", "a b@x.com", "a@x..com "] {
            match svc.create(bad, "pw1") {
                Err(ApiError::Validation(_)) => {}
                other => panic!("expected Validation for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn duplicate_email_differing_only_in_case_conflicts() {
        let (_dir, svc) = service();
        svc.create("a@x.com", "pw1").unwrap();
        match svc.create("A@X.COM", "pw2") {
            Err(ApiError::Conflict(_)) => {}
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn authenticate_round_trips() {
        let (_dir, svc) = service();
        let created = svc.create("a@x.com", "pw1").unwrap();
        let authed = svc.authenticate("a@x.com", "pw1").unwrap();
        assert_eq!(authed.id, created.id);
        // Lookup is case-insensitive too.
        assert_eq!(svc.authenticate("A@x.COM", "pw1").unwrap().id, created.id);
    }

    #[test]
    fn wrong_password_and_unknown_email_are_both_unauthorized() {
        let (_dir, svc) = service();
        svc.create("a@x.com", "pw1").unwrap();
        assert!(matches!(
            svc.authenticate("a@x.com", "wrong"),
            Err(ApiError::Unauthorized)
        ));
        assert!(matches!(
            svc.authenticate("b@x.com", "pw1"),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn update_replaces_email_and_rehashes_password() {
        let (_dir, svc) = service();
        let account = svc.create("a@x.com", "pw1").unwrap();
        let updated = svc.update(account.id, "b@x.com", "pw2").unwrap();
        assert_eq!(updated.email, "b@x.com");
        assert_ne!(updated.password_hash, account.password_hash);

        svc.authenticate("b@x.com", "pw2").unwrap();
        assert!(matches!(
            svc.authenticate("b@x.com", "pw1"),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn update_to_anothers_email_conflicts_but_own_email_is_fine() {
        let (_dir, svc) = service();
        let a = svc.create("a@x.com", "pw1").unwrap();
        svc.create("b@x.com", "pw2").unwrap();

        match svc.update(a.id, "B@x.com", "pw3") {
            Err(ApiError::Conflict(_)) => {}
            other => panic!("expected Conflict, got {other:?}"),
        }
        // Keeping your own email while rotating the password is allowed.
        svc.update(a.id, "a@x.com", "pw3").unwrap();
    }

    #[test]
    fn update_unknown_account_is_not_found() {
        let (_dir, svc) = service();
        match svc.update(42, "a@x.com", "pw1") {
            Err(ApiError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn upgrade_flips_the_flag() {
        let (_dir, svc) = service();
        let account = svc.create("a@x.com", "pw1").unwrap();
        let upgraded = svc.upgrade(account.id).unwrap();
        assert!(upgraded.upgraded);
        // Idempotent in effect.
        assert!(svc.upgrade(account.id).unwrap().upgraded);
    }

    #[test]
    fn upgrade_unknown_account_is_not_found() {
        let (_dir, svc) = service();
        match svc.upgrade(7) {
            Err(ApiError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn email_validation_accepts_common_shapes() {
        for good in ["a@x.com", "first.last@example.org", "user+tag@sub.domain.io"] {
            assert!(valid_email(good), "{good} should be valid");
        }
    }
}
