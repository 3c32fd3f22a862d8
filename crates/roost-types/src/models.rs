//! Persisted record types and the dataset they live in.
//!
//! Distinct from the API DTOs in [`crate::api`]: these are the shapes that
//! land on disk, so field names here are load-bearing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single posted message. Immutable after creation except for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub body: String,
    pub author_id: u64,
}

/// A registered account. `password_hash` is an argon2 PHC string, never a
/// plaintext password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub upgraded: bool,
}

/// The whole persisted state. Every mutation rewrites this as one document.
///
/// `BTreeMap` keeps id iteration ascending and the serialized document
/// deterministic. All fields default so the `{}` seed document written on
/// first use deserializes to an empty dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub messages: BTreeMap<u64, Message>,
    #[serde(default)]
    pub accounts: BTreeMap<u64, Account>,
    #[serde(default)]
    pub revoked_tokens: BTreeMap<String, DateTime<Utc>>,
}

impl Dataset {
    /// Next message id: current maximum + 1, starting at 1.
    ///
    /// Only meaningful inside the store's critical section; callers must
    /// never compute an id and commit it in separate store calls.
    pub fn next_message_id(&self) -> u64 {
        next_id(&self.messages)
    }

    /// Next account id, same discipline as [`Self::next_message_id`].
    pub fn next_account_id(&self) -> u64 {
        next_id(&self.accounts)
    }

    /// Case-insensitive email lookup.
    pub fn account_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
    }
}

fn next_id<T>(map: &BTreeMap<u64, T>) -> u64 {
    map.keys().next_back().map_or(1, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: u64) -> Message {
        Message {
            id,
            body: format!("message {id}"),
            author_id: 1,
        }
    }

    #[test]
    fn next_id_starts_at_one() {
        let ds = Dataset::default();
        assert_eq!(ds.next_message_id(), 1);
        assert_eq!(ds.next_account_id(), 1);
    }

    #[test]
    fn next_id_is_max_plus_one() {
        let mut ds = Dataset::default();
        ds.messages.insert(1, message(1));
        ds.messages.insert(5, message(5));
        // Gaps from deletions don't get reused.
        assert_eq!(ds.next_message_id(), 6);
    }

    #[test]
    fn email_lookup_ignores_case() {
        let mut ds = Dataset::default();
        ds.accounts.insert(
            1,
            Account {
                id: 1,
                email: "Someone@Example.com".into(),
                password_hash: "$argon2id$stub".into(),
                upgraded: false,
            },
        );
        assert!(ds.account_by_email("someone@example.com").is_some());
        assert!(ds.account_by_email("SOMEONE@EXAMPLE.COM").is_some());
        assert!(ds.account_by_email("other@example.com").is_none());
    }

    #[test]
    fn empty_document_deserializes_to_empty_dataset() {
        let ds: Dataset = serde_json::from_str("{}").unwrap();
        assert_eq!(ds, Dataset::default());
    }
}
