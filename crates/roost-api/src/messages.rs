use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use roost_db::Store;
use roost_types::Message;
use roost_types::api::{CreateMessageRequest, MessageResponse};

use crate::middleware::AuthAccount;
use crate::state::AppState;
use crate::{ApiError, blocking, filter};

const MAX_MESSAGE_CHARS: usize = 140;

/// Message domain operations. Id assignment and persistence happen inside
/// the store's critical section; this service never peeks an id first.
#[derive(Clone)]
pub struct MessageService {
    store: Arc<Store>,
}

impl MessageService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn create(&self, body: &str, author_id: u64) -> Result<Message, ApiError> {
        if body.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ApiError::Validation("message is too long".into()));
        }
        let body = filter::censor(body);
        self.store.read_modify_write(|ds| {
            let id = ds.next_message_id();
            let message = Message {
                id,
                body: body.clone(),
                author_id,
            };
            ds.messages.insert(id, message.clone());
            Ok(message)
        })
    }

    /// All messages in ascending id order, optionally restricted to one
    /// author. The ordering is part of the contract.
    pub fn list(&self, author: Option<u64>) -> Result<Vec<Message>, ApiError> {
        let ds = self.store.load()?;
        Ok(ds
            .messages
            .into_values()
            .filter(|m| author.is_none_or(|a| m.author_id == a))
            .collect())
    }

    pub fn get(&self, id: u64) -> Result<Message, ApiError> {
        self.store
            .load()?
            .messages
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("message {id}")))
    }

    /// Existence is checked before ownership, so probing a nonexistent id
    /// yields NotFound rather than Forbidden regardless of who asks.
    pub fn delete(&self, id: u64, requester_id: u64) -> Result<(), ApiError> {
        self.store.read_modify_write(|ds| {
            let message = ds
                .messages
                .get(&id)
                .ok_or_else(|| ApiError::NotFound(format!("message {id}")))?;
            if message.author_id != requester_id {
                return Err(ApiError::Forbidden);
            }
            ds.messages.remove(&id);
            Ok(())
        })
    }
}

// -- Handlers --

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub author_id: Option<u64>,
}

pub async fn post_message(
    State(state): State<AppState>,
    Extension(AuthAccount(author_id)): Extension<AuthAccount>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let svc = state.messages.clone();
    let message = blocking(move || svc.create(&req.body, author_id)).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let svc = state.messages.clone();
    let messages = blocking(move || svc.list(query.author_id)).await?;
    let body: Vec<MessageResponse> = messages.into_iter().map(MessageResponse::from).collect();
    Ok(Json(body))
}

pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let svc = state.messages.clone();
    let message = blocking(move || svc.get(id)).await?;
    Ok(Json(MessageResponse::from(message)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Extension(AuthAccount(requester_id)): Extension<AuthAccount>,
) -> Result<impl IntoResponse, ApiError> {
    let svc = state.messages.clone();
    blocking(move || svc.delete(id, requester_id)).await?;
    Ok(StatusCode::OK)
}
