//! Conversation endpoints.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use parlor_store::conversations::StartOrFind;
use parlor_store::{Conversation, Message, StoreError};

use crate::api::AppState;
use crate::error::ApiError;
use crate::session::CurrentUser;

/// A reply target: either the bare message id or a client-side stub
/// carrying one. Only the id is trusted; the stub is resolved against the
/// thread at send time.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum ReplyTo {
    Id(u64),
    Stub { id: u64 },
}

impl ReplyTo {
    pub fn id(&self) -> u64 {
        match self {
            ReplyTo::Id(id) => *id,
            ReplyTo::Stub { id } => *id,
        }
    }
}

#[derive(Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub reply_to: Option<ReplyTo>,
}

#[derive(Deserialize)]
pub struct PollQuery {
    pub since_id: Option<u64>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct StartResponse {
    success: bool,
    conversation_id: u64,
    conversation: Conversation,
    token: String,
    username_token: String,
    created: bool,
}

#[derive(Serialize)]
pub struct ThreadResponse {
    success: bool,
    conversation: Conversation,
    messages: Vec<Message>,
}

#[derive(Serialize)]
pub struct TokenThreadResponse {
    success: bool,
    conversation_id: u64,
    conversation: Conversation,
    token: String,
}

#[derive(Serialize)]
pub struct SendResponse {
    success: bool,
    message: Message,
}

#[derive(Serialize)]
pub struct PollResponse {
    new_messages: Vec<Message>,
    last_message_id: u64,
    unread_count: u32,
}

#[derive(Serialize)]
pub struct MarkReadResponse {
    success: bool,
    changed: bool,
    unread_count: u32,
}

#[derive(Serialize)]
pub struct SearchResponse {
    conversations: Vec<Conversation>,
    messages: BTreeMap<u64, Vec<Message>>,
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    success: bool,
    unread_count: u32,
}

fn start_response(state: &AppState, sf: StartOrFind, viewer: &str) -> Result<StartResponse, ApiError> {
    let token = state
        .tokens
        .issue_conversation_token(sf.conversation.id, viewer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let username_token = state
        .tokens
        .issue_username_token(&sf.conversation.user.username)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(StartResponse {
        success: true,
        conversation_id: sf.conversation.id,
        conversation: sf.conversation,
        token,
        username_token,
        created: sf.created,
    })
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    Ok(Json(state.conversations.list_for_user(&user).await?))
}

pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let unread_count = state.conversations.unread_total(&user).await?;
    Ok(Json(UnreadCountResponse {
        success: true,
        unread_count,
    }))
}

pub async fn search(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let result = state.conversations.search(&user, &query.q).await?;
    Ok(Json(SearchResponse {
        conversations: result.conversations,
        messages: result.messages,
    }))
}

pub async fn start(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<StartResponse>, ApiError> {
    let sf = state.conversations.start_or_find(&user, &username).await?;
    Ok(Json(start_response(&state, sf, &user)?))
}

pub async fn find(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<StartResponse>, ApiError> {
    let found = state
        .conversations
        .find_between(&user, &username)
        .await?
        .ok_or(StoreError::NotFound("conversation"))?;
    let sf = StartOrFind {
        conversation: found,
        created: false,
    };
    Ok(Json(start_response(&state, sf, &user)?))
}

pub async fn by_token(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(token): Path<String>,
) -> Result<Json<ThreadResponse>, ApiError> {
    let claim = state
        .tokens
        .verify_conversation_token(&token)
        .map_err(ApiError::InvalidToken)?;
    if claim.username != user {
        return Err(StoreError::Forbidden.into());
    }

    let conversation = state.conversations.get(claim.conversation_id, &user).await?;
    Ok(Json(ThreadResponse {
        success: true,
        messages: conversation.messages.clone(),
        conversation,
    }))
}

pub async fn by_username_token(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(token): Path<String>,
) -> Result<Json<TokenThreadResponse>, ApiError> {
    let claim = state
        .tokens
        .verify_username_token(&token)
        .map_err(ApiError::InvalidToken)?;
    if claim.username == user {
        return Err(ApiError::BadRequest("invalid token data".into()));
    }

    let sf = state.conversations.start_or_find(&user, &claim.username).await?;
    let conversation = state.conversations.get(sf.conversation.id, &user).await?;
    let token = state
        .tokens
        .issue_conversation_token(conversation.id, &user)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(TokenThreadResponse {
        success: true,
        conversation_id: conversation.id,
        conversation,
        token,
    }))
}

pub async fn get_one(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<ThreadResponse>, ApiError> {
    let conversation = state.conversations.get(id, &user).await?;
    Ok(Json(ThreadResponse {
        success: true,
        messages: conversation.messages.clone(),
        conversation,
    }))
}

pub async fn send(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    state.rate_limiter.check(&user).await?;

    let reply_to = req.reply_to.as_ref().map(ReplyTo::id);
    let message = state.conversations.send(id, &user, &req.text, reply_to).await?;
    Ok(Json(SendResponse {
        success: true,
        message,
    }))
}

pub async fn poll(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
    Query(query): Query<PollQuery>,
) -> Result<Json<PollResponse>, ApiError> {
    let result = state.conversations.poll(id, &user, query.since_id).await?;
    Ok(Json(PollResponse {
        new_messages: result.new_messages,
        last_message_id: result.last_message_id,
        unread_count: result.unread_count,
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let result = state.conversations.mark_read(id, &user).await?;
    Ok(Json(MarkReadResponse {
        success: true,
        changed: result.changed,
        unread_count: result.unread_count,
    }))
}
