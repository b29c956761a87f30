//! Group endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use parlor_store::groups::{GroupSummary, GroupUpdate, NewGroup};
use parlor_store::{Group, Message, Privacy};

use crate::api::AppState;
use crate::error::ApiError;
use crate::handlers::conversations::{PollQuery, ReplyTo, SendRequest};
use crate::session::CurrentUser;

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub privacy: Privacy,
}

#[derive(Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub privacy: Option<Privacy>,
}

#[derive(Deserialize)]
pub struct MemberRequest {
    pub username: String,
}

#[derive(Serialize)]
pub struct GroupResponse {
    success: bool,
    group: Group,
}

/// Detail view: the group record with its message array split out,
/// enriched sender metadata included.
#[derive(Serialize)]
pub struct GroupDetailResponse {
    success: bool,
    group: Group,
    messages: Vec<Message>,
    total_messages: usize,
    last_message_id: u64,
}

#[derive(Serialize)]
pub struct GroupPollResponse {
    new_messages: Vec<Message>,
    last_message_id: u64,
    unread_count: u32,
}

#[derive(Serialize)]
pub struct GroupMarkReadResponse {
    success: bool,
    changed: bool,
    unread_count: u32,
}

#[derive(Serialize)]
pub struct MembershipResponse {
    success: bool,
    is_member: bool,
    members_count: u32,
}

#[derive(Serialize)]
pub struct CategoriesResponse {
    success: bool,
    categories: Vec<String>,
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<GroupSummary>>, ApiError> {
    Ok(Json(state.groups.list_for_user(&user).await?))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateGroupRequest>,
) -> Result<Json<GroupResponse>, ApiError> {
    let group = state
        .groups
        .create(
            &user,
            NewGroup {
                name: req.name,
                description: req.description,
                category: req.category,
                privacy: req.privacy,
            },
        )
        .await?;
    Ok(Json(GroupResponse {
        success: true,
        group,
    }))
}

pub async fn categories(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        success: true,
        categories: state.groups.categories().await,
    })
}

pub async fn get_one(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<GroupDetailResponse>, ApiError> {
    let mut group = state.groups.get(id, &user).await?;
    let messages = std::mem::take(&mut group.messages);
    let last_message_id = messages.iter().map(|m| m.id).max().unwrap_or(0);

    Ok(Json(GroupDetailResponse {
        success: true,
        group,
        total_messages: messages.len(),
        last_message_id,
        messages,
    }))
}

pub async fn send(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
    Json(req): Json<SendRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.rate_limiter.check(&user).await?;

    let reply_to = req.reply_to.as_ref().map(ReplyTo::id);
    let message = state.groups.send(id, &user, &req.text, reply_to).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": message,
    })))
}

pub async fn poll(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
    Query(query): Query<PollQuery>,
) -> Result<Json<GroupPollResponse>, ApiError> {
    let result = state.groups.poll(id, &user, query.since_id).await?;
    Ok(Json(GroupPollResponse {
        new_messages: result.new_messages,
        last_message_id: result.last_message_id,
        unread_count: result.unread_count,
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<GroupMarkReadResponse>, ApiError> {
    let result = state.groups.mark_read(id, &user).await?;
    Ok(Json(GroupMarkReadResponse {
        success: true,
        changed: result.changed,
        unread_count: result.unread_count,
    }))
}

pub async fn join(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let group = state.groups.join(id, &user).await?;
    Ok(Json(MembershipResponse {
        success: true,
        is_member: true,
        members_count: group.members_count,
    }))
}

pub async fn leave(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.groups.leave(id, &user).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<Json<GroupResponse>, ApiError> {
    let group = state
        .groups
        .update(
            id,
            &user,
            GroupUpdate {
                name: req.name,
                description: req.description,
                privacy: req.privacy,
            },
        )
        .await?;
    Ok(Json(GroupResponse {
        success: true,
        group,
    }))
}

pub async fn add_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
    Json(req): Json<MemberRequest>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let group = state.groups.add_member(id, &user, &req.username).await?;
    Ok(Json(MembershipResponse {
        success: true,
        is_member: true,
        members_count: group.members_count,
    }))
}

pub async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
    Json(req): Json<MemberRequest>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let group = state.groups.remove_member(id, &user, &req.username).await?;
    Ok(Json(MembershipResponse {
        success: true,
        is_member: false,
        members_count: group.members_count,
    }))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.groups.delete(id, &user).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
