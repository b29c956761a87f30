//! Session endpoints.
//!
//! Deliberately credential-less glue: authentication proper is outside
//! this core (spec non-goal), so a login only checks that the user exists
//! in the identity store before opening a session.

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use parlor_shared::validate_username;
use parlor_store::{StoreError, UserProfile};

use crate::api::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    success: bool,
    token: String,
    user: UserProfile,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if !validate_username(&req.username) {
        return Err(ApiError::BadRequest("invalid username format".into()));
    }

    let user = state
        .users
        .get_user(&req.username)
        .await
        .ok_or(StoreError::NotFound("user"))?;

    let token = state.sessions.login(&user.username).await;
    info!(user = %user.username, "Session opened");

    Ok(Json(LoginResponse {
        success: true,
        token,
        user,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);
    if !token.is_empty() {
        state.sessions.logout(token).await;
    }
    Json(serde_json::json!({ "success": true }))
}
