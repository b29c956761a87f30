//! HTTP API router and application state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use parlor_shared::TokenIssuer;
use parlor_store::{ConversationStore, GroupStore, UserDirectory};

use crate::handlers::{auth, conversations, groups};
use crate::rate_limit::RateLimiter;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub conversations: Arc<ConversationStore>,
    pub groups: Arc<GroupStore>,
    pub users: Arc<UserDirectory>,
    pub sessions: SessionStore,
    pub rate_limiter: RateLimiter,
    pub tokens: Arc<TokenIssuer>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Session capability
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        // Conversations
        .route("/conversations", get(conversations::list))
        .route("/conversations/unread-count", get(conversations::unread_count))
        .route("/conversations/search", get(conversations::search))
        .route("/conversations/start/{username}", post(conversations::start))
        .route("/conversations/find/{username}", get(conversations::find))
        .route("/conversations/token/{token}", get(conversations::by_token))
        .route(
            "/conversations/username-token/{token}",
            get(conversations::by_username_token),
        )
        .route("/conversations/{id}", get(conversations::get_one))
        .route("/conversations/{id}/send", post(conversations::send))
        .route("/conversations/{id}/poll", get(conversations::poll))
        .route("/conversations/{id}/mark-read", post(conversations::mark_read))
        // Groups
        .route("/groups", get(groups::list).post(groups::create))
        .route("/groups/categories", get(groups::categories))
        .route("/groups/{id}", get(groups::get_one))
        .route("/groups/{id}/send", post(groups::send))
        .route("/groups/{id}/poll", get(groups::poll))
        .route("/groups/{id}/mark-read", post(groups::mark_read))
        .route("/groups/{id}/join", post(groups::join))
        .route("/groups/{id}/leave", post(groups::leave))
        .route("/groups/{id}/update", post(groups::update))
        .route("/groups/{id}/add-member", post(groups::add_member))
        .route("/groups/{id}/remove-member", post(groups::remove_member))
        .route("/groups/{id}/delete", post(groups::delete))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
