//! # parlor-server
//!
//! HTTP server for the Parlor chat core.
//!
//! This binary provides:
//! - **Conversation API** (axum) for starting, listing, searching and
//!   polling direct-message threads
//! - **Group API** for membership-gated group chat and admin management
//! - **Signed access tokens** binding conversations/usernames to a user
//! - **Per-user rate limiting** on message sends
//! - **Flat-file persistence** over JSON collections with per-collection
//!   write serialization

mod api;
mod config;
mod error;
mod handlers;
mod rate_limit;
mod session;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use parlor_shared::TokenIssuer;
use parlor_store::{ConversationStore, GroupStore, NotificationStore, UserDirectory};

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;
use crate::session::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,parlor_server=debug")),
        )
        .init();

    info!("Starting Parlor server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config.http_addr, data_dir = %config.data_dir.display(), "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let users = Arc::new(UserDirectory::new(config.data_dir.join("users.json")));
    let notifications = Arc::new(NotificationStore::new(
        config.data_dir.join("notifications.json"),
    ));
    let conversations = Arc::new(ConversationStore::new(
        &config.data_dir,
        users.clone(),
        notifications.clone(),
    ));
    let groups = Arc::new(GroupStore::new(
        &config.data_dir,
        users.clone(),
        notifications.clone(),
    ));

    let tokens = Arc::new(match config.token_signing_seed {
        Some(seed) => TokenIssuer::from_seed(&seed),
        None => {
            warn!("TOKEN_SIGNING_KEY not set; using an ephemeral dev key");
            TokenIssuer::ephemeral()
        }
    });

    let sessions = SessionStore::new(config.session_max_age_secs);
    let rate_limiter = RateLimiter::system();

    let app_state = AppState {
        conversations,
        groups,
        users,
        sessions: sessions.clone(),
        rate_limiter: rate_limiter.clone(),
        tokens,
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background sweeps
    // -----------------------------------------------------------------------

    // Rate limiter cleanup: every 5 minutes, evict users with lapsed windows.
    let rl = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale().await;
        }
    });

    // Session cleanup: every 10 minutes, evict expired sessions.
    let sess = sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            sess.purge_expired().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
