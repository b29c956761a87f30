//! Bearer-token sessions.
//!
//! Authentication proper is a capability this core consumes, not designs:
//! a login names a known user and receives an opaque token; every chat
//! endpoint resolves `current_user` from the `Authorization: Bearer`
//! header through the [`CurrentUser`] extractor.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use parlor_shared::validate_username;

use crate::api::AppState;
use crate::error::ApiError;

#[derive(Debug, Clone)]
struct SessionEntry {
    username: String,
    created_at: DateTime<Utc>,
}

/// In-memory session registry: opaque token -> user.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    max_age: Duration,
}

impl SessionStore {
    pub fn new(max_age_secs: i64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_age: Duration::seconds(max_age_secs),
        }
    }

    /// Open a session for `username` and return its opaque token.
    pub async fn login(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            token.clone(),
            SessionEntry {
                username: username.to_string(),
                created_at: Utc::now(),
            },
        );
        token
    }

    /// Resolve a token to its user. Expired sessions resolve to `None`.
    pub async fn resolve(&self, token: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(token)?;
        if Utc::now() - entry.created_at > self.max_age {
            return None;
        }
        Some(entry.username.clone())
    }

    /// Drop a session. Returns whether it existed.
    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Evict sessions past their maximum age.
    pub async fn purge_expired(&self) {
        let cutoff = Utc::now() - self.max_age;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.created_at >= cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "Purged expired sessions");
        }
    }
}

/// The authenticated user for the current request.
pub struct CurrentUser(pub String);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let token = auth.strip_prefix("Bearer ").unwrap_or(auth);
        if token.is_empty() {
            return Err(ApiError::Unauthorized);
        }

        let username = state
            .sessions
            .resolve(token)
            .await
            .ok_or(ApiError::Unauthorized)?;
        if !validate_username(&username) {
            return Err(ApiError::Unauthorized);
        }
        Ok(CurrentUser(username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_resolve_logout() {
        let store = SessionStore::new(3600);
        let token = store.login("alice").await;

        assert_eq!(store.resolve(&token).await.as_deref(), Some("alice"));
        assert!(store.logout(&token).await);
        assert!(store.resolve(&token).await.is_none());
        assert!(!store.logout(&token).await);
    }

    #[tokio::test]
    async fn test_expired_session_does_not_resolve() {
        let store = SessionStore::new(0);
        let token = store.login("alice").await;
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert!(store.resolve(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_purge_drops_expired_sessions() {
        let store = SessionStore::new(0);
        store.login("alice").await;
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        store.purge_expired().await;
        assert!(store.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_tokens_are_unique_per_login() {
        let store = SessionStore::new(3600);
        let a = store.login("alice").await;
        let b = store.login("alice").await;
        assert_ne!(a, b);
    }
}
