//! Identity-store collaborator.
//!
//! `users.json` is owned by the wider application; this core only resolves
//! profiles from it and never writes it.

use std::path::PathBuf;

use tokio::fs;
use tracing::warn;

use parlor_shared::constants::DEFAULT_AVATAR;
use parlor_shared::validate_username;

use crate::models::UserProfile;

/// Read-only view over the user records file.
pub struct UserDirectory {
    path: PathBuf,
}

impl UserDirectory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Look up a user by username. Absent users, a missing file and
    /// malformed content all resolve to `None`.
    pub async fn get_user(&self, username: &str) -> Option<UserProfile> {
        if !validate_username(username) {
            return None;
        }

        let raw = fs::read_to_string(&self.path).await.ok()?;
        let document: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Malformed users file");
                return None;
            }
        };

        let users = document.get("users")?.as_array()?;
        let entry = users
            .iter()
            .find(|u| u.get("username").and_then(|v| v.as_str()) == Some(username))?;

        Some(UserProfile {
            username: username.to_string(),
            full_name: entry
                .get("full_name")
                .and_then(|v| v.as_str())
                .unwrap_or(username)
                .to_string(),
            avatar: entry
                .get("avatar")
                .and_then(|v| v.as_str())
                .unwrap_or(DEFAULT_AVATAR)
                .to_string(),
        })
    }

    /// Profile to denormalize for `username`, with a stub fallback when the
    /// directory does not know them (mirrors read-time backfill).
    pub async fn profile_or_stub(&self, username: &str) -> UserProfile {
        match self.get_user(username).await {
            Some(profile) => profile,
            None => UserProfile {
                username: username.to_string(),
                full_name: username.to_string(),
                avatar: DEFAULT_AVATAR.to_string(),
            },
        }
    }

    /// Backfill missing sender metadata on messages loaded from disk,
    /// looking each distinct sender up at most once.
    pub async fn enrich_messages(&self, messages: &mut [crate::models::Message]) {
        let mut cache: std::collections::HashMap<String, UserProfile> =
            std::collections::HashMap::new();

        for message in messages.iter_mut() {
            if !message.sender_avatar.is_empty() && !message.sender_full_name.is_empty() {
                continue;
            }
            if !validate_username(&message.sender) {
                continue;
            }
            let profile = match cache.get(&message.sender) {
                Some(profile) => profile.clone(),
                None => {
                    let profile = self.profile_or_stub(&message.sender).await;
                    cache.insert(message.sender.clone(), profile.clone());
                    profile
                }
            };
            if message.sender_avatar.is_empty() {
                message.sender_avatar = profile.avatar.clone();
            }
            if message.sender_full_name.is_empty() {
                message.sender_full_name = profile.full_name;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn directory_with(dir: &TempDir, body: &str) -> UserDirectory {
        let path = dir.path().join("users.json");
        std::fs::write(&path, body).unwrap();
        UserDirectory::new(path)
    }

    #[tokio::test]
    async fn test_known_user_resolves() {
        let dir = TempDir::new().unwrap();
        let users = directory_with(
            &dir,
            r#"{"users": [{"username": "alice", "full_name": "Alice L", "avatar": "a.jpg"}]}"#,
        );

        let profile = users.get_user("alice").await.unwrap();
        assert_eq!(profile.full_name, "Alice L");
        assert_eq!(profile.avatar, "a.jpg");
    }

    #[tokio::test]
    async fn test_missing_fields_fall_back() {
        let dir = TempDir::new().unwrap();
        let users = directory_with(&dir, r#"{"users": [{"username": "bob"}]}"#);

        let profile = users.get_user("bob").await.unwrap();
        assert_eq!(profile.full_name, "bob");
        assert_eq!(profile.avatar, DEFAULT_AVATAR);
    }

    #[tokio::test]
    async fn test_unknown_user_is_none_and_stub_fills_in() {
        let dir = TempDir::new().unwrap();
        let users = directory_with(&dir, r#"{"users": []}"#);

        assert!(users.get_user("ghost").await.is_none());
        let stub = users.profile_or_stub("ghost").await;
        assert_eq!(stub.username, "ghost");
        assert_eq!(stub.avatar, DEFAULT_AVATAR);
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let users = UserDirectory::new(dir.path().join("nope.json"));
        assert!(users.get_user("alice").await.is_none());
    }
}
