//! Notification collaborator.
//!
//! Reply notifications are prepended to `notifications.json`. The chat core
//! fires and forgets: callers log failures and never propagate them to the
//! sender of the originating message.

use std::path::PathBuf;

use chrono::Utc;
use tracing::warn;

use parlor_shared::validate_username;

use crate::collection::{JsonCollection, Record};
use crate::error::Result;
use crate::models::{Message, Notification, UserProfile};

/// Which kind of thread a reply notification originates from.
pub enum ReplyContext<'a> {
    Conversation { conversation_id: u64 },
    Group { group_id: u64, group_name: &'a str },
}

impl Record for Notification {
    const KEY: &'static str = "notifications";

    fn id(&self) -> u64 {
        self.id
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !validate_username(&self.user) {
            return Err(format!("invalid actor username: {}", self.user));
        }
        if !validate_username(&self.target_user) {
            return Err(format!("invalid target username: {}", self.target_user));
        }
        Ok(())
    }
}

pub struct NotificationStore {
    collection: JsonCollection<Notification>,
}

impl NotificationStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            collection: JsonCollection::new(path),
        }
    }

    /// Assign the next id and prepend the notification (newest first).
    pub async fn create(&self, mut notification: Notification) -> Result<()> {
        let _guard = self.collection.writer().await;
        let mut notifications = self.collection.load().await;
        notification.id = notifications.iter().map(|n| n.id).max().unwrap_or(0) + 1;
        notifications.insert(0, notification);
        self.collection.save(&notifications).await
    }

    pub async fn list(&self) -> Vec<Notification> {
        self.collection.load().await
    }

    /// Fire-and-forget reply notification. No-op when the message is not a
    /// reply or replies to its own sender; failures are logged and never
    /// reach the sender of the originating message.
    pub async fn notify_reply(
        &self,
        actor: &UserProfile,
        message: &Message,
        context: ReplyContext<'_>,
    ) {
        let Some(reply) = &message.reply_to else {
            return;
        };
        if reply.sender.is_empty() || reply.sender == message.sender {
            return;
        }

        let (kind, action_text, conversation_id, group_id, group_name) = match context {
            ReplyContext::Conversation { conversation_id } => (
                "message_reply",
                "replied to your message".to_string(),
                Some(conversation_id),
                None,
                None,
            ),
            ReplyContext::Group {
                group_id,
                group_name,
            } => (
                "group_reply",
                format!("replied to your message in {group_name}"),
                None,
                Some(group_id),
                Some(group_name.to_string()),
            ),
        };

        let notification = Notification {
            id: 0,
            kind: kind.to_string(),
            user: message.sender.clone(),
            target_user: reply.sender.clone(),
            avatar: actor.avatar.clone(),
            conversation_id,
            group_id,
            group_name,
            message_id: message.id,
            replied_to_message_id: reply.id,
            action_text,
            is_read: false,
            created_at: Utc::now(),
        };

        if let Err(e) = self.create(notification).await {
            warn!(error = %e, "Failed to record reply notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn notification(actor: &str, target: &str) -> Notification {
        Notification {
            id: 0,
            kind: "message_reply".to_string(),
            user: actor.to_string(),
            target_user: target.to_string(),
            avatar: String::new(),
            conversation_id: Some(1),
            group_id: None,
            group_name: None,
            message_id: 2,
            replied_to_message_id: 1,
            action_text: "replied to your message".to_string(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_prepends() {
        let dir = TempDir::new().unwrap();
        let store = NotificationStore::new(dir.path().join("notifications.json"));

        store.create(notification("alice", "bob")).await.unwrap();
        store.create(notification("bob", "alice")).await.unwrap();

        let all = store.list().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, 2);
        assert_eq!(all[0].user, "bob");
        assert_eq!(all[1].id, 1);
    }

    #[tokio::test]
    async fn test_invalid_usernames_rejected() {
        let dir = TempDir::new().unwrap();
        let store = NotificationStore::new(dir.path().join("notifications.json"));
        assert!(store.create(notification("bad actor", "bob")).await.is_err());
    }
}
