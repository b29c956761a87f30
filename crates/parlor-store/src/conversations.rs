//! Direct-message conversation service.
//!
//! Every operation authorizes through the tightened two-party predicate,
//! sanitizes free text exactly once at ingress, and runs its
//! load-mutate-save sequence under the collection writer lock.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use parlor_shared::{sanitize_text, validate_username};

use crate::collection::{JsonCollection, Record};
use crate::error::{Result, StoreError};
use crate::models::{Conversation, LastMessage, Message};
use crate::notifications::{NotificationStore, ReplyContext};
use crate::thread::{
    append_message, has_real_messages, last_message_id, mark_read_for, messages_since,
    unread_count_for, MarkReadResult, MessageThread, PollResult,
};
use crate::users::UserDirectory;

impl Record for Conversation {
    const KEY: &'static str = "conversations";

    fn id(&self) -> u64 {
        self.id
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !validate_username(&self.user.username) {
            return Err(format!(
                "conversation {} has invalid participant username: {:?}",
                self.id, self.user.username
            ));
        }
        for message in &self.messages {
            if !validate_username(&message.sender) {
                return Err(format!(
                    "conversation {} message {} has invalid sender: {:?}",
                    self.id, message.id, message.sender
                ));
            }
        }
        Ok(())
    }
}

/// Result of a start-or-find: the (possibly fresh) thread and whether the
/// create path ran.
pub struct StartOrFind {
    pub conversation: Conversation,
    pub created: bool,
}

/// Search hits: matching conversations (recency-sorted) and, per
/// conversation id, the messages that matched.
pub struct SearchResult {
    pub conversations: Vec<Conversation>,
    pub messages: BTreeMap<u64, Vec<Message>>,
}

pub struct ConversationStore {
    collection: JsonCollection<Conversation>,
    users: Arc<UserDirectory>,
    notifications: Arc<NotificationStore>,
}

impl ConversationStore {
    pub fn new(
        data_dir: &Path,
        users: Arc<UserDirectory>,
        notifications: Arc<NotificationStore>,
    ) -> Self {
        Self {
            collection: JsonCollection::new(data_dir.join("messages.json")),
            users,
            notifications,
        }
    }

    /// Find the thread between two users, or create it with the next unused
    /// id. Persists only on the create path.
    pub async fn start_or_find(
        &self,
        current_user: &str,
        target_user: &str,
    ) -> Result<StartOrFind> {
        if !validate_username(current_user) || !validate_username(target_user) {
            return Err(StoreError::InvalidInput("invalid username format".into()));
        }
        if current_user == target_user {
            return Err(StoreError::InvalidInput(
                "cannot start a conversation with yourself".into(),
            ));
        }

        let target = self
            .users
            .get_user(target_user)
            .await
            .ok_or(StoreError::NotFound("user"))?;

        let _guard = self.collection.writer().await;
        let mut conversations = self.collection.load().await;

        if let Some(existing) = conversations
            .iter()
            .find(|c| c.is_between(current_user, target_user))
        {
            let mut conversation = existing.clone();
            conversation.user = target;
            return Ok(StartOrFind {
                conversation,
                created: false,
            });
        }

        let id = conversations.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let conversation = Conversation {
            id,
            user: target,
            last_message: LastMessage {
                text: String::new(),
                timestamp: Some(Utc::now()),
                sender: current_user.to_string(),
            },
            unread_count: 0,
            messages: Vec::new(),
        };
        conversations.push(conversation.clone());
        self.collection.save(&conversations).await?;

        info!(id, a = current_user, b = target_user, "Conversation created");
        Ok(StartOrFind {
            conversation,
            created: true,
        })
    }

    /// Find an existing thread between two users without creating one.
    pub async fn find_between(
        &self,
        current_user: &str,
        target_user: &str,
    ) -> Result<Option<Conversation>> {
        if !validate_username(current_user) || !validate_username(target_user) {
            return Err(StoreError::InvalidInput("invalid username format".into()));
        }
        if current_user == target_user {
            return Err(StoreError::InvalidInput(
                "cannot find a conversation with yourself".into(),
            ));
        }

        let target = self
            .users
            .get_user(target_user)
            .await
            .ok_or(StoreError::NotFound("user"))?;

        let conversations = self.collection.load().await;
        let found = conversations
            .iter()
            .find(|c| c.is_between(current_user, target_user))
            .cloned()
            .map(|mut conversation| {
                conversation.user = target;
                conversation
            });
        Ok(found)
    }

    /// Fetch one thread with sender metadata backfilled on its messages.
    pub async fn get(&self, id: u64, viewer: &str) -> Result<Conversation> {
        let conversations = self.collection.load().await;
        let conversation = conversations
            .iter()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound("conversation"))?;

        if !conversation.is_participant(viewer) {
            return Err(StoreError::Forbidden);
        }

        let mut conversation = conversation.clone();
        self.users.enrich_messages(&mut conversation.messages).await;
        Ok(conversation)
    }

    /// Append a message. Text is sanitized here, exactly once; the
    /// other party's unread counter goes up; a reply to someone else's
    /// message emits a fire-and-forget notification.
    pub async fn send(
        &self,
        id: u64,
        sender: &str,
        text: &str,
        reply_to: Option<u64>,
    ) -> Result<Message> {
        if !validate_username(sender) {
            return Err(StoreError::Forbidden);
        }

        let text = sanitize_text(text);
        if text.is_empty() {
            return Err(StoreError::InvalidInput("message text is required".into()));
        }

        let _guard = self.collection.writer().await;
        let mut conversations = self.collection.load().await;
        let conversation = conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound("conversation"))?;

        if !conversation.is_participant(sender) {
            return Err(StoreError::Forbidden);
        }

        let profile = self.users.profile_or_stub(sender).await;
        let message = append_message(conversation, &profile, text, reply_to, Utc::now());

        if conversation.user.username != sender {
            conversation.unread_count += 1;
        }

        self.collection.save(&conversations).await?;

        self.notifications
            .notify_reply(
                &profile,
                &message,
                ReplyContext::Conversation {
                    conversation_id: id,
                },
            )
            .await;
        Ok(message)
    }

    /// Messages newer than `since_id`, marked read for the viewer as a side
    /// effect. Read-state changes persist only when a flag actually flipped.
    pub async fn poll(
        &self,
        id: u64,
        viewer: &str,
        since_id: Option<u64>,
    ) -> Result<PollResult> {
        let _guard = self.collection.writer().await;
        let mut conversations = self.collection.load().await;
        let conversation = conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound("conversation"))?;

        if !conversation.is_participant(viewer) {
            return Err(StoreError::Forbidden);
        }

        let mut changed = false;
        for message in conversation.messages.iter_mut() {
            if since_id.is_some_and(|since| message.id <= since) {
                continue;
            }
            if message.sender != viewer && !message.is_read {
                message.is_read = true;
                changed = true;
            }
        }

        let unread_count = unread_count_for(&conversation.messages, viewer);
        if changed {
            conversation.unread_count = unread_count;
        }

        let mut new_messages = messages_since(&conversation.messages, since_id);
        let cursor = last_message_id(&conversation.messages);
        self.users.enrich_messages(&mut new_messages).await;

        if changed {
            self.collection.save(&conversations).await?;
        }

        Ok(PollResult {
            new_messages,
            last_message_id: cursor,
            unread_count,
        })
    }

    /// Mark every message not sent by the viewer as read.
    pub async fn mark_read(&self, id: u64, viewer: &str) -> Result<MarkReadResult> {
        let _guard = self.collection.writer().await;
        let mut conversations = self.collection.load().await;
        let conversation = conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound("conversation"))?;

        if !conversation.is_participant(viewer) {
            return Err(StoreError::Forbidden);
        }

        let changed = mark_read_for(&mut conversation.messages, viewer);
        let unread_count = unread_count_for(&conversation.messages, viewer);
        if changed {
            conversation.unread_count = unread_count;
            self.collection.save(&conversations).await?;
        }

        Ok(MarkReadResult {
            changed,
            unread_count,
        })
    }

    /// All threads the viewer participates in that hold at least one real
    /// message, with the other-party snapshot, preview and unread count
    /// recomputed per viewer, newest activity first.
    pub async fn list_for_user(&self, viewer: &str) -> Result<Vec<Conversation>> {
        if !validate_username(viewer) {
            return Err(StoreError::Forbidden);
        }

        let conversations = self.collection.load().await;
        let mut visible = Vec::new();

        for conversation in conversations {
            if !conversation.is_participant(viewer)
                || !has_real_messages(&conversation.messages)
            {
                continue;
            }
            visible.push(self.viewer_copy(conversation, viewer).await);
        }

        visible.sort_by(|a, b| {
            last_message_id(&b.messages).cmp(&last_message_id(&a.messages))
        });
        Ok(visible)
    }

    /// Case-insensitive search over the other participant's name and the
    /// message bodies of the viewer's threads.
    pub async fn search(&self, viewer: &str, query: &str) -> Result<SearchResult> {
        if !validate_username(viewer) {
            return Err(StoreError::Forbidden);
        }

        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(SearchResult {
                conversations: Vec::new(),
                messages: BTreeMap::new(),
            });
        }

        let conversations = self.collection.load().await;
        let mut matched = Vec::new();
        let mut matched_messages = BTreeMap::new();

        for conversation in conversations {
            if !conversation.is_participant(viewer) {
                continue;
            }
            let copy = self.viewer_copy(conversation, viewer).await;

            let matches_name = copy.user.username.to_lowercase().contains(&query)
                || copy.user.full_name.to_lowercase().contains(&query);
            let hits: Vec<Message> = copy
                .messages
                .iter()
                .filter(|m| m.text.to_lowercase().contains(&query))
                .cloned()
                .collect();

            if matches_name || !hits.is_empty() {
                if !hits.is_empty() {
                    matched_messages.insert(copy.id, hits);
                }
                matched.push(copy);
            }
        }

        matched.sort_by(|a, b| {
            last_message_id(&b.messages).cmp(&last_message_id(&a.messages))
        });
        Ok(SearchResult {
            conversations: matched,
            messages: matched_messages,
        })
    }

    /// Total unread across every thread the viewer participates in.
    pub async fn unread_total(&self, viewer: &str) -> Result<u32> {
        if !validate_username(viewer) {
            return Err(StoreError::Forbidden);
        }

        let conversations = self.collection.load().await;
        Ok(conversations
            .iter()
            .filter(|c| c.is_participant(viewer))
            .map(|c| unread_count_for(&c.messages, viewer))
            .sum())
    }

    /// Rewrite a thread from the viewer's perspective: other-party
    /// snapshot, tail-derived preview, viewer-relative unread count.
    async fn viewer_copy(&self, mut conversation: Conversation, viewer: &str) -> Conversation {
        if let Some(other) = conversation.other_participant(viewer) {
            if let Some(profile) = self.users.get_user(&other).await {
                conversation.user = profile;
            }
        }
        if let Some(tail) = conversation.messages.last().cloned() {
            conversation.touch_last_message(&tail);
        }
        conversation.unread_count = unread_count_for(&conversation.messages, viewer);
        conversation
    }
}
