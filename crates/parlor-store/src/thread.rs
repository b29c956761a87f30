//! Generic thread abstraction shared by conversations and groups.
//!
//! Both thread kinds carry the same message shape and differ only in their
//! participancy rule (two-party denormalized pair vs. member list), so the
//! append/poll/mark-read machinery is written once against [`MessageThread`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use parlor_shared::constants::PREVIEW_CHARS;
use parlor_shared::validate_username;

use crate::models::{Conversation, Group, LastMessage, Message, ReplyRef, UserProfile};

/// A message container with a participancy rule.
pub trait MessageThread {
    fn thread_id(&self) -> u64;
    fn messages(&self) -> &[Message];
    fn messages_mut(&mut self) -> &mut Vec<Message>;

    /// May `username` read and write this thread?
    fn is_participant(&self, username: &str) -> bool;

    /// Refresh the preview snapshot from a newly appended message.
    fn touch_last_message(&mut self, message: &Message);
}

impl Conversation {
    /// Usernames this thread resolves to: the denormalized other-party
    /// field, every message sender, and (on a message-less thread) the
    /// creator recorded in `last_message.sender`.
    pub fn participants(&self) -> BTreeSet<&str> {
        let mut set = BTreeSet::new();
        if !self.user.username.is_empty() {
            set.insert(self.user.username.as_str());
        }
        for message in &self.messages {
            set.insert(message.sender.as_str());
        }
        if self.messages.is_empty() && !self.last_message.sender.is_empty() {
            set.insert(self.last_message.sender.as_str());
        }
        set
    }

    /// Both users are participants of this thread.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        self.is_participant(a) && self.is_participant(b)
    }

    /// The participant who is not `viewer`, if the thread resolves to one.
    pub fn other_participant(&self, viewer: &str) -> Option<String> {
        self.participants()
            .into_iter()
            .find(|p| *p != viewer)
            .map(String::from)
    }
}

impl MessageThread for Conversation {
    fn thread_id(&self) -> u64 {
        self.id
    }

    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn messages_mut(&mut self) -> &mut Vec<Message> {
        &mut self.messages
    }

    /// A conversation is visible to `username` iff the thread's derived
    /// parties together with the viewer resolve to exactly two users.
    /// A thread whose senders span three or more users authorizes nobody.
    ///
    /// A fully one-sided thread (only the denormalized party has spoken)
    /// cannot name its silent participant, so it stays visible to any
    /// viewer forming a two-party pair with the speaker; the pair locks
    /// down as soon as the second participant sends.
    fn is_participant(&self, username: &str) -> bool {
        if !validate_username(username) {
            return false;
        }
        let participants = self.participants();
        if participants.contains(username) {
            return participants.len() <= 2;
        }
        participants.len() == 1
    }

    fn touch_last_message(&mut self, message: &Message) {
        self.last_message = LastMessage {
            text: preview(&message.text),
            timestamp: Some(message.timestamp),
            sender: message.sender.clone(),
        };
    }
}

impl Group {
    /// The creator, or any member flagged `is_admin`.
    pub fn is_admin(&self, username: &str) -> bool {
        if !validate_username(username) {
            return false;
        }
        self.admin == username
            || self
                .members
                .iter()
                .any(|m| m.username == username && m.is_admin)
    }

    pub fn member(&self, username: &str) -> Option<&crate::models::Member> {
        self.members.iter().find(|m| m.username == username)
    }
}

impl MessageThread for Group {
    fn thread_id(&self) -> u64 {
        self.id
    }

    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn messages_mut(&mut self) -> &mut Vec<Message> {
        &mut self.messages
    }

    fn is_participant(&self, username: &str) -> bool {
        if !validate_username(username) {
            return false;
        }
        self.admin == username || self.member(username).is_some()
    }

    fn touch_last_message(&mut self, message: &Message) {
        self.last_message = Some(LastMessage {
            text: preview(&message.text),
            timestamp: Some(message.timestamp),
            sender: message.sender.clone(),
        });
    }
}

// ---------------------------------------------------------------------------
// Shared operation results
// ---------------------------------------------------------------------------

/// Poll response: new messages plus the cursor and viewer-relative unread.
pub struct PollResult {
    pub new_messages: Vec<Message>,
    pub last_message_id: u64,
    pub unread_count: u32,
}

/// Mark-read outcome. `changed` reports whether a write occurred; success
/// alone does not imply one.
pub struct MarkReadResult {
    pub changed: bool,
    pub unread_count: u32,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Next message id within a thread: `max(existing) + 1`, starting at 1.
pub fn next_message_id(messages: &[Message]) -> u64 {
    messages.iter().map(|m| m.id).max().unwrap_or(0) + 1
}

/// Id of the newest message, 0 on an empty thread.
pub fn last_message_id(messages: &[Message]) -> u64 {
    messages.iter().map(|m| m.id).max().unwrap_or(0)
}

/// Messages with id greater than `since_id`; all of them when absent.
pub fn messages_since(messages: &[Message], since_id: Option<u64>) -> Vec<Message> {
    match since_id {
        Some(since) => messages.iter().filter(|m| m.id > since).cloned().collect(),
        None => messages.to_vec(),
    }
}

/// Flag every message not sent by `viewer` as read. Returns whether any
/// flag changed.
pub fn mark_read_for(messages: &mut [Message], viewer: &str) -> bool {
    let mut changed = false;
    for message in messages.iter_mut() {
        if message.sender != viewer && !message.is_read {
            message.is_read = true;
            changed = true;
        }
    }
    changed
}

/// Unread count from `viewer`'s perspective. A sender's own messages are
/// excluded by definition, independent of their stored read flag.
pub fn unread_count_for(messages: &[Message], viewer: &str) -> u32 {
    messages
        .iter()
        .filter(|m| m.sender != viewer && !m.is_read)
        .count() as u32
}

/// Whether the thread holds at least one non-placeholder message.
pub fn has_real_messages(messages: &[Message]) -> bool {
    messages.iter().any(|m| !m.text.trim().is_empty())
}

/// Preview text for `last_message`: first 50 characters, "..." beyond.
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let truncated: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

/// Build a reply stub iff the referenced message exists in this thread.
/// A dangling id is silently dropped, not an error.
pub fn resolve_reply(messages: &[Message], reply_id: u64) -> Option<ReplyRef> {
    messages.iter().find(|m| m.id == reply_id).map(|m| ReplyRef {
        id: m.id,
        sender: m.sender.clone(),
        text: m.text.clone(),
    })
}

/// Append a message with the next id, the sender's denormalized profile and
/// a resolved reply stub, then refresh the thread's preview snapshot.
pub fn append_message(
    thread: &mut impl MessageThread,
    sender: &UserProfile,
    text: String,
    reply_to: Option<u64>,
    timestamp: DateTime<Utc>,
) -> Message {
    let message = Message {
        id: next_message_id(thread.messages()),
        sender: sender.username.clone(),
        sender_avatar: sender.avatar.clone(),
        sender_full_name: sender.full_name.clone(),
        text,
        timestamp,
        is_read: false,
        reply_to: reply_to.and_then(|rid| resolve_reply(thread.messages(), rid)),
    };
    thread.messages_mut().push(message.clone());
    thread.touch_last_message(&message);
    message
}
