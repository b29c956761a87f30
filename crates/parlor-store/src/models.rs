//! Domain model structs persisted in the JSON collection files.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer. Fields that older records may lack carry
//! serde defaults so legacy collections keep loading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

/// Denormalized identity snapshot (username, display name, avatar).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub avatar: String,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Stub describing the message a reply points at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyRef {
    pub id: u64,
    pub sender: String,
    pub text: String,
}

/// A single chat message. Ids are unique and increasing within one thread
/// only. `is_read` is meaningful only to a viewer other than the sender;
/// a sender's own messages never count toward their unread total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub sender: String,
    /// Sender avatar, denormalized at write time, backfilled at read time.
    #[serde(default)]
    pub sender_avatar: String,
    #[serde(default)]
    pub sender_full_name: String,
    /// Sanitized body. Sanitization happens exactly once, at ingress.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyRef>,
}

/// Preview snapshot mirroring the tail of the message list. Never
/// independently authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LastMessage {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sender: String,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A two-party direct-message thread.
///
/// `user` holds whichever party is *not* the requesting user and is
/// recomputed per viewer on read paths. `unread_count` is a viewer-relative
/// computation, not globally stored truth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: u64,
    pub user: UserProfile,
    #[serde(default)]
    pub last_message: LastMessage,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub messages: Vec<Message>,
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// Group privacy flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Privacy {
    Public,
    Private,
}

impl Default for Privacy {
    fn default() -> Self {
        Privacy::Public
    }
}

/// A group member record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
}

/// An N-party message thread with explicit membership.
///
/// `members_count` always equals `members.len()` after any mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub privacy: Privacy,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub cover_image: String,
    /// The creator; always privileged regardless of member flags.
    pub admin: String,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub members_count: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A reply notification handed to the notification collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    /// Acting user (the reply sender).
    pub user: String,
    /// User who should receive this notification.
    pub target_user: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub message_id: u64,
    pub replied_to_message_id: u64,
    pub action_text: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
