//! Group service: membership-gated message threads plus admin-gated
//! management operations.
//!
//! Groups reuse the conversation send/poll machinery through
//! [`MessageThread`], substituting the member-list participancy rule for
//! the two-party pair. `members_count` equals `members.len()` after every
//! mutation. Unlike conversation polls, a group poll never flips read
//! flags; clients mark a group read explicitly when its chat is open.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;

use parlor_shared::constants::{
    DEFAULT_GROUP_AVATAR, DEFAULT_GROUP_COVER, MAX_GROUP_DESCRIPTION_CHARS, MAX_GROUP_NAME_CHARS,
};
use parlor_shared::validate_username;

use crate::collection::{JsonCollection, Record};
use crate::error::{Result, StoreError};
use crate::models::{Group, LastMessage, Member, Message, Privacy};
use crate::notifications::{NotificationStore, ReplyContext};
use crate::thread::{
    append_message, last_message_id, mark_read_for, messages_since, unread_count_for,
    MarkReadResult, MessageThread, PollResult,
};
use crate::users::UserDirectory;

impl Record for Group {
    const KEY: &'static str = "groups";

    fn id(&self) -> u64 {
        self.id
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !validate_username(&self.admin) {
            return Err(format!(
                "group {} has invalid admin username: {:?}",
                self.id, self.admin
            ));
        }
        for member in &self.members {
            if !validate_username(&member.username) {
                return Err(format!(
                    "group {} has invalid member username: {:?}",
                    self.id, member.username
                ));
            }
        }
        for message in &self.messages {
            if !validate_username(&message.sender) {
                return Err(format!(
                    "group {} message {} has invalid sender: {:?}",
                    self.id, message.id, message.sender
                ));
            }
        }
        Ok(())
    }
}

/// Parameters for creating a group.
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub category: String,
    pub privacy: Privacy,
}

/// Admin-editable group settings; `None` leaves a field untouched.
#[derive(Default)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub privacy: Option<Privacy>,
}

/// Lightweight per-viewer group listing entry (no message array).
#[derive(Debug, Clone, serde::Serialize)]
pub struct GroupSummary {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub avatar: String,
    pub cover_image: String,
    pub members_count: u32,
    pub category: String,
    pub privacy: Privacy,
    pub admin: String,
    pub created_at: chrono::DateTime<Utc>,
    pub members: Vec<Member>,
    pub is_member: bool,
    pub is_admin: bool,
    pub unread_count: u32,
    pub last_message: LastMessage,
}

/// Distinct group categories, cached until the next successful write.
///
/// Owns its own invalidation trigger instead of living in module-global
/// state; the store invalidates it after every save.
pub struct CategoryCache {
    cached: Mutex<Option<Vec<String>>>,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self {
            cached: Mutex::new(None),
        }
    }

    async fn get(&self) -> Option<Vec<String>> {
        self.cached.lock().await.clone()
    }

    async fn fill(&self, categories: Vec<String>) {
        *self.cached.lock().await = Some(categories);
    }

    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

impl Default for CategoryCache {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GroupStore {
    collection: JsonCollection<Group>,
    users: Arc<UserDirectory>,
    notifications: Arc<NotificationStore>,
    categories: CategoryCache,
}

impl GroupStore {
    pub fn new(
        data_dir: &Path,
        users: Arc<UserDirectory>,
        notifications: Arc<NotificationStore>,
    ) -> Self {
        Self {
            collection: JsonCollection::new(data_dir.join("groups.json")),
            users,
            notifications,
            categories: CategoryCache::new(),
        }
    }

    /// Persist the collection and drop the category cache.
    async fn persist(&self, groups: &[Group]) -> Result<()> {
        self.collection.save(groups).await?;
        self.categories.invalidate().await;
        Ok(())
    }

    /// Create a group; the creator becomes its admin and sole member.
    pub async fn create(&self, creator: &str, params: NewGroup) -> Result<Group> {
        if !validate_username(creator) {
            return Err(StoreError::Forbidden);
        }

        let name = clip(params.name.trim(), MAX_GROUP_NAME_CHARS);
        let description = clip(params.description.trim(), MAX_GROUP_DESCRIPTION_CHARS);
        if name.is_empty() {
            return Err(StoreError::InvalidInput("group name is required".into()));
        }
        if description.is_empty() {
            return Err(StoreError::InvalidInput(
                "group description is required".into(),
            ));
        }
        let category = if params.category.trim().is_empty() {
            "other".to_string()
        } else {
            params.category.trim().to_string()
        };

        let profile = self.users.profile_or_stub(creator).await;
        let now = Utc::now();

        let _guard = self.collection.writer().await;
        let mut groups = self.collection.load().await;
        let id = groups.iter().map(|g| g.id).max().unwrap_or(0) + 1;

        let group = Group {
            id,
            name,
            description,
            category,
            privacy: params.privacy,
            avatar: DEFAULT_GROUP_AVATAR.to_string(),
            cover_image: DEFAULT_GROUP_COVER.to_string(),
            admin: creator.to_string(),
            members: vec![Member {
                username: profile.username,
                full_name: profile.full_name,
                avatar: profile.avatar,
                is_admin: true,
                joined_at: now,
            }],
            members_count: 1,
            created_at: now,
            last_message: None,
            messages: Vec::new(),
        };
        groups.push(group.clone());
        self.persist(&groups).await?;

        info!(id, admin = creator, "Group created");
        Ok(group)
    }

    /// Fetch one group with sender metadata backfilled on its messages.
    pub async fn get(&self, id: u64, viewer: &str) -> Result<Group> {
        let groups = self.collection.load().await;
        let group = groups
            .iter()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound("group"))?;

        if !group.is_participant(viewer) {
            return Err(StoreError::Forbidden);
        }

        let mut group = group.clone();
        self.users.enrich_messages(&mut group.messages).await;
        Ok(group)
    }

    /// Groups the viewer belongs to, newest activity first.
    pub async fn list_for_user(&self, viewer: &str) -> Result<Vec<GroupSummary>> {
        if !validate_username(viewer) {
            return Err(StoreError::Forbidden);
        }

        let groups = self.collection.load().await;
        let mut summaries: Vec<(u64, GroupSummary)> = groups
            .iter()
            .filter(|g| g.is_participant(viewer))
            .map(|g| (last_message_id(&g.messages), summarize(g, viewer)))
            .collect();

        summaries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(summaries.into_iter().map(|(_, s)| s).collect())
    }

    /// Append a message to a group the sender belongs to.
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

        let text = parlor_shared::sanitize_text(text);
        if text.is_empty() {
            return Err(StoreError::InvalidInput("message text is required".into()));
        }

        let _guard = self.collection.writer().await;
        let mut groups = self.collection.load().await;
        let group = groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound("group"))?;

        if !group.is_participant(sender) {
            return Err(StoreError::Forbidden);
        }

        let profile = self.users.profile_or_stub(sender).await;
        let message = append_message(group, &profile, text, reply_to, Utc::now());
        let group_name = group.name.clone();

        self.persist(&groups).await?;

        self.notifications
            .notify_reply(
                &profile,
                &message,
                ReplyContext::Group {
                    group_id: id,
                    group_name: &group_name,
                },
            )
            .await;
        Ok(message)
    }

    /// Messages newer than `since_id`. Read flags are left alone; the
    /// unread count is 0 whenever the viewer sent the latest message.
    pub async fn poll(&self, id: u64, viewer: &str, since_id: Option<u64>) -> Result<PollResult> {
        let groups = self.collection.load().await;
        let group = groups
            .iter()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound("group"))?;

        if !group.is_participant(viewer) {
            return Err(StoreError::Forbidden);
        }

        let mut new_messages = messages_since(&group.messages, since_id);
        self.users.enrich_messages(&mut new_messages).await;

        Ok(PollResult {
            new_messages,
            last_message_id: last_message_id(&group.messages),
            unread_count: viewer_unread(group, viewer),
        })
    }

    /// Mark every message not sent by the viewer as read.
    pub async fn mark_read(&self, id: u64, viewer: &str) -> Result<MarkReadResult> {
        let _guard = self.collection.writer().await;
        let mut groups = self.collection.load().await;
        let group = groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound("group"))?;

        if !group.is_participant(viewer) {
            return Err(StoreError::Forbidden);
        }

        let changed = mark_read_for(&mut group.messages, viewer);
        let unread_count = unread_count_for(&group.messages, viewer);
        if changed {
            self.persist(&groups).await?;
        }

        Ok(MarkReadResult {
            changed,
            unread_count,
        })
    }

    /// Update group settings (admin only).
    pub async fn update(&self, id: u64, actor: &str, update: GroupUpdate) -> Result<Group> {
        let _guard = self.collection.writer().await;
        let mut groups = self.collection.load().await;
        let group = groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound("group"))?;

        if !group.is_admin(actor) {
            return Err(StoreError::Forbidden);
        }

        if let Some(name) = update.name {
            let name = clip(name.trim(), MAX_GROUP_NAME_CHARS);
            if name.is_empty() {
                return Err(StoreError::InvalidInput("group name is required".into()));
            }
            group.name = name;
        }
        if let Some(description) = update.description {
            group.description = clip(description.trim(), MAX_GROUP_DESCRIPTION_CHARS);
        }
        if let Some(privacy) = update.privacy {
            group.privacy = privacy;
        }

        let updated = group.clone();
        self.persist(&groups).await?;
        Ok(updated)
    }

    /// Add a member (admin only). The user must exist in the directory.
    pub async fn add_member(&self, id: u64, actor: &str, username: &str) -> Result<Group> {
        if !validate_username(username) {
            return Err(StoreError::InvalidInput("invalid username format".into()));
        }
        let profile = self
            .users
            .get_user(username)
            .await
            .ok_or(StoreError::NotFound("user"))?;

        let _guard = self.collection.writer().await;
        let mut groups = self.collection.load().await;
        let group = groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound("group"))?;

        if !group.is_admin(actor) {
            return Err(StoreError::Forbidden);
        }
        if group.member(username).is_some() {
            return Err(StoreError::InvalidInput(
                "user is already a member".into(),
            ));
        }

        group.members.push(Member {
            username: profile.username,
            full_name: profile.full_name,
            avatar: profile.avatar,
            is_admin: false,
            joined_at: Utc::now(),
        });
        group.members_count = group.members.len() as u32;

        let updated = group.clone();
        self.persist(&groups).await?;

        info!(id, member = username, "Group member added");
        Ok(updated)
    }

    /// Remove a member (admin only). The group admin cannot be removed.
    /// Removing a non-member is a no-op success.
    pub async fn remove_member(&self, id: u64, actor: &str, username: &str) -> Result<Group> {
        let _guard = self.collection.writer().await;
        let mut groups = self.collection.load().await;
        let group = groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound("group"))?;

        if !group.is_admin(actor) {
            return Err(StoreError::Forbidden);
        }
        if group.admin == username {
            return Err(StoreError::InvalidInput(
                "cannot remove the group admin".into(),
            ));
        }

        let before = group.members.len();
        group.members.retain(|m| m.username != username);
        group.members_count = group.members.len() as u32;
        let changed = group.members.len() != before;

        let updated = group.clone();
        if changed {
            self.persist(&groups).await?;
            info!(id, member = username, "Group member removed");
        }
        Ok(updated)
    }

    /// Join a public group. Private groups admit members through the admin.
    pub async fn join(&self, id: u64, viewer: &str) -> Result<Group> {
        if !validate_username(viewer) {
            return Err(StoreError::Forbidden);
        }
        let profile = self.users.profile_or_stub(viewer).await;

        let _guard = self.collection.writer().await;
        let mut groups = self.collection.load().await;
        let group = groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound("group"))?;

        if group.privacy == Privacy::Private {
            return Err(StoreError::Forbidden);
        }
        if group.is_participant(viewer) {
            return Err(StoreError::InvalidInput(
                "user is already a member".into(),
            ));
        }

        group.members.push(Member {
            username: profile.username,
            full_name: profile.full_name,
            avatar: profile.avatar,
            is_admin: false,
            joined_at: Utc::now(),
        });
        group.members_count = group.members.len() as u32;

        let updated = group.clone();
        self.persist(&groups).await?;

        info!(id, member = viewer, "Group joined");
        Ok(updated)
    }

    /// Leave a group. The admin cannot leave; they delete instead.
    pub async fn leave(&self, id: u64, viewer: &str) -> Result<()> {
        let _guard = self.collection.writer().await;
        let mut groups = self.collection.load().await;
        let group = groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound("group"))?;

        if !group.is_participant(viewer) {
            return Err(StoreError::Forbidden);
        }
        if group.admin == viewer {
            return Err(StoreError::InvalidInput(
                "admin cannot leave the group; delete it instead".into(),
            ));
        }

        group.members.retain(|m| m.username != viewer);
        group.members_count = group.members.len() as u32;
        self.persist(&groups).await?;

        info!(id, member = viewer, "Group left");
        Ok(())
    }

    /// Delete a group wholesale (admin only).
    pub async fn delete(&self, id: u64, actor: &str) -> Result<()> {
        let _guard = self.collection.writer().await;
        let mut groups = self.collection.load().await;
        let group = groups
            .iter()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound("group"))?;

        if !group.is_admin(actor) {
            return Err(StoreError::Forbidden);
        }

        groups.retain(|g| g.id != id);
        self.persist(&groups).await?;

        info!(id, by = actor, "Group deleted");
        Ok(())
    }

    /// Distinct categories across all groups, cached until the next
    /// successful write.
    pub async fn categories(&self) -> Vec<String> {
        if let Some(cached) = self.categories.get().await {
            return cached;
        }

        let groups = self.collection.load().await;
        let mut categories: Vec<String> = groups
            .iter()
            .map(|g| g.category.clone())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort();
        categories.dedup();

        self.categories.fill(categories.clone()).await;
        categories
    }
}

/// Group unread rule: the viewer sent the latest message → 0, otherwise
/// count unread messages from others.
fn viewer_unread(group: &Group, viewer: &str) -> u32 {
    match group.messages.last() {
        Some(last) if last.sender == viewer => 0,
        Some(_) => unread_count_for(&group.messages, viewer),
        None => 0,
    }
}

fn summarize(group: &Group, viewer: &str) -> GroupSummary {
    let last_message = group
        .messages
        .last()
        .map(|m| LastMessage {
            text: crate::thread::preview(&m.text),
            timestamp: Some(m.timestamp),
            sender: m.sender.clone(),
        })
        .unwrap_or_default();

    GroupSummary {
        id: group.id,
        name: group.name.clone(),
        description: group.description.clone(),
        avatar: group.avatar.clone(),
        cover_image: group.cover_image.clone(),
        members_count: group.members_count,
        category: group.category.clone(),
        privacy: group.privacy,
        admin: group.admin.clone(),
        created_at: group.created_at,
        members: group.members.clone(),
        is_member: true,
        is_admin: group.is_admin(viewer),
        unread_count: viewer_unread(group, viewer),
        last_message,
    }
}

/// Truncate to a character budget without splitting a code point.
fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn users_file(dir: &TempDir) -> Arc<UserDirectory> {
        let path = dir.path().join("users.json");
        std::fs::write(
            &path,
            r#"{"users": [
                {"username": "mia", "full_name": "Mia K", "avatar": "m.jpg"},
                {"username": "xavier", "full_name": "Xavier P", "avatar": "x.jpg"},
                {"username": "noah", "full_name": "Noah R", "avatar": "n.jpg"}
            ]}"#,
        )
        .unwrap();
        Arc::new(UserDirectory::new(path))
    }

    fn store(dir: &TempDir) -> GroupStore {
        let users = users_file(dir);
        let notifications = Arc::new(NotificationStore::new(
            dir.path().join("notifications.json"),
        ));
        GroupStore::new(dir.path(), users, notifications)
    }

    fn new_group(name: &str) -> NewGroup {
        NewGroup {
            name: name.to_string(),
            description: "a test group".to_string(),
            category: "tech".to_string(),
            privacy: Privacy::Public,
        }
    }

    #[tokio::test]
    async fn test_admin_member_delete_scenario() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        // M creates G: sole admin member.
        let group = store.create("mia", new_group("rustaceans")).await.unwrap();
        assert_eq!(group.members_count, 1);
        assert!(group.members[0].is_admin);

        // M adds X: count tracks the member list, X is not an admin.
        let group = store.add_member(group.id, "mia", "xavier").await.unwrap();
        assert_eq!(group.members_count, 2);
        let xavier = group.member("xavier").unwrap();
        assert!(!xavier.is_admin);

        // X may not delete; M may.
        assert!(matches!(
            store.delete(group.id, "xavier").await,
            Err(StoreError::Forbidden)
        ));
        store.delete(group.id, "mia").await.unwrap();
        assert!(store.list_for_user("mia").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_member_denied() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let group = store.create("mia", new_group("closed")).await.unwrap();

        assert!(matches!(
            store.get(group.id, "noah").await,
            Err(StoreError::Forbidden)
        ));
        assert!(matches!(
            store.send(group.id, "noah", "hi", None).await,
            Err(StoreError::Forbidden)
        ));
        assert!(matches!(
            store.poll(group.id, "noah", None).await,
            Err(StoreError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_join_respects_privacy() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let public = store.create("mia", new_group("open")).await.unwrap();
        let joined = store.join(public.id, "noah").await.unwrap();
        assert_eq!(joined.members_count, 2);
        assert!(matches!(
            store.join(public.id, "noah").await,
            Err(StoreError::InvalidInput(_))
        ));

        let private = store
            .create(
                "mia",
                NewGroup {
                    privacy: Privacy::Private,
                    ..new_group("invite-only")
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            store.join(private.id, "noah").await,
            Err(StoreError::Forbidden)
        ));

        // The admin can still add members to a private group.
        let updated = store.add_member(private.id, "mia", "noah").await.unwrap();
        assert_eq!(updated.members_count, 2);
    }

    #[tokio::test]
    async fn test_leave_rules() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let group = store.create("mia", new_group("leavers")).await.unwrap();
        store.add_member(group.id, "mia", "xavier").await.unwrap();

        assert!(matches!(
            store.leave(group.id, "mia").await,
            Err(StoreError::InvalidInput(_))
        ));
        store.leave(group.id, "xavier").await.unwrap();

        let reloaded = store.get(group.id, "mia").await.unwrap();
        assert_eq!(reloaded.members_count, 1);
        assert!(reloaded.member("xavier").is_none());
    }

    #[tokio::test]
    async fn test_remove_member_keeps_admin() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let group = store.create("mia", new_group("mods")).await.unwrap();
        store.add_member(group.id, "mia", "xavier").await.unwrap();

        assert!(matches!(
            store.remove_member(group.id, "mia", "mia").await,
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            store.remove_member(group.id, "xavier", "mia").await,
            Err(StoreError::Forbidden)
        ));

        let updated = store.remove_member(group.id, "mia", "xavier").await.unwrap();
        assert_eq!(updated.members_count, 1);
    }

    #[tokio::test]
    async fn test_group_messaging_and_unread_rule() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let group = store.create("mia", new_group("chatty")).await.unwrap();
        store.add_member(group.id, "mia", "xavier").await.unwrap();

        store.send(group.id, "xavier", "first", None).await.unwrap();
        store.send(group.id, "xavier", "second", None).await.unwrap();

        // Mia sees two unread; Xavier sent the tail and sees zero.
        let mia_poll = store.poll(group.id, "mia", Some(0)).await.unwrap();
        assert_eq!(mia_poll.new_messages.len(), 2);
        assert_eq!(mia_poll.unread_count, 2);
        let xavier_poll = store.poll(group.id, "xavier", Some(0)).await.unwrap();
        assert_eq!(xavier_poll.unread_count, 0);

        // Group polls leave read flags alone; mark-read flips them.
        let still = store.poll(group.id, "mia", Some(0)).await.unwrap();
        assert_eq!(still.unread_count, 2);
        let marked = store.mark_read(group.id, "mia").await.unwrap();
        assert!(marked.changed);
        assert_eq!(marked.unread_count, 0);
    }

    #[tokio::test]
    async fn test_group_message_ids_independent_of_other_groups() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let a = store.create("mia", new_group("alpha")).await.unwrap();
        let b = store.create("mia", new_group("beta")).await.unwrap();

        let m1 = store.send(a.id, "mia", "in alpha", None).await.unwrap();
        let m2 = store.send(b.id, "mia", "in beta", None).await.unwrap();
        assert_eq!(m1.id, 1);
        assert_eq!(m2.id, 1);
    }

    #[tokio::test]
    async fn test_update_is_admin_gated_and_clips() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let group = store.create("mia", new_group("renamed")).await.unwrap();
        store.add_member(group.id, "mia", "xavier").await.unwrap();

        assert!(matches!(
            store
                .update(group.id, "xavier", GroupUpdate::default())
                .await,
            Err(StoreError::Forbidden)
        ));

        let long_name = "n".repeat(80);
        let updated = store
            .update(
                group.id,
                "mia",
                GroupUpdate {
                    name: Some(long_name),
                    description: None,
                    privacy: Some(Privacy::Private),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name.chars().count(), MAX_GROUP_NAME_CHARS);
        assert_eq!(updated.privacy, Privacy::Private);
    }

    #[tokio::test]
    async fn test_categories_cache_invalidates_on_write() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.create("mia", new_group("one")).await.unwrap();
        assert_eq!(store.categories().await, vec!["tech".to_string()]);

        store
            .create(
                "mia",
                NewGroup {
                    category: "books".to_string(),
                    ..new_group("two")
                },
            )
            .await
            .unwrap();
        assert_eq!(
            store.categories().await,
            vec!["books".to_string(), "tech".to_string()]
        );
    }

    #[tokio::test]
    async fn test_group_reply_notifies_original_sender() {
        let dir = TempDir::new().unwrap();
        let users = users_file(&dir);
        let notifications = Arc::new(NotificationStore::new(
            dir.path().join("notifications.json"),
        ));
        let store = GroupStore::new(dir.path(), users, notifications.clone());

        let group = store.create("mia", new_group("replies")).await.unwrap();
        store.add_member(group.id, "mia", "xavier").await.unwrap();
        store.send(group.id, "mia", "question", None).await.unwrap();
        store
            .send(group.id, "xavier", "answer", Some(1))
            .await
            .unwrap();

        let all = notifications.list().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].kind, "group_reply");
        assert_eq!(all[0].target_user, "mia");
        assert_eq!(all[0].group_name.as_deref(), Some("replies"));
    }
}
