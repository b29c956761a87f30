//! # parlor-store
//!
//! Flat-file persistence and the conversation/group service for Parlor.
//!
//! Each collection (conversations, groups) lives in one JSON document that
//! is loaded whole, mutated in memory and rewritten whole. Every
//! load-mutate-save sequence holds the collection's writer lock, so
//! concurrent sends to different threads in the same collection can no
//! longer overwrite each other's appends.

pub mod collection;
pub mod conversations;
pub mod groups;
pub mod models;
pub mod notifications;
pub mod thread;
pub mod users;

mod error;

pub use conversations::ConversationStore;
pub use error::{Result, StoreError};
pub use groups::GroupStore;
pub use models::*;
pub use notifications::{NotificationStore, ReplyContext};
pub use users::UserDirectory;
