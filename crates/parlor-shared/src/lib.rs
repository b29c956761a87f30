//! # parlor-shared
//!
//! Leaf crate shared by the Parlor store and server: input sanitization,
//! username validation, signed access tokens, and the limits both sides
//! have to agree on.

pub mod constants;
pub mod sanitize;
pub mod token;

pub use sanitize::{sanitize_text, validate_username};
pub use token::{ConversationClaim, TokenError, TokenIssuer, UsernameClaim};
