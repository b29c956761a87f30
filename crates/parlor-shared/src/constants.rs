/// Maximum message length in characters (longer input is truncated)
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Maximum username length in characters
pub const MAX_USERNAME_CHARS: usize = 50;

/// Maximum group name length in characters
pub const MAX_GROUP_NAME_CHARS: usize = 50;

/// Maximum group description length in characters
pub const MAX_GROUP_DESCRIPTION_CHARS: usize = 200;

/// Last-message preview length in characters (before the "..." marker)
pub const PREVIEW_CHARS: usize = 50;

/// Message sends admitted per minute window
pub const MAX_MESSAGES_PER_MINUTE: u32 = 30;

/// Message sends admitted per hour window
pub const MAX_MESSAGES_PER_HOUR: u32 = 500;

/// Minute rate-limit window in seconds
pub const RATE_LIMIT_WINDOW_MINUTE_SECS: u64 = 60;

/// Hour rate-limit window in seconds
pub const RATE_LIMIT_WINDOW_HOUR_SECS: u64 = 3600;

/// Access tokens are rejected once older than this
pub const TOKEN_MAX_AGE_SECS: i64 = 24 * 3600;

/// Avatar shown for users the identity store does not know
pub const DEFAULT_AVATAR: &str = "avatar-1.jpg";

/// Default group avatar image
pub const DEFAULT_GROUP_AVATAR: &str = "group-1.jpg";

/// Default group cover image
pub const DEFAULT_GROUP_COVER: &str = "group-cover-1.jpg";
