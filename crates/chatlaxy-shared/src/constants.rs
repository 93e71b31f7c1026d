//! Protocol constants shared across the workspace.
//!
//! The presence threshold is deliberately five time units longer than the
//! heartbeat period so a handful of missed ticks does not flap a user
//! between online and offline.

use std::time::Duration;

/// Collection holding one profile document per identity.
pub const USERS_COLLECTION: &str = "users";

/// Collection holding the global channel's messages.
pub const MESSAGES_COLLECTION: &str = "messages";

/// Interval between presence-touch writes while a session is live.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// A profile whose last heartbeat is older than this is shown offline.
pub const PRESENCE_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// How often the roster re-derives presence from the wall clock between
/// snapshots.
pub const PRESENCE_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// How long the session waits for the first profile snapshot before leaving
/// the loading state anyway.
pub const PROFILE_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Size of the visible message window (most recent N, ascending for display).
pub const MESSAGE_WINDOW: usize = 50;

/// Size of the roster window (most recently active K profiles).
pub const ROSTER_WINDOW: usize = 20;

/// Minimum display-name length accepted at signup.
pub const MIN_DISPLAY_NAME_LEN: usize = 3;

/// Signing up with exactly this display name grants the Developer rank.
pub const RESERVED_DEVELOPER_NAME: &str = "Developer";

/// Avatar shown until a user picks their own.
pub const DEFAULT_AVATAR_URL: &str = "https://cdn-icons-png.flaticon.com/512/149/149071.png";

/// Profile banner shown until a user picks their own.
pub const DEFAULT_BANNER_URL: &str =
    "https://images.unsplash.com/photo-1534796636912-3b95b3ab5986?w=1000&auto=format&fit=crop&q=60";

/// Bio a freshly created profile starts with.
pub const NEW_USER_BIO: &str = "New to ChatLaxy!";

/// Bio shown when inspecting an author who is outside the roster window.
pub const OFFLINE_BIO_PLACEHOLDER: &str = "Offline or not recently active.";
