//! Client tuning knobs.

use std::time::Duration;

use chatlaxy_shared::constants::{
    HEARTBEAT_INTERVAL, MESSAGE_WINDOW, PRESENCE_REFRESH_INTERVAL, PRESENCE_STALE_AFTER,
    PROFILE_LOAD_TIMEOUT, ROSTER_WINDOW,
};

/// Configuration for spawning a chat session.
///
/// Every knob defaults to the protocol constant; tests shrink the windows
/// and rely on a paused clock for the timings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between presence-touch writes while signed in.
    pub heartbeat_interval: Duration,
    /// Age beyond which a profile's last heartbeat classifies it offline.
    pub presence_stale_after: Duration,
    /// How often the roster re-derives presence between snapshots.
    pub presence_refresh_interval: Duration,
    /// How long to wait for the first profile snapshot before entering the
    /// session without one.
    pub profile_load_timeout: Duration,
    /// Number of most recent messages kept in the feed.
    pub message_window: usize,
    /// Number of most recently active profiles kept on the roster.
    pub roster_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: HEARTBEAT_INTERVAL,
            presence_stale_after: PRESENCE_STALE_AFTER,
            presence_refresh_interval: PRESENCE_REFRESH_INTERVAL,
            profile_load_timeout: PROFILE_LOAD_TIMEOUT,
            message_window: MESSAGE_WINDOW,
            roster_window: ROSTER_WINDOW,
        }
    }
}
