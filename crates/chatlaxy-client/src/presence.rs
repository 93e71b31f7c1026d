//! Roster of recently active profiles with derived presence.
//!
//! The `status` field stored on profile documents is written on a best
//! effort basis and a dead session never corrects it, so it is not trusted
//! here. Presence is derived at read time from the age of the last
//! heartbeat; a wall-clock refresh tick re-derives it between snapshots so
//! entries can go stale without any write arriving.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use chatlaxy_shared::{Presence, ProfileId};
use chatlaxy_store::{ChatStore, Profile, QueryFeed, QuerySnapshot};

use crate::view::RosterEntry;

/// Classifies a profile by heartbeat age: online while the last touch is
/// younger than `stale_after`, offline from the threshold on.
///
/// A heartbeat in the future (clock skew between writers) counts as online.
pub fn classify_presence(
    now: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
    stale_after: Duration,
) -> Presence {
    let age = now.signed_duration_since(last_active_at);
    if age.num_milliseconds() < stale_after.as_millis() as i64 {
        Presence::Online
    } else {
        Presence::Offline
    }
}

/// Event surfaced to the session loop.
#[derive(Debug)]
pub enum RosterEvent {
    /// The roster window changed.
    Snapshot(QuerySnapshot),
    /// Wall-clock re-derivation is due.
    RefreshDue,
}

/// The roster watcher for the current session.
pub struct PresenceTracker {
    store: ChatStore,
    stale_after: Duration,
    refresh_interval: Duration,
    window: usize,
    active: Option<ActiveRoster>,
}

struct ActiveRoster {
    feed: QueryFeed,
    refresh: Interval,
    profiles: Vec<Profile>,
    feed_open: bool,
}

impl PresenceTracker {
    pub fn new(
        store: ChatStore,
        stale_after: Duration,
        refresh_interval: Duration,
        window: usize,
    ) -> Self {
        Self {
            store,
            stale_after,
            refresh_interval,
            window,
            active: None,
        }
    }

    /// Opens the roster subscription and starts the refresh schedule.
    /// Starting over a running tracker replaces it.
    pub fn start(&mut self) {
        self.stop();

        let feed = self.store.watch_roster(self.window);
        let mut refresh = interval_at(
            Instant::now() + self.refresh_interval,
            self.refresh_interval,
        );
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(window = self.window, "presence tracking started");
        self.active = Some(ActiveRoster {
            feed,
            refresh,
            profiles: Vec::new(),
            feed_open: true,
        });
    }

    /// Cancels the subscription and the refresh schedule. Safe to call
    /// repeatedly or before the first start.
    pub fn stop(&mut self) {
        if self.active.take().is_some() {
            info!("presence tracking stopped");
        }
    }

    /// Waits for the next roster event. Pends forever while stopped.
    pub async fn next_event(&mut self) -> RosterEvent {
        let Some(active) = self.active.as_mut() else {
            return futures::future::pending().await;
        };
        loop {
            tokio::select! {
                snapshot = active.feed.next(), if active.feed_open => match snapshot {
                    Some(snapshot) => return RosterEvent::Snapshot(snapshot),
                    None => active.feed_open = false,
                },
                _ = active.refresh.tick() => return RosterEvent::RefreshDue,
            }
        }
    }

    /// Replaces the tracked window with a fresh snapshot. Documents that
    /// fail to decode are logged and skipped.
    pub fn apply_snapshot(&mut self, snapshot: QuerySnapshot) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let mut profiles = Vec::with_capacity(snapshot.len());
        for (id, doc) in &snapshot.docs {
            match Profile::from_document(id, doc) {
                Ok(profile) => profiles.push(profile),
                Err(e) => warn!(id = %id, error = %e, "skipping malformed roster document"),
            }
        }
        debug!(count = profiles.len(), "roster snapshot applied");
        active.profiles = profiles;
    }

    /// The roster with presence derived at `now`, in recency order.
    pub fn entries(&self, now: DateTime<Utc>) -> Vec<RosterEntry> {
        let Some(active) = self.active.as_ref() else {
            return Vec::new();
        };
        active
            .profiles
            .iter()
            .map(|profile| RosterEntry {
                presence: classify_presence(now, profile.last_active_at, self.stale_after),
                profile: profile.clone(),
            })
            .collect()
    }

    /// Live roster entry for one profile, if it is inside the window.
    pub fn find(&self, id: &ProfileId, now: DateTime<Utc>) -> Option<RosterEntry> {
        let active = self.active.as_ref()?;
        active
            .profiles
            .iter()
            .find(|profile| &profile.id == id)
            .map(|profile| RosterEntry {
                presence: classify_presence(now, profile.last_active_at, self.stale_after),
                profile: profile.clone(),
            })
    }
}
