//! Live synchronization of the signed-in user's profile.
//!
//! [`ProfileSync`] owns the cached copy of the user's own profile document
//! and the presence heartbeat. The cache is replaced wholesale on every
//! snapshot; nothing merges on the read side. The heartbeat write is the
//! only liveness signal the protocol has, so readers derive presence from
//! its recency instead of any stored flag.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use chatlaxy_auth::Session;
use chatlaxy_store::{ChatStore, DocFeed, DocSnapshot, NewProfile, Profile};

/// Event surfaced to the session loop.
#[derive(Debug)]
pub enum ProfileEvent {
    /// The watched profile document changed, or was reported missing.
    Snapshot(DocSnapshot),
    /// A recurring presence touch is due.
    HeartbeatDue,
}

/// The profile watcher and heartbeat for the current session.
pub struct ProfileSync {
    store: ChatStore,
    heartbeat_interval: Duration,
    active: Option<ActiveSync>,
}

struct ActiveSync {
    session: Session,
    feed: DocFeed,
    heartbeat: Interval,
    cached: Option<Profile>,
    /// Guards the signup-gap repair, attempted at most once per session.
    reconciled: bool,
    feed_open: bool,
}

impl ProfileSync {
    pub fn new(store: ChatStore, heartbeat_interval: Duration) -> Self {
        Self {
            store,
            heartbeat_interval,
            active: None,
        }
    }

    /// Opens the profile subscription and starts heartbeating.
    ///
    /// One presence touch is issued right away; the recurring schedule
    /// begins a full interval later, so the first tick is not a duplicate.
    /// Starting over a running sync replaces it.
    pub async fn start(&mut self, session: Session) {
        self.stop();

        let feed = self.store.watch_profile(&session.id);

        if let Err(e) = self.store.touch_presence(&session.id).await {
            // Expected for a profile-less account; the gap is repaired when
            // the watcher reports the document missing.
            warn!(id = %session.id, error = %e, "initial presence touch failed");
        }

        let mut heartbeat = interval_at(
            Instant::now() + self.heartbeat_interval,
            self.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(id = %session.id, "profile sync started");
        self.active = Some(ActiveSync {
            session,
            feed,
            heartbeat,
            cached: None,
            reconciled: false,
            feed_open: true,
        });
    }

    /// Cancels the subscription and the heartbeat. Safe to call repeatedly
    /// or before the first start.
    pub fn stop(&mut self) {
        if self.active.take().is_some() {
            info!("profile sync stopped");
        }
    }

    /// The cached profile, once a snapshot has delivered one.
    pub fn profile(&self) -> Option<&Profile> {
        self.active.as_ref().and_then(|active| active.cached.as_ref())
    }

    /// Waits for the next profile event. Pends forever while stopped, so
    /// the caller can keep this in a select arm unconditionally.
    pub async fn next_event(&mut self) -> ProfileEvent {
        let Some(active) = self.active.as_mut() else {
            return futures::future::pending().await;
        };
        loop {
            tokio::select! {
                snapshot = active.feed.next(), if active.feed_open => match snapshot {
                    Some(snapshot) => return ProfileEvent::Snapshot(snapshot),
                    // A closed feed parks this arm; the heartbeat keeps going.
                    None => active.feed_open = false,
                },
                _ = active.heartbeat.tick() => return ProfileEvent::HeartbeatDue,
            }
        }
    }

    /// Folds a snapshot into the cache.
    ///
    /// A present document replaces the cache outright; a malformed one is
    /// logged and skipped, keeping the previous copy. A missing document
    /// triggers the signup-gap repair: the profile is recreated from the
    /// session's display attributes, with the signup rank rule applied
    /// again.
    pub async fn apply_snapshot(&mut self, snapshot: DocSnapshot) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        match snapshot.doc {
            Some(doc) => match Profile::from_document(&snapshot.id, &doc) {
                Ok(profile) => {
                    debug!(id = %profile.id, "profile snapshot applied");
                    active.cached = Some(profile);
                }
                Err(e) => {
                    warn!(id = %snapshot.id, error = %e, "skipping malformed profile snapshot");
                }
            },
            None => {
                if active.reconciled {
                    return;
                }
                active.reconciled = true;

                let session = &active.session;
                info!(id = %session.id, "profile document missing, recreating from session attributes");
                let mut profile =
                    NewProfile::signup(session.id.clone(), &session.display_name, &session.email);
                if let Some(avatar) = &session.avatar_ref {
                    profile.avatar_ref = avatar.clone();
                }
                if let Err(e) = self.store.create_profile(&profile).await {
                    warn!(id = %profile.id, error = %e, "profile repair failed");
                }
            }
        }
    }

    /// Issues one presence touch. A failed write is logged and the
    /// schedule continues; one missed beat only ages the profile by a
    /// fraction of the staleness threshold.
    pub async fn beat(&self) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        match self.store.touch_presence(&active.session.id).await {
            Ok(()) => debug!(id = %active.session.id, "heartbeat"),
            Err(e) => warn!(id = %active.session.id, error = %e, "heartbeat write failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatlaxy_shared::{ProfileId, Rank};

    fn session(id: &str, name: &str) -> Session {
        Session {
            id: ProfileId::from(id),
            email: format!("{name}@example.com"),
            display_name: name.to_string(),
            avatar_ref: None,
        }
    }

    async fn seeded_store(id: &str, name: &str) -> ChatStore {
        let store = ChatStore::in_memory();
        let profile = NewProfile::signup(ProfileId::from(id), name, &format!("{name}@example.com"));
        store.create_profile(&profile).await.unwrap();
        store
    }

    async fn next_snapshot(sync: &mut ProfileSync) -> DocSnapshot {
        match sync.next_event().await {
            ProfileEvent::Snapshot(snapshot) => snapshot,
            other => panic!("expected a snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_start_touches_presence_immediately() {
        let store = seeded_store("u1", "alice").await;
        let before = store
            .get_profile(&ProfileId::from("u1"))
            .await
            .unwrap()
            .unwrap();

        let mut sync = ProfileSync::new(store.clone(), Duration::from_secs(60));
        sync.start(session("u1", "alice")).await;

        let after = store
            .get_profile(&ProfileId::from("u1"))
            .await
            .unwrap()
            .unwrap();
        assert!(after.last_active_at > before.last_active_at);
    }

    #[tokio::test]
    async fn test_snapshots_replace_the_cache() {
        let store = seeded_store("u1", "alice").await;
        let mut sync = ProfileSync::new(store.clone(), Duration::from_secs(60));
        sync.start(session("u1", "alice")).await;

        // Subscription attach and the startup touch queue one snapshot each.
        let snapshot = next_snapshot(&mut sync).await;
        sync.apply_snapshot(snapshot).await;
        assert_eq!(sync.profile().unwrap().display_name, "alice");

        let update = chatlaxy_store::ProfileUpdate {
            bio: Some("been here a while".to_string()),
            ..Default::default()
        };
        store
            .update_profile(&ProfileId::from("u1"), &update)
            .await
            .unwrap();

        for _ in 0..2 {
            let snapshot = next_snapshot(&mut sync).await;
            sync.apply_snapshot(snapshot).await;
        }
        let profile = sync.profile().unwrap();
        assert_eq!(profile.bio, "been here a while");
        assert_eq!(profile.display_name, "alice");
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_fires_on_schedule() {
        let store = seeded_store("u1", "alice").await;
        let mut sync = ProfileSync::new(store.clone(), Duration::from_secs(60));
        sync.start(session("u1", "alice")).await;

        for _ in 0..2 {
            let snapshot = next_snapshot(&mut sync).await;
            sync.apply_snapshot(snapshot).await;
        }
        let before = sync.profile().unwrap().last_active_at;

        // Nothing is queued, so the paused clock advances to the first beat.
        match sync.next_event().await {
            ProfileEvent::HeartbeatDue => sync.beat().await,
            other => panic!("expected a heartbeat, got {other:?}"),
        }

        let snapshot = next_snapshot(&mut sync).await;
        sync.apply_snapshot(snapshot).await;
        assert!(sync.profile().unwrap().last_active_at > before);
    }

    #[tokio::test]
    async fn test_missing_document_is_repaired_from_session() {
        let store = ChatStore::in_memory();
        let mut sync = ProfileSync::new(store.clone(), Duration::from_secs(60));
        let mut dev = session("u1", "Developer");
        dev.avatar_ref = Some("https://img/custom.png".to_string());

        // The startup touch fails quietly; no document exists yet.
        sync.start(dev).await;

        let missing = next_snapshot(&mut sync).await;
        assert!(!missing.exists());
        sync.apply_snapshot(missing).await;

        // The repair write comes back through the subscription.
        let repaired = next_snapshot(&mut sync).await;
        assert!(repaired.exists());
        sync.apply_snapshot(repaired).await;

        let profile = sync.profile().unwrap();
        assert_eq!(profile.display_name, "Developer");
        assert_eq!(profile.rank, Rank::Developer);
        assert_eq!(profile.avatar_ref, "https://img/custom.png");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_sync_pends() {
        let store = ChatStore::in_memory();
        let mut sync = ProfileSync::new(store, Duration::from_secs(60));
        sync.stop();
        sync.stop();
        assert!(sync.profile().is_none());

        let waited =
            tokio::time::timeout(Duration::from_millis(50), sync.next_event()).await;
        assert!(waited.is_err());
    }
}
