//! The chat session orchestrator.
//!
//! One event-loop task owns every piece of mutable client state. External
//! code drives it through typed commands with oneshot replies and reads it
//! through a watch channel of immutable [`ViewState`] snapshots, so no lock
//! is ever shared with a presentation layer.
//!
//! Authentication state comes exclusively from the identity backend's
//! session stream. A sign-out issued through a command still tears the
//! session down via that stream, the same path a service-side sign-out
//! takes, so there is exactly one teardown code path.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, Instant, Sleep};
use tracing::{debug, info, warn};

use chatlaxy_auth::{
    AuthError, DisplayAttributes, IdentityBackend, Session, SessionChange, SessionEvents,
};
use chatlaxy_shared::{InputError, MessageId, ProfileId};
use chatlaxy_store::{ChatStore, ProfileUpdate};

use crate::config::SessionConfig;
use crate::error::ChatError;
use crate::feed::{group_consecutive, MessageFeed};
use crate::identity::IdentityStore;
use crate::presence::{classify_presence, PresenceTracker, RosterEvent};
use crate::profile::{ProfileEvent, ProfileSync};
use crate::view::{InspectTarget, ProfileCard, SessionPhase, ViewState};

// ---------------------------------------------------------------------------
// Command / handle types
// ---------------------------------------------------------------------------

type Reply<T> = oneshot::Sender<Result<T, ChatError>>;

/// Commands sent into the session task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Create an account, seed its profile, and sign in.
    SignUp {
        email: String,
        password: String,
        display_name: String,
        reply: Reply<Session>,
    },
    /// Sign in with existing credentials.
    SignIn {
        email: String,
        password: String,
        reply: Reply<Session>,
    },
    /// End the current session.
    SignOut { reply: Reply<()> },
    /// Send a message to the channel as the signed-in user.
    SendMessage { body: String, reply: Reply<MessageId> },
    /// Merge an edit into the signed-in user's profile.
    UpdateProfile {
        update: ProfileUpdate,
        reply: Reply<()>,
    },
    /// Open the profile inspector on a target.
    Inspect(InspectTarget),
    /// Close the profile inspector.
    DismissInspector,
    /// Stop the event loop and cancel every subscription.
    Shutdown,
}

/// Cloneable handle for driving a session task.
#[derive(Clone)]
pub struct ChatHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl ChatHandle {
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, ChatError> {
        self.request(|reply| SessionCommand::SignUp {
            email: email.to_string(),
            password: password.to_string(),
            display_name: display_name.to_string(),
            reply,
        })
        .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ChatError> {
        self.request(|reply| SessionCommand::SignIn {
            email: email.to_string(),
            password: password.to_string(),
            reply,
        })
        .await
    }

    pub async fn sign_out(&self) -> Result<(), ChatError> {
        self.request(|reply| SessionCommand::SignOut { reply }).await
    }

    pub async fn send_message(&self, body: &str) -> Result<MessageId, ChatError> {
        self.request(|reply| SessionCommand::SendMessage {
            body: body.to_string(),
            reply,
        })
        .await
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<(), ChatError> {
        self.request(|reply| SessionCommand::UpdateProfile { update, reply })
            .await
    }

    pub async fn inspect(&self, target: InspectTarget) -> Result<(), ChatError> {
        self.dispatch(SessionCommand::Inspect(target)).await
    }

    pub async fn dismiss_inspector(&self) -> Result<(), ChatError> {
        self.dispatch(SessionCommand::DismissInspector).await
    }

    /// Stops the session task. Every subscription is cancelled; further
    /// commands fail with [`ChatError::SessionStopped`].
    pub async fn shutdown(&self) -> Result<(), ChatError> {
        self.dispatch(SessionCommand::Shutdown).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, ChatError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| ChatError::SessionStopped)?;
        response.await.map_err(|_| ChatError::SessionStopped)?
    }

    async fn dispatch(&self, command: SessionCommand) -> Result<(), ChatError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| ChatError::SessionStopped)
    }
}

// ---------------------------------------------------------------------------
// Spawning
// ---------------------------------------------------------------------------

/// Spawns the session event loop in a background tokio task.
///
/// Returns the command handle and the view-state watch channel. The task
/// runs until [`ChatHandle::shutdown`] is called or every handle is
/// dropped.
pub fn spawn_session(
    backend: Arc<dyn IdentityBackend>,
    store: ChatStore,
    config: SessionConfig,
) -> (ChatHandle, watch::Receiver<ViewState>) {
    let identity = IdentityStore::new(backend, store.clone());
    let sessions = identity.observe();

    let (tx, commands) = mpsc::channel(64);
    let (view_tx, view_rx) = watch::channel(ViewState::initial());

    let session_loop = SessionLoop {
        profile: ProfileSync::new(store.clone(), config.heartbeat_interval),
        roster: PresenceTracker::new(
            store.clone(),
            config.presence_stale_after,
            config.presence_refresh_interval,
            config.roster_window,
        ),
        feed: MessageFeed::new(store.clone(), config.message_window),
        identity,
        store,
        config,
        view_tx,
        phase: SessionPhase::Loading,
        session: None,
        inspected: None,
        load_deadline: Box::pin(sleep(Duration::ZERO)),
        deadline_armed: false,
    };
    tokio::spawn(session_loop.run(commands, sessions));

    (ChatHandle { tx }, view_rx)
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

struct SessionLoop {
    identity: IdentityStore,
    store: ChatStore,
    config: SessionConfig,
    profile: ProfileSync,
    roster: PresenceTracker,
    feed: MessageFeed,
    view_tx: watch::Sender<ViewState>,
    phase: SessionPhase,
    session: Option<Session>,
    inspected: Option<ProfileCard>,
    load_deadline: Pin<Box<Sleep>>,
    deadline_armed: bool,
}

impl SessionLoop {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>, mut sessions: SessionEvents) {
        info!("session loop started");

        loop {
            tokio::select! {
                // --- Incoming commands ---
                command = commands.recv() => {
                    match command {
                        Some(SessionCommand::SignUp { email, password, display_name, reply }) => {
                            let result = self.identity.sign_up(&email, &password, &display_name).await;
                            let _ = reply.send(result);
                        }
                        Some(SessionCommand::SignIn { email, password, reply }) => {
                            let _ = reply.send(self.identity.sign_in(&email, &password).await);
                        }
                        Some(SessionCommand::SignOut { reply }) => {
                            let _ = reply.send(self.identity.sign_out().await);
                        }
                        Some(SessionCommand::SendMessage { body, reply }) => {
                            let _ = reply.send(self.send_message(&body).await);
                        }
                        Some(SessionCommand::UpdateProfile { update, reply }) => {
                            let _ = reply.send(self.update_profile(update).await);
                        }
                        Some(SessionCommand::Inspect(target)) => {
                            self.inspect(target);
                        }
                        Some(SessionCommand::DismissInspector) => {
                            if self.inspected.take().is_some() {
                                self.publish();
                            }
                        }
                        Some(SessionCommand::Shutdown) => {
                            info!("session shutdown requested");
                            break;
                        }
                        None => {
                            info!("command channel closed, shutting down");
                            break;
                        }
                    }
                }

                // --- Session transitions ---
                change = sessions.next() => {
                    match change {
                        Some(change) => self.handle_session_change(change).await,
                        None => {
                            warn!("session stream ended, shutting down");
                            break;
                        }
                    }
                }

                // --- Component events ---
                event = self.profile.next_event() => {
                    self.handle_profile_event(event).await;
                }
                event = self.roster.next_event() => {
                    self.handle_roster_event(event);
                }
                snapshot = self.feed.next_snapshot() => {
                    self.feed.apply_snapshot(snapshot);
                    self.publish();
                }

                // --- First-snapshot deadline ---
                _ = self.load_deadline.as_mut(), if self.deadline_armed => {
                    self.deadline_armed = false;
                    if self.phase == SessionPhase::Loading {
                        warn!("profile load timed out, entering the session without a snapshot");
                        self.phase = SessionPhase::Authenticated;
                        self.publish();
                    }
                }
            }
        }

        // Cancel the subscriptions before the task ends so late snapshots
        // have nowhere to land.
        self.stop_components();
        info!("session loop terminated");
    }

    async fn handle_session_change(&mut self, change: SessionChange) {
        match change {
            SessionChange::SignedIn(session) => {
                info!(id = %session.id, "session signed in");
                // A new session replaces any running one outright.
                self.stop_components();
                self.inspected = None;
                self.session = Some(session.clone());
                self.phase = SessionPhase::Loading;
                self.load_deadline
                    .as_mut()
                    .reset(Instant::now() + self.config.profile_load_timeout);
                self.deadline_armed = true;

                self.profile.start(session).await;
                self.roster.start();
                self.feed.start();
                self.publish();
            }
            SessionChange::SignedOut => {
                info!("session signed out");
                // Subscriptions are cancelled before the state is cleared so
                // a late snapshot cannot repopulate a dead session.
                self.stop_components();
                self.session = None;
                self.inspected = None;
                self.deadline_armed = false;
                self.phase = SessionPhase::Unauthenticated;
                self.publish();
            }
        }
    }

    async fn handle_profile_event(&mut self, event: ProfileEvent) {
        match event {
            ProfileEvent::Snapshot(snapshot) => {
                self.profile.apply_snapshot(snapshot).await;
                // The first snapshot of a session resolves the loading
                // phase whether or not the document existed.
                if self.phase == SessionPhase::Loading {
                    self.phase = SessionPhase::Authenticated;
                    self.deadline_armed = false;
                }
                self.publish();
            }
            ProfileEvent::HeartbeatDue => self.profile.beat().await,
        }
    }

    fn handle_roster_event(&mut self, event: RosterEvent) {
        if let RosterEvent::Snapshot(snapshot) = event {
            self.roster.apply_snapshot(snapshot);
        }
        // Publishing on the refresh tick as well re-derives presence from
        // the wall clock, so entries can go offline without any write.
        self.publish();
    }

    async fn send_message(&self, body: &str) -> Result<MessageId, ChatError> {
        match self.profile.profile() {
            Some(sender) => self.feed.send(sender, body).await,
            None => Err(AuthError::NotAuthenticated.into()),
        }
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<(), ChatError> {
        if update.is_empty() {
            return Err(InputError::EmptyProfileUpdate.into());
        }
        let Some(session) = self.session.as_ref() else {
            return Err(AuthError::NotAuthenticated.into());
        };
        self.store.update_profile(&session.id, &update).await?;

        if update.touches_display_attributes() {
            let attrs = DisplayAttributes {
                display_name: update.display_name.clone(),
                avatar_ref: update.avatar_ref.clone(),
            };
            // The profile document is the render source of truth; a failed
            // mirror is tolerated rather than rolled back.
            if let Err(e) = self.identity.update_display_attributes(attrs).await {
                warn!(error = %e, "display-attribute mirror failed");
            }
        }
        Ok(())
    }

    fn inspect(&mut self, target: InspectTarget) {
        let now = Utc::now();
        let card = match target {
            InspectTarget::Member(id) => self.member_card(&id, now),
            InspectTarget::Author(author) => Some(
                self.roster
                    .find(&author.id, now)
                    .map(|entry| ProfileCard::from_profile(&entry.profile, entry.presence))
                    .unwrap_or_else(|| ProfileCard::from_author(&author)),
            ),
        };
        match card {
            Some(card) => {
                debug!(id = %card.id, "inspector opened");
                self.inspected = Some(card);
                self.publish();
            }
            None => debug!("inspect target not available, inspector unchanged"),
        }
    }

    fn member_card(&self, id: &ProfileId, now: DateTime<Utc>) -> Option<ProfileCard> {
        if let Some(entry) = self.roster.find(id, now) {
            return Some(ProfileCard::from_profile(&entry.profile, entry.presence));
        }
        // The signed-in user can fall off the roster window; their own
        // cached profile still renders.
        self.profile.profile().filter(|own| &own.id == id).map(|own| {
            ProfileCard::from_profile(
                own,
                classify_presence(now, own.last_active_at, self.config.presence_stale_after),
            )
        })
    }

    /// Rebuilds the published snapshot from scratch.
    fn publish(&self) {
        let now = Utc::now();
        let view = ViewState {
            phase: self.phase,
            session: self.session.clone(),
            own_profile: self.profile.profile().cloned(),
            messages: group_consecutive(self.feed.messages()),
            roster: self.roster.entries(now),
            inspected: self.inspected.clone(),
        };
        self.view_tx.send_replace(view);
    }

    fn stop_components(&mut self) {
        self.profile.stop();
        self.roster.stop();
        self.feed.stop();
    }
}
