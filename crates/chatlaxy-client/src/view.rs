//! Immutable view snapshots published to the presentation layer.
//!
//! The session loop rebuilds the whole [`ViewState`] from scratch after
//! every state change, so a consumer always observes a consistent whole
//! and never has to merge partial updates.

use serde::Serialize;

use chatlaxy_auth::Session;
use chatlaxy_shared::constants::{DEFAULT_BANNER_URL, OFFLINE_BIO_PLACEHOLDER};
use chatlaxy_shared::{Presence, ProfileId, Rank};
use chatlaxy_store::{AuthorSnapshot, Message, Profile};

/// Authentication phase of the client.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum SessionPhase {
    /// No signed-in session.
    Unauthenticated,
    /// Signed in, waiting for the first profile snapshot.
    Loading,
    /// Signed in with live subscriptions.
    Authenticated,
}

/// A message with its display-grouping flag.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FeedMessage {
    pub message: Message,
    /// Whether this message starts a run of same-author messages and
    /// therefore renders the author header.
    pub run_leader: bool,
}

/// A roster profile with the presence derived for it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RosterEntry {
    pub profile: Profile,
    /// Heartbeat-derived classification; the stored `status` field does
    /// not participate.
    pub presence: Presence,
}

/// What the user asked to inspect.
#[derive(Debug, Clone)]
pub enum InspectTarget {
    /// A profile by id, typically clicked on the roster.
    Member(ProfileId),
    /// A message author, carrying the denormalized fields the message
    /// already holds so the card can render even off-roster.
    Author(AuthorSnapshot),
}

/// Contents of the profile inspector.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProfileCard {
    pub id: ProfileId,
    pub display_name: String,
    pub email: String,
    pub avatar_ref: String,
    pub banner_ref: String,
    pub bio: String,
    pub rank: Rank,
    pub presence: Presence,
}

impl ProfileCard {
    /// Card for a live profile with a known derived presence.
    pub fn from_profile(profile: &Profile, presence: Presence) -> Self {
        Self {
            id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            email: profile.email.clone(),
            avatar_ref: profile.avatar_ref.clone(),
            banner_ref: profile.banner_ref.clone(),
            bio: profile.bio.clone(),
            rank: profile.rank,
            presence,
        }
    }

    /// Fallback card for an author who is outside the roster window.
    ///
    /// Built from the message's own author fields; everything the message
    /// does not carry falls back to placeholders and the author is shown
    /// offline. The card may be stale with respect to the live profile,
    /// which is the accepted price for rendering without an extra fetch.
    pub fn from_author(author: &AuthorSnapshot) -> Self {
        Self {
            id: author.id.clone(),
            display_name: author.display_name.clone(),
            email: String::new(),
            avatar_ref: author.avatar_ref.clone(),
            banner_ref: DEFAULT_BANNER_URL.to_string(),
            bio: OFFLINE_BIO_PLACEHOLDER.to_string(),
            rank: author.rank,
            presence: Presence::Offline,
        }
    }
}

/// Everything the presentation layer renders, as one immutable value.
#[derive(Debug, Clone, Serialize)]
pub struct ViewState {
    pub phase: SessionPhase,
    /// The signed-in session, `None` while unauthenticated.
    pub session: Option<Session>,
    /// The signed-in user's own profile, once the first snapshot landed.
    pub own_profile: Option<Profile>,
    /// Messages in display order (oldest first) with grouping applied.
    pub messages: Vec<FeedMessage>,
    /// Most recently active profiles, newest first.
    pub roster: Vec<RosterEntry>,
    /// The open profile inspector, if any.
    pub inspected: Option<ProfileCard>,
}

impl ViewState {
    /// State before the identity service has reported anything.
    pub fn initial() -> Self {
        Self {
            phase: SessionPhase::Loading,
            session: None,
            own_profile: None,
            messages: Vec::new(),
            roster: Vec::new(),
            inspected: None,
        }
    }

    /// Number of roster entries currently classified online.
    pub fn online_count(&self) -> usize {
        self.roster
            .iter()
            .filter(|entry| entry.presence.is_online())
            .count()
    }
}
