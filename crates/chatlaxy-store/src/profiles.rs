use chatlaxy_shared::constants::USERS_COLLECTION;
use chatlaxy_shared::{Presence, ProfileId};

use crate::backend::{DocFeed, QueryFeed};
use crate::document::{Document, Field};
use crate::error::Result;
use crate::models::{NewProfile, Profile, ProfileUpdate};
use crate::query::{Direction, Query};
use crate::store::ChatStore;

impl ChatStore {
    /// Writes the seed document for a fresh profile.
    ///
    /// The write marks the user online and stamps `lastSeen` with the
    /// server clock, so the new profile enters the roster immediately.
    pub async fn create_profile(&self, profile: &NewProfile) -> Result<()> {
        tracing::info!(id = %profile.id, rank = %profile.rank, "creating profile document");
        self.backend()
            .set(
                USERS_COLLECTION,
                profile.id.as_str(),
                seed_document(profile),
            )
            .await
    }

    /// Reads and decodes one profile. `Ok(None)` when it does not exist.
    pub async fn get_profile(&self, id: &ProfileId) -> Result<Option<Profile>> {
        match self.backend().get(USERS_COLLECTION, id.as_str()).await? {
            Some(doc) => Ok(Some(Profile::from_document(id.as_str(), &doc)?)),
            None => Ok(None),
        }
    }

    /// Merges `{status: online, lastSeen: <server clock>}` into the profile.
    ///
    /// This is the heartbeat write. It fails with `NotFound` when the
    /// profile document is missing; a heartbeat never creates one.
    pub async fn touch_presence(&self, id: &ProfileId) -> Result<()> {
        self.backend()
            .merge(USERS_COLLECTION, id.as_str(), presence_patch())
            .await
    }

    /// Merges the fields named by `update` into the profile. Fields the
    /// update leaves as `None` survive untouched.
    pub async fn update_profile(&self, id: &ProfileId, update: &ProfileUpdate) -> Result<()> {
        tracing::debug!(id = %id, "merging profile update");
        self.backend()
            .merge(USERS_COLLECTION, id.as_str(), update_patch(update))
            .await
    }

    /// Watches one profile document.
    pub fn watch_profile(&self, id: &ProfileId) -> DocFeed {
        self.backend().subscribe_doc(USERS_COLLECTION, id.as_str())
    }

    /// Watches the `limit` most recently active profiles, newest first.
    pub fn watch_roster(&self, limit: usize) -> QueryFeed {
        self.backend().subscribe_query(Query::new(
            USERS_COLLECTION,
            "lastSeen",
            Direction::Descending,
            limit,
        ))
    }
}

fn seed_document(profile: &NewProfile) -> Document {
    Document::new()
        .with("uid", Field::text(profile.id.as_str()))
        .with("username", Field::text(&profile.display_name))
        .with("email", Field::text(&profile.email))
        .with("photoURL", Field::text(&profile.avatar_ref))
        .with("bannerURL", Field::text(&profile.banner_ref))
        .with("bio", Field::text(&profile.bio))
        .with("rank", Field::text(profile.rank.as_str()))
        .with("status", Field::text(Presence::Online.as_str()))
        .with("lastSeen", Field::ServerTime)
}

fn presence_patch() -> Document {
    Document::new()
        .with("status", Field::text(Presence::Online.as_str()))
        .with("lastSeen", Field::ServerTime)
}

fn update_patch(update: &ProfileUpdate) -> Document {
    let mut patch = Document::new();
    if let Some(name) = &update.display_name {
        patch.insert("username", Field::text(name));
    }
    if let Some(avatar) = &update.avatar_ref {
        patch.insert("photoURL", Field::text(avatar));
    }
    if let Some(banner) = &update.banner_ref {
        patch.insert("bannerURL", Field::text(banner));
    }
    if let Some(bio) = &update.bio {
        patch.insert("bio", Field::text(bio));
    }
    patch
}
