//! Domain model structs stored in the remote document database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a presentation layer. Field names on the wire follow the
//! collection schema (`username`, `photoURL`, `lastSeen`, ...), which the
//! decoders here translate into the struct shapes the rest of the client
//! works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chatlaxy_shared::constants::{DEFAULT_AVATAR_URL, DEFAULT_BANNER_URL, NEW_USER_BIO};
use chatlaxy_shared::{MessageId, Presence, ProfileId, Rank};

use crate::document::Document;
use crate::error::{Result, StoreError};

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A user's profile document, one per identity in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Identity id; doubles as the document id.
    pub id: ProfileId,
    /// Display name shown in chat and on the roster.
    pub display_name: String,
    /// Email the account was registered with.
    pub email: String,
    /// Avatar image reference.
    pub avatar_ref: String,
    /// Profile banner image reference.
    pub banner_ref: String,
    /// Free-form self description.
    pub bio: String,
    /// Assigned once at signup; nothing in this client revises it.
    pub rank: Rank,
    /// Status the document carries. Readers derive presence from
    /// [`last_active_at`](Self::last_active_at) instead of trusting it.
    pub status: Presence,
    /// Server-assigned timestamp of the most recent presence touch.
    pub last_active_at: DateTime<Utc>,
}

impl Profile {
    /// Decodes a stored profile document.
    ///
    /// `username`, `rank` and `lastSeen` are required; the display fields
    /// fall back to their defaults when absent or empty, matching documents
    /// written before a user customised anything.
    pub fn from_document(id: &str, doc: &Document) -> Result<Self> {
        let rank = Rank::from_str(doc.text("rank")?).ok_or(StoreError::Malformed {
            field: "rank",
            expected: "known rank",
        })?;
        let status = doc
            .text_opt("status")
            .and_then(Presence::from_str)
            .unwrap_or(Presence::Offline);

        Ok(Self {
            id: ProfileId::from(id),
            display_name: doc.text("username")?.to_string(),
            email: doc.text_opt("email").unwrap_or_default().to_string(),
            avatar_ref: text_or(doc, "photoURL", DEFAULT_AVATAR_URL),
            banner_ref: text_or(doc, "bannerURL", DEFAULT_BANNER_URL),
            bio: doc.text_opt("bio").unwrap_or_default().to_string(),
            rank,
            status,
            last_active_at: doc.timestamp("lastSeen")?,
        })
    }

    /// Author fields copied onto an outgoing message.
    pub fn author_snapshot(&self) -> AuthorSnapshot {
        AuthorSnapshot {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            avatar_ref: self.avatar_ref.clone(),
            rank: self.rank,
        }
    }
}

/// Seed data for a profile document that does not exist yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewProfile {
    pub id: ProfileId,
    pub display_name: String,
    pub email: String,
    pub avatar_ref: String,
    pub banner_ref: String,
    pub bio: String,
    pub rank: Rank,
}

impl NewProfile {
    /// The document a fresh signup starts with: default art, the welcome
    /// bio, and the rank the display name earns.
    pub fn signup(id: ProfileId, display_name: &str, email: &str) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            email: email.to_string(),
            avatar_ref: DEFAULT_AVATAR_URL.to_string(),
            banner_ref: DEFAULT_BANNER_URL.to_string(),
            bio: NEW_USER_BIO.to_string(),
            rank: Rank::for_signup(display_name),
        }
    }
}

/// Partial edit of the profile fields a user may change.
///
/// `None` fields are left untouched by the write; the update is applied as
/// a merge, never a replace.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
    pub banner_ref: Option<String>,
    pub bio: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.avatar_ref.is_none()
            && self.banner_ref.is_none()
            && self.bio.is_none()
    }

    /// Whether the update names a field the identity service also carries
    /// and should therefore be mirrored onto the session record.
    pub fn touches_display_attributes(&self) -> bool {
        self.display_name.is_some() || self.avatar_ref.is_some()
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message with its denormalized author fields.
///
/// Author name, avatar and rank are copied from the sender's profile at
/// send time and never revised afterwards, so old messages render the
/// author as they were when they spoke.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Backend-assigned document id.
    pub id: MessageId,
    /// Message body, stored exactly as typed.
    pub body: String,
    /// Identity id of the sender.
    pub author_id: ProfileId,
    /// Sender's display name at send time.
    pub author_name: String,
    /// Sender's avatar reference at send time.
    pub author_avatar_ref: String,
    /// Sender's rank at send time.
    pub author_rank: Rank,
    /// Server-assigned send timestamp.
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Decodes a stored message document.
    pub fn from_document(id: &str, doc: &Document) -> Result<Self> {
        let author_rank = Rank::from_str(doc.text("rank")?).ok_or(StoreError::Malformed {
            field: "rank",
            expected: "known rank",
        })?;

        Ok(Self {
            id: MessageId(id.to_string()),
            body: doc.text("text")?.to_string(),
            author_id: ProfileId::from(doc.text("uid")?),
            author_name: doc.text("username")?.to_string(),
            author_avatar_ref: text_or(doc, "photoURL", DEFAULT_AVATAR_URL),
            author_rank,
            sent_at: doc.timestamp("createdAt")?,
        })
    }

    /// The denormalized author fields this message carries.
    pub fn author_snapshot(&self) -> AuthorSnapshot {
        AuthorSnapshot {
            id: self.author_id.clone(),
            display_name: self.author_name.clone(),
            avatar_ref: self.author_avatar_ref.clone(),
            rank: self.author_rank,
        }
    }
}

// ---------------------------------------------------------------------------
// AuthorSnapshot
// ---------------------------------------------------------------------------

/// The sender fields stamped onto a message at send time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorSnapshot {
    pub id: ProfileId,
    pub display_name: String,
    pub avatar_ref: String,
    pub rank: Rank,
}

/// Text field with a fallback for both the absent and the empty case, the
/// two shapes "no value" takes in stored documents.
fn text_or(doc: &Document, name: &str, default: &str) -> String {
    doc.text_opt(name)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}
