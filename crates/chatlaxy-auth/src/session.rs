//! Session data carried between the identity service and the client.

use serde::{Deserialize, Serialize};

use chatlaxy_shared::ProfileId;

/// A live authenticated identity.
///
/// Carries only what the identity service knows; the full profile lives in
/// the document store under the same id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Identity id, stable for the lifetime of the account.
    pub id: ProfileId,
    /// Email the account was registered with.
    pub email: String,
    /// Identity-level display name, kept in line with the profile document
    /// by the client.
    pub display_name: String,
    /// Identity-level avatar reference, `None` until first mirrored.
    pub avatar_ref: Option<String>,
}

/// Input to account creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// Partial edit of the display fields the identity service carries.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayAttributes {
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
}

/// A transition on the session stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionChange {
    SignedIn(Session),
    SignedOut,
}
