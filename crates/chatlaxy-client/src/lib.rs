//! Session orchestration for the ChatLaxy client.
//!
//! The crate wires an identity backend and a document store into one
//! background task that owns all client state: the signed-in session, the
//! user's own profile, the live message window, and the member roster with
//! derived presence. A frontend spawns the task with [`spawn_session`],
//! drives it through the cloneable [`ChatHandle`], and renders the
//! immutable [`ViewState`] snapshots published on a watch channel.

pub mod config;
pub mod feed;
pub mod identity;
pub mod presence;
pub mod profile;
pub mod session;
pub mod view;

mod error;

pub use config::SessionConfig;
pub use error::ChatError;
pub use identity::IdentityStore;
pub use session::{spawn_session, ChatHandle, SessionCommand};
pub use view::{FeedMessage, InspectTarget, ProfileCard, RosterEntry, SessionPhase, ViewState};
