//! Identity-service abstraction.

use async_trait::async_trait;

use chatlaxy_shared::Subscription;

use crate::error::AuthError;
use crate::session::{DisplayAttributes, NewAccount, Session, SessionChange};

/// Stream of session transitions.
pub type SessionEvents = Subscription<SessionChange>;

/// An identity service the client can authenticate against.
///
/// Implementations hold the notion of "the current session" themselves;
/// the client learns about every transition through [`observe`], including
/// transitions it caused. That keeps a single teardown path regardless of
/// whether a sign-out came from this client or from the service side.
///
/// [`observe`]: IdentityBackend::observe
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Creates an account and signs its session in.
    ///
    /// A successful call emits [`SessionChange::SignedIn`] before it
    /// returns the session.
    async fn create_account(&self, account: NewAccount) -> Result<Session, AuthError>;

    /// Authenticates with an email/password pair and signs the session in.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Ends the current session, if any. Idempotent; only an actual
    /// transition emits [`SessionChange::SignedOut`].
    async fn end_session(&self) -> Result<(), AuthError>;

    /// Updates the display fields on the current session's identity record.
    ///
    /// This is a quiet write: no session transition is emitted, because the
    /// session itself does not change.
    async fn update_display_attributes(&self, attrs: DisplayAttributes) -> Result<(), AuthError>;

    /// Watches session transitions.
    ///
    /// The current state is emitted immediately on attach, so a consumer
    /// never has to ask "am I signed in right now" out of band.
    fn observe(&self) -> SessionEvents;
}
