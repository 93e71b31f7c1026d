use thiserror::Error;

use chatlaxy_auth::AuthError;
use chatlaxy_shared::InputError;
use chatlaxy_store::StoreError;

/// Unified error surface of the chat client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// A request was rejected before any backend was contacted.
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// The identity service rejected or could not service a request.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The document store rejected or could not service a request.
    #[error("Store request failed: {0}")]
    Store(#[from] StoreError),

    /// The account was created but its profile document was not.
    ///
    /// The session is signed in; the missing document is recreated when
    /// the profile watcher first reports it absent.
    #[error("Account created but profile setup failed: {0}")]
    PartialSignup(StoreError),

    /// The session event loop is no longer running.
    #[error("Chat session is not running")]
    SessionStopped,
}
