use thiserror::Error;

/// Errors produced by the identity service layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The email is already registered.
    #[error("An account with this email already exists")]
    DuplicateEmail,

    /// The password does not meet the minimum strength policy.
    #[error("Password is too weak")]
    WeakPassword,

    /// The email/password pair did not match an account.
    ///
    /// Deliberately covers both the unknown-email and the wrong-password
    /// case so a caller cannot probe which emails are registered.
    #[error("Invalid email or password")]
    InvalidCredential,

    /// The operation requires a signed-in session.
    #[error("Not signed in")]
    NotAuthenticated,

    /// The identity service could not be reached.
    #[error("Identity service unavailable: {0}")]
    Unavailable(String),
}
