//! Sign-up and sign-in orchestration.
//!
//! Signup is a two-step write with no transaction around it: the account
//! first, the profile document second. When the second step fails the
//! account is live but profile-less; that state is reported as
//! [`ChatError::PartialSignup`] and repaired by the profile watcher the
//! next time the gap is observed.

use std::sync::Arc;

use tracing::{info, warn};

use chatlaxy_auth::{DisplayAttributes, IdentityBackend, NewAccount, Session, SessionEvents};
use chatlaxy_shared::constants::{DEFAULT_AVATAR_URL, MIN_DISPLAY_NAME_LEN};
use chatlaxy_shared::InputError;
use chatlaxy_store::{ChatStore, NewProfile};

use crate::error::ChatError;

/// Chat-level account operations over an [`IdentityBackend`].
#[derive(Clone)]
pub struct IdentityStore {
    backend: Arc<dyn IdentityBackend>,
    store: ChatStore,
}

impl IdentityStore {
    pub fn new(backend: Arc<dyn IdentityBackend>, store: ChatStore) -> Self {
        Self { backend, store }
    }

    /// Creates the account and seeds its profile document.
    ///
    /// The display name is validated before anything is written, so a
    /// rejected name costs no account. After the profile write the display
    /// fields are mirrored onto the identity record; a failed mirror is
    /// logged and tolerated since the profile document is the source of
    /// truth for rendering.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, ChatError> {
        if display_name.chars().count() < MIN_DISPLAY_NAME_LEN {
            return Err(InputError::DisplayNameTooShort.into());
        }

        let session = self
            .backend
            .create_account(NewAccount {
                email: email.to_string(),
                password: password.to_string(),
                display_name: display_name.to_string(),
            })
            .await?;
        info!(id = %session.id, "account created");

        let profile = NewProfile::signup(session.id.clone(), display_name, email);
        if let Err(e) = self.store.create_profile(&profile).await {
            warn!(id = %session.id, error = %e, "profile document creation failed after signup");
            return Err(ChatError::PartialSignup(e));
        }

        let mirror = DisplayAttributes {
            display_name: Some(display_name.to_string()),
            avatar_ref: Some(DEFAULT_AVATAR_URL.to_string()),
        };
        if let Err(e) = self.backend.update_display_attributes(mirror).await {
            warn!(id = %session.id, error = %e, "display-attribute mirror failed after signup");
        }

        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ChatError> {
        let session = self.backend.authenticate(email, password).await?;
        info!(id = %session.id, "signed in");
        Ok(session)
    }

    /// Ends the current session. The resulting teardown happens through
    /// the session stream, the same path a service-side sign-out takes.
    pub async fn sign_out(&self) -> Result<(), ChatError> {
        self.backend.end_session().await?;
        info!("signed out");
        Ok(())
    }

    pub async fn update_display_attributes(
        &self,
        attrs: DisplayAttributes,
    ) -> Result<(), ChatError> {
        self.backend.update_display_attributes(attrs).await?;
        Ok(())
    }

    pub fn observe(&self) -> SessionEvents {
        self.backend.observe()
    }
}
